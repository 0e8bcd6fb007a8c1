//! 签署会话服务 - 业务能力层
//!
//! 负责每个 (文档, 用户) 在当前签署轮次内的 `none → pending → signed` 状态。
//! 文档状态只读，用来判断是否允许开始或完成签署。

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{SignError, SignResult};
use crate::infrastructure::{DocumentStore, SignRecordStore};
use crate::models::{DocStatus, Document, SignKey, SignRecord, SignerProgress};

/// 完成签署的结果，两种情况都不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// 本次调用把记录从 pending 改为 signed
    Signed(SignRecord),
    /// 没有 pending 记录可更新（已经签过，或者从未开始）
    AlreadySigned,
}

/// 签署会话服务
pub struct SignService {
    documents: Arc<dyn DocumentStore>,
    records: Arc<dyn SignRecordStore>,
}

impl SignService {
    pub fn new(documents: Arc<dyn DocumentStore>, records: Arc<dyn SignRecordStore>) -> Self {
        Self { documents, records }
    }

    /// 查询当前轮次的签署记录，用于判断是首次签署还是继续签署
    pub async fn find_existing(&self, doc_id: &str, user_id: &str) -> SignResult<Option<SignRecord>> {
        let (_, key) = self.current_key(doc_id, user_id).await?;
        self.records.find_by_key(&key).await
    }

    /// 当前轮次是否已经签署
    pub async fn is_signed(&self, doc_id: &str, user_id: &str) -> SignResult<bool> {
        Ok(self
            .find_existing(doc_id, user_id)
            .await?
            .is_some_and(|r| r.is_signed()))
    }

    /// 开始签署，创建 pending 记录
    ///
    /// 文档必须已发布；同一轮次内重复开始返回 `DuplicateSession`。
    pub async fn begin(&self, doc_id: &str, user_id: &str) -> SignResult<SignRecord> {
        let (doc, key) = self.current_key(doc_id, user_id).await?;
        if doc.status != DocStatus::Published {
            return Err(SignError::invalid_state(
                doc_id,
                format!("当前状态为 {}，不允许签署", doc.status),
            ));
        }

        let record = self.records.insert(&key).await?;
        info!("{} ✓ 开始签署", key);
        Ok(record)
    }

    /// 完成签署
    ///
    /// 只有 pending 记录会被改为 signed 并记录签署时间，重复调用不会报错。
    /// 文档不是 published 时返回 `InvalidState`，记录保持原样。
    pub async fn complete(&self, doc_id: &str, user_id: &str) -> SignResult<CompleteOutcome> {
        let (doc, key) = self.current_key(doc_id, user_id).await?;
        if doc.status != DocStatus::Published {
            return Err(SignError::invalid_state(
                doc_id,
                format!("当前状态为 {}，不允许签署", doc.status),
            ));
        }

        let affected = self.records.update_if_pending(&key, Utc::now()).await?;
        if affected == 0 {
            debug!("{} 没有待完成的签署记录，忽略", key);
            return Ok(CompleteOutcome::AlreadySigned);
        }

        let record = self.records.find_by_key(&key).await?.ok_or(SignError::NotFound {
            entity: "sign_record",
            id: key.to_string(),
        })?;
        info!("{} ✓ 签署完成", key);
        Ok(CompleteOutcome::Signed(record))
    }

    /// 文档所有签署人在当前轮次的进度
    pub async fn signing_progress(&self, doc_id: &str) -> SignResult<Vec<SignerProgress>> {
        let doc = self.load(doc_id).await?;
        let mut progress = Vec::new();
        for user_id in doc.required_signers() {
            let key = SignKey::new(doc_id, user_id.clone(), doc.sign_window);
            let status = self.records.find_by_key(&key).await?.map(|r| r.status);
            progress.push(SignerProgress { user_id, status });
        }
        Ok(progress)
    }

    // ========== 内部辅助方法 ==========

    async fn load(&self, doc_id: &str) -> SignResult<Document> {
        self.documents
            .find_by_key(doc_id, None)
            .await?
            .ok_or_else(|| SignError::document_not_found(doc_id))
    }

    async fn current_key(&self, doc_id: &str, user_id: &str) -> SignResult<(Document, SignKey)> {
        let doc = self.load(doc_id).await?;
        let key = SignKey::new(doc_id, user_id, doc.sign_window);
        Ok((doc, key))
    }
}
