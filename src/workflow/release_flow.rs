//! 发布流程 - 流程层
//!
//! 流程顺序：
//! 1. basic → 保存基础设置
//! 2. sign_area → 设置签名区域
//! 3. confirm → 发布
//! 4. sign_end → 合成签署文档 → 结束
//!
//! 步骤之间没有事务，每一步都重新检查文档是否存在以及状态，由调用方保证顺序。

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{SignError, SignResult};
use crate::infrastructure::MergeEngine;
use crate::models::{
    DocStatus, Document, ReleaseBasic, ReleaseOptions, SignPlacement, SignStatus,
};
use crate::services::{DocumentService, SignService};

/// 发布流程
pub struct ReleaseFlow {
    documents: Arc<DocumentService>,
    signing: Arc<SignService>,
    merge_engine: Arc<dyn MergeEngine>,
    enforce_signer_completion: bool,
}

impl ReleaseFlow {
    pub fn new(
        documents: Arc<DocumentService>,
        signing: Arc<SignService>,
        merge_engine: Arc<dyn MergeEngine>,
        config: &Config,
    ) -> Self {
        Self {
            documents,
            signing,
            merge_engine,
            enforce_signer_completion: config.enforce_signer_completion,
        }
    }

    /// 第 1 步：基础设置
    pub async fn basic(&self, doc_id: &str, fields: ReleaseBasic) -> SignResult<Document> {
        self.require_unpublished(doc_id).await?;
        self.documents.prepare_release_update(doc_id, fields).await
    }

    /// 第 2 步：签名区域
    pub async fn sign_area(
        &self,
        doc_id: &str,
        sign_area: Vec<SignPlacement>,
    ) -> SignResult<Document> {
        self.require_unpublished(doc_id).await?;
        self.documents.set_sign_area(doc_id, sign_area).await
    }

    /// 第 3 步：确认发布
    pub async fn confirm(&self, doc_id: &str, options: ReleaseOptions) -> SignResult<Document> {
        self.require_unpublished(doc_id).await?;
        self.documents.confirm_release(doc_id, options).await
    }

    /// 第 4 步：结束签署
    ///
    /// 只有 published 的文档会进入合成，其他状态在合成前返回 `InvalidState`。
    /// 合成失败时返回 `Merge`，文档保持 published，可以直接重试。
    pub async fn sign_end(&self, doc_id: &str, end_time: DateTime<Utc>) -> SignResult<Document> {
        let doc = self.documents.find_one(doc_id).await?;

        if doc.status != DocStatus::Published {
            warn!("[文档 {}] ⚠️ 当前状态 {} 不能结束签署", doc_id, doc.status);
            return Err(SignError::invalid_state(
                doc_id,
                format!("当前状态为 {}，需要 {}", doc.status, DocStatus::Published),
            ));
        }

        if self.enforce_signer_completion {
            self.require_all_signed(&doc).await?;
        }

        info!(
            "[文档 {}] 📎 正在合成 {} 个签名区域...",
            doc_id,
            doc.sign_area.len()
        );
        let merged = match self
            .merge_engine
            .merge(doc_id, &doc.storage_path, &doc.sign_area)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!("[文档 {}] ❌ 合并失败，保持当前状态: {}", doc_id, e);
                return Err(match e {
                    SignError::Merge { .. } => e,
                    other => SignError::merge_failed(doc_id, other),
                });
            }
        };
        info!("[文档 {}] ✓ 合成完成: {}", doc_id, merged);

        self.documents.finalize(doc_id, end_time).await
    }

    // ========== 内部辅助方法 ==========

    async fn require_unpublished(&self, doc_id: &str) -> SignResult<()> {
        let doc = self.documents.find_one(doc_id).await?;
        if doc.status != DocStatus::Unpublished {
            warn!("[文档 {}] ⚠️ 已经发布或结束 ({})", doc_id, doc.status);
            return Err(SignError::invalid_state(
                doc_id,
                format!("文档已经发布或结束 ({})", doc.status),
            ));
        }
        Ok(())
    }

    async fn require_all_signed(&self, doc: &Document) -> SignResult<()> {
        let pending: Vec<String> = self
            .signing
            .signing_progress(&doc.id)
            .await?
            .into_iter()
            .filter(|p| p.status != Some(SignStatus::Signed))
            .map(|p| p.user_id)
            .collect();

        if !pending.is_empty() {
            warn!("[文档 {}] ⚠️ 仍有未签署的用户: {:?}", doc.id, pending);
            return Err(SignError::invalid_state(
                doc.id.clone(),
                format!("仍有未签署的用户: {}", pending.join(", ")),
            ));
        }
        Ok(())
    }
}
