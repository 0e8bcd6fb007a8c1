//! 文档生命周期服务 - 业务能力层
//!
//! 唯一负责文档状态变更的模块，状态只能 `unpublished → published → ended`。
//! 每个变更都是一次带期望状态的条件更新，失败时不会留下部分修改。

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{SignError, SignResult};
use crate::infrastructure::{placements_file_name, DocumentStore, FileStore};
use crate::models::{
    DocStatus, Document, DocumentFilter, DocumentPatch, NewDocument, ReleaseBasic, ReleaseOptions,
    SignPlacement, StatusTransition,
};

/// 删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// 磁盘文件是否也已删除；为 false 时留下了孤立文件
    pub file_removed: bool,
}

/// 文档生命周期服务
pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    files: Arc<dyn FileStore>,
    signed_dir: PathBuf,
    default_repeat_sign_limit: u32,
}

impl DocumentService {
    pub fn new(documents: Arc<dyn DocumentStore>, files: Arc<dyn FileStore>, config: &Config) -> Self {
        Self {
            documents,
            files,
            signed_dir: config.signed_dir(),
            default_repeat_sign_limit: config.default_repeat_sign_limit,
        }
    }

    /// 创建未发布的文档
    ///
    /// 写入失败时返回 `Persistence`，已经保存的文件由调用方回滚。
    pub async fn create(&self, meta: NewDocument) -> SignResult<Document> {
        let doc = meta.into_document(Utc::now());
        self.documents.insert(doc.clone()).await?;
        info!("[文档 {}] ✓ 已创建 (创建人: {})", doc.id, doc.creator_id);
        Ok(doc)
    }

    /// 删除文档记录，然后删除磁盘文件和合成产物
    ///
    /// 记录删除成功后才会删文件，所以不会出现记录指向不存在的文件；
    /// 文件删除失败只记录日志，留下的孤立文件由清理任务处理。
    pub async fn delete(&self, doc_id: &str) -> SignResult<DeleteOutcome> {
        let doc = self.find_one(doc_id).await?;

        if self.documents.delete(doc_id).await? == 0 {
            return Err(SignError::document_not_found(doc_id));
        }
        info!("[文档 {}] ✓ 记录已删除", doc_id);

        let file_removed = match self.files.remove(&doc.storage_path).await {
            Ok(()) => {
                info!("[文档 {}] ✓ 文件已删除: {}", doc_id, doc.storage_path);
                true
            }
            Err(e) => {
                warn!(
                    "[文档 {}] ⚠️ 记录已删除但文件删除失败，留下孤立文件 {}: {}",
                    doc_id, doc.storage_path, e
                );
                false
            }
        };

        self.remove_signed_outputs(doc_id).await;
        Ok(DeleteOutcome { file_removed })
    }

    /// 保存发布基础设置（标题、说明、签署人）
    pub async fn prepare_release_update(
        &self,
        doc_id: &str,
        fields: ReleaseBasic,
    ) -> SignResult<Document> {
        self.update_unpublished(doc_id, DocumentPatch::Basic(fields))
            .await
    }

    /// 覆盖签名区域
    pub async fn set_sign_area(
        &self,
        doc_id: &str,
        sign_area: Vec<SignPlacement>,
    ) -> SignResult<Document> {
        self.update_unpublished(doc_id, DocumentPatch::SignArea(sign_area))
            .await
    }

    /// 发布文档 `unpublished → published`
    ///
    /// 不检查签名区域是否为空。
    pub async fn confirm_release(
        &self,
        doc_id: &str,
        options: ReleaseOptions,
    ) -> SignResult<Document> {
        let transition = StatusTransition::Publish {
            deadline: options.deadline,
            repeat_sign_limit: options
                .repeat_sign_limit
                .unwrap_or(self.default_repeat_sign_limit),
        };
        let doc = self.transition(doc_id, transition).await?;
        info!(
            "[文档 {}] ✓ 已发布 (签名区域 {} 个, 可补签 {} 次)",
            doc_id,
            doc.sign_area.len(),
            doc.repeat_sign_remaining
        );
        Ok(doc)
    }

    /// 结束签署 `published → ended`，只能在合成成功之后调用
    pub async fn finalize(&self, doc_id: &str, end_time: DateTime<Utc>) -> SignResult<Document> {
        let doc = self
            .transition(doc_id, StatusTransition::End { end_time })
            .await?;
        info!("[文档 {}] ✓ 签署结束 ({})", doc_id, end_time);
        Ok(doc)
    }

    /// 开启一次补签
    ///
    /// 只对已发布且剩余补签次数大于 0 的文档生效，状态不变，签署轮次加一。
    pub async fn repeat_sign(&self, doc_id: &str) -> SignResult<Document> {
        let affected = self
            .documents
            .consume_repeat_sign(doc_id, DocStatus::Published)
            .await?;

        if affected == 0 {
            // 区分"不存在"和"不允许补签"
            self.find_one(doc_id).await?;
            warn!("[文档 {}] ⚠️ 不允许补签或补签次数已用完", doc_id);
            return Err(SignError::QuotaExceeded {
                doc_id: doc_id.to_string(),
            });
        }

        let doc = self.find_one(doc_id).await?;
        info!(
            "[文档 {}] ✓ 已开启补签 (轮次 {}, 剩余 {} 次)",
            doc_id, doc.sign_window, doc.repeat_sign_remaining
        );
        Ok(doc)
    }

    pub async fn find(&self, filter: &DocumentFilter) -> SignResult<Vec<Document>> {
        self.documents.find_many(filter).await
    }

    /// 查询单个文档，不存在时返回 `NotFound`
    pub async fn find_one(&self, doc_id: &str) -> SignResult<Document> {
        self.documents
            .find_by_key(doc_id, None)
            .await?
            .ok_or_else(|| SignError::document_not_found(doc_id))
    }

    // ========== 内部辅助方法 ==========

    /// 删除合成文档和签名区域清单，没有合成过时什么也不做
    async fn remove_signed_outputs(&self, doc_id: &str) {
        let outputs = [
            self.signed_dir.join(doc_id),
            self.signed_dir.join(placements_file_name(doc_id)),
        ];
        for path in outputs {
            let path = path.to_string_lossy();
            match self.files.remove(&path).await {
                Ok(()) => info!("[文档 {}] ✓ 合成产物已删除: {}", doc_id, path),
                Err(SignError::NotFound { .. }) => debug!("[文档 {}] 没有合成产物 {}", doc_id, path),
                Err(e) => warn!(
                    "[文档 {}] ⚠️ 合成产物删除失败，留下孤立文件 {}: {}",
                    doc_id, path, e
                ),
            }
        }
    }

    async fn update_unpublished(&self, doc_id: &str, patch: DocumentPatch) -> SignResult<Document> {
        let affected = self
            .documents
            .update_partial(doc_id, patch, DocStatus::Unpublished)
            .await?;

        if affected == 0 {
            return Err(self.rejection(doc_id, DocStatus::Unpublished).await);
        }
        self.find_one(doc_id).await
    }

    async fn transition(&self, doc_id: &str, transition: StatusTransition) -> SignResult<Document> {
        let expected = transition.expected_from();
        let affected = self
            .documents
            .update_status(doc_id, transition, expected)
            .await?;

        if affected == 0 {
            return Err(self.rejection(doc_id, expected).await);
        }
        self.find_one(doc_id).await
    }

    /// 条件更新没有命中时，判断是文档不存在还是状态不对
    async fn rejection(&self, doc_id: &str, expected: DocStatus) -> SignError {
        match self.documents.find_by_key(doc_id, None).await {
            Ok(Some(doc)) => SignError::invalid_state(
                doc_id,
                format!("当前状态为 {}，需要 {}", doc.status, expected),
            ),
            Ok(None) => SignError::document_not_found(doc_id),
            Err(e) => e,
        }
    }
}
