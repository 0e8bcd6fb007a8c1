//! 上传流程 - 流程层
//!
//! 文件保存和记录写入是两步独立操作：先存文件，再写记录；
//! 记录写入失败时删除刚保存的文件。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{SignError, SignResult};
use crate::infrastructure::FileStore;
use crate::models::{DocStatus, Document, NewDocument};
use crate::services::{DeleteOutcome, DocumentService};

/// 只接受的文件扩展名
const ALLOWED_EXTENSION: &str = "pdf";

/// 上传流程
pub struct UploadFlow {
    documents: Arc<DocumentService>,
    files: Arc<dyn FileStore>,
    signed_dir: PathBuf,
    max_upload_bytes: u64,
}

impl UploadFlow {
    pub fn new(documents: Arc<DocumentService>, files: Arc<dyn FileStore>, config: &Config) -> Self {
        Self {
            documents,
            files,
            signed_dir: config.signed_dir(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// 上传文档
    ///
    /// # 参数
    /// - `original_name`: 上传时的文件名
    /// - `bytes`: 文件内容
    /// - `creator_id`: 创建人
    pub async fn upload(
        &self,
        original_name: &str,
        bytes: &[u8],
        creator_id: &str,
    ) -> SignResult<Document> {
        self.validate(original_name, bytes)?;

        let doc_id = format!("doc-{}.{}", Uuid::new_v4(), ALLOWED_EXTENSION);
        let storage_path = self.files.save(&doc_id, bytes).await?;

        let meta = NewDocument {
            id: doc_id.clone(),
            name: original_name.to_string(),
            storage_path: storage_path.clone(),
            creator_id: creator_id.to_string(),
        };

        match self.documents.create(meta).await {
            Ok(doc) => {
                info!(
                    "[文档 {}] ✓ 上传成功: {} ({} 字节)",
                    doc_id,
                    original_name,
                    bytes.len()
                );
                Ok(doc)
            }
            Err(e) => {
                error!("[文档 {}] ❌ 写入数据库失败，回滚已保存的文件: {}", doc_id, e);
                if let Err(cleanup) = self.files.remove(&storage_path).await {
                    warn!(
                        "[文档 {}] ⚠️ 回滚文件失败，留下孤立文件 {}: {}",
                        doc_id, storage_path, cleanup
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, doc_id: &str) -> SignResult<DeleteOutcome> {
        self.documents.delete(doc_id).await
    }

    /// 合成后签署文档的路径
    ///
    /// 文档不存在、还没有结束或者文件不存在时返回 `NotFound`。
    pub async fn signed_artifact(&self, doc_id: &str) -> SignResult<PathBuf> {
        let not_found = || SignError::NotFound {
            entity: "signed_document",
            id: doc_id.to_string(),
        };

        if doc_id.is_empty() || doc_id.contains(['/', '\\']) || doc_id == ".." {
            return Err(not_found());
        }

        let doc = self.documents.find_one(doc_id).await?;
        if doc.status != DocStatus::Ended {
            return Err(not_found());
        }

        let path = self.signed_dir.join(doc_id);
        if self.files.exists(&path.to_string_lossy()).await? {
            Ok(path)
        } else {
            Err(not_found())
        }
    }

    fn validate(&self, original_name: &str, bytes: &[u8]) -> SignResult<()> {
        let is_pdf = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION));
        if !is_pdf {
            return Err(SignError::InvalidInput(format!(
                "只支持上传pdf文件类型: {}",
                original_name
            )));
        }

        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(SignError::InvalidInput(format!(
                "文件大小 {} 字节超过上限 {} 字节",
                bytes.len(),
                self.max_upload_bytes
            )));
        }
        Ok(())
    }
}
