//! 内存存储 - 基础设施层
//!
//! 同时实现 [`DocumentStore`] 和 [`SignRecordStore`]。
//! 每次修改都在同一把异步锁内完成"检查 + 修改"，相当于数据库的条件更新；
//! 配置了快照文件时，修改成功后整体写入 JSON，写入失败则回滚内存中的修改。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{SignError, SignResult};
use crate::infrastructure::{DocumentStore, SignRecordStore};
use crate::models::{
    DocStatus, Document, DocumentFilter, DocumentPatch, SignKey, SignRecord, SignStatus,
    StatusTransition,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    documents: HashMap<String, Document>,
    sign_records: HashMap<SignKey, SignRecord>,
}

/// 快照文件格式
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    documents: Vec<Document>,
    sign_records: Vec<SignRecord>,
}

impl From<&StoreState> for Snapshot {
    fn from(state: &StoreState) -> Self {
        let mut documents: Vec<Document> = state.documents.values().cloned().collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        let mut sign_records: Vec<SignRecord> = state.sign_records.values().cloned().collect();
        sign_records.sort_by(|a, b| {
            (&a.doc_id, &a.user_id, a.window).cmp(&(&b.doc_id, &b.user_id, b.window))
        });
        Self {
            documents,
            sign_records,
        }
    }
}

impl From<Snapshot> for StoreState {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            documents: snapshot
                .documents
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
            sign_records: snapshot
                .sign_records
                .into_iter()
                .map(|r| (SignKey::new(r.doc_id.clone(), r.user_id.clone(), r.window), r))
                .collect(),
        }
    }
}

/// 内存存储
pub struct MemoryStore {
    state: Mutex<StoreState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// 创建只保存在内存中的存储
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            snapshot_path: None,
        }
    }

    /// 打开带快照文件的存储，文件不存在时从空状态开始
    pub async fn open(path: impl AsRef<Path>) -> SignResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let snapshot: Snapshot = serde_json::from_str(&content)?;
                info!(
                    "已加载存储快照 {}: {} 个文档, {} 条签署记录",
                    path.display(),
                    snapshot.documents.len(),
                    snapshot.sign_records.len()
                );
                StoreState::from(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("存储快照 {} 不存在，从空状态开始", path.display());
                StoreState::default()
            }
            Err(e) => return Err(SignError::file(path.display().to_string(), e)),
        };

        Ok(Self {
            state: Mutex::new(state),
            snapshot_path: Some(path),
        })
    }

    /// 在锁内执行一次修改
    ///
    /// `op` 返回 `(结果, 是否有修改)`。快照写入失败时恢复修改前的状态。
    async fn mutate<R>(
        &self,
        operation: &str,
        op: impl FnOnce(&mut StoreState) -> SignResult<(R, bool)>,
    ) -> SignResult<R> {
        let mut state = self.state.lock().await;
        let backup = self.snapshot_path.as_ref().map(|_| state.clone());

        let (result, changed) = op(&mut state)?;

        if changed {
            if let (Some(path), Some(backup)) = (&self.snapshot_path, backup) {
                if let Err(e) = write_snapshot(path, &state).await {
                    *state = backup;
                    return Err(SignError::persistence(operation, e));
                }
            }
        }

        Ok(result)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_snapshot(path: &Path, state: &StoreState) -> SignResult<()> {
    let content = serde_json::to_string_pretty(&Snapshot::from(state))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SignError::file(parent.display().to_string(), e))?;
        }
    }
    // 先写临时文件再改名，避免写到一半的快照
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|e| SignError::file(tmp.display().to_string(), e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| SignError::file(path.display().to_string(), e))?;
    debug!("存储快照已写入 {}", path.display());
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, doc: Document) -> SignResult<String> {
        self.mutate("document.insert", |state| {
            if state.documents.contains_key(&doc.id) {
                return Err(SignError::persistence(
                    "document.insert",
                    format!("文档ID {} 已存在", doc.id),
                ));
            }
            let id = doc.id.clone();
            state.documents.insert(id.clone(), doc);
            Ok((id, true))
        })
        .await
    }

    async fn find_by_key(
        &self,
        doc_id: &str,
        status: Option<DocStatus>,
    ) -> SignResult<Option<Document>> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .get(doc_id)
            .filter(|d| status.map_or(true, |s| d.status == s))
            .cloned())
    }

    async fn find_many(&self, filter: &DocumentFilter) -> SignResult<Vec<Document>> {
        let now = Utc::now();
        let state = self.state.lock().await;
        let mut docs: Vec<Document> = state
            .documents
            .values()
            .filter(|d| filter.matches(d, now))
            .cloned()
            .collect();
        // 最新上传的排在前面
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn update_partial(
        &self,
        doc_id: &str,
        patch: DocumentPatch,
        expected: DocStatus,
    ) -> SignResult<u64> {
        self.mutate("document.update_partial", |state| {
            match state.documents.get_mut(doc_id) {
                Some(doc) if doc.status == expected => {
                    patch.apply(doc);
                    Ok((1, true))
                }
                _ => Ok((0, false)),
            }
        })
        .await
    }

    async fn update_status(
        &self,
        doc_id: &str,
        transition: StatusTransition,
        expected: DocStatus,
    ) -> SignResult<u64> {
        self.mutate("document.update_status", |state| {
            match state.documents.get_mut(doc_id) {
                Some(doc) if doc.status == expected => {
                    transition.apply(doc);
                    Ok((1, true))
                }
                _ => Ok((0, false)),
            }
        })
        .await
    }

    async fn consume_repeat_sign(&self, doc_id: &str, expected: DocStatus) -> SignResult<u64> {
        self.mutate("document.consume_repeat_sign", |state| {
            match state.documents.get_mut(doc_id) {
                Some(doc) if doc.status == expected && doc.repeat_sign_remaining > 0 => {
                    doc.repeat_sign_remaining -= 1;
                    doc.sign_window += 1;
                    Ok((1, true))
                }
                _ => Ok((0, false)),
            }
        })
        .await
    }

    async fn delete(&self, doc_id: &str) -> SignResult<u64> {
        self.mutate("document.delete", |state| {
            if state.documents.remove(doc_id).is_none() {
                return Ok((0, false));
            }
            state.sign_records.retain(|key, _| key.doc_id != doc_id);
            Ok((1, true))
        })
        .await
    }
}

#[async_trait]
impl SignRecordStore for MemoryStore {
    async fn find_by_key(&self, key: &SignKey) -> SignResult<Option<SignRecord>> {
        let state = self.state.lock().await;
        Ok(state.sign_records.get(key).cloned())
    }

    async fn insert(&self, key: &SignKey) -> SignResult<SignRecord> {
        self.mutate("sign.insert", |state| {
            if state.sign_records.contains_key(key) {
                return Err(SignError::DuplicateSession {
                    doc_id: key.doc_id.clone(),
                    user_id: key.user_id.clone(),
                });
            }
            let record = SignRecord::pending(key);
            state.sign_records.insert(key.clone(), record.clone());
            Ok((record, true))
        })
        .await
    }

    async fn update_if_pending(&self, key: &SignKey, sign_time: DateTime<Utc>) -> SignResult<u64> {
        self.mutate("sign.update_if_pending", |state| {
            match state.sign_records.get_mut(key) {
                Some(record) if record.status == SignStatus::Pending => {
                    record.status = SignStatus::Signed;
                    record.sign_time = Some(sign_time);
                    Ok((1, true))
                }
                _ => Ok((0, false)),
            }
        })
        .await
    }
}
