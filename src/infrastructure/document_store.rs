//! 文档存储接口

use async_trait::async_trait;

use crate::error::SignResult;
use crate::models::{DocStatus, Document, DocumentFilter, DocumentPatch, StatusTransition};

/// 文档存储
///
/// 所有修改操作都带有期望状态，只有当前状态匹配时才生效，返回受影响的行数。
/// 并发请求之间不加进程内锁，正确性完全依赖这里的条件更新。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 插入新文档，返回文档ID
    async fn insert(&self, doc: Document) -> SignResult<String>;

    /// 按ID查询，指定 `status` 时只返回处于该状态的文档
    async fn find_by_key(&self, doc_id: &str, status: Option<DocStatus>)
        -> SignResult<Option<Document>>;

    async fn find_many(&self, filter: &DocumentFilter) -> SignResult<Vec<Document>>;

    async fn update_partial(
        &self,
        doc_id: &str,
        patch: DocumentPatch,
        expected: DocStatus,
    ) -> SignResult<u64>;

    async fn update_status(
        &self,
        doc_id: &str,
        transition: StatusTransition,
        expected: DocStatus,
    ) -> SignResult<u64>;

    /// 剩余补签次数大于 0 且状态匹配时，次数减一并开启新的签署轮次
    async fn consume_repeat_sign(&self, doc_id: &str, expected: DocStatus) -> SignResult<u64>;

    async fn delete(&self, doc_id: &str) -> SignResult<u64>;
}
