//! 签署记录存储接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SignResult;
use crate::models::{SignKey, SignRecord};

/// 签署记录存储
///
/// (doc_id, user_id, window) 唯一，由存储层保证。
#[async_trait]
pub trait SignRecordStore: Send + Sync {
    async fn find_by_key(&self, key: &SignKey) -> SignResult<Option<SignRecord>>;

    /// 创建 pending 记录，已存在时返回 `DuplicateSession`
    async fn insert(&self, key: &SignKey) -> SignResult<SignRecord>;

    /// 只在当前为 pending 时标记为 signed，返回受影响的行数
    async fn update_if_pending(&self, key: &SignKey, sign_time: DateTime<Utc>) -> SignResult<u64>;
}
