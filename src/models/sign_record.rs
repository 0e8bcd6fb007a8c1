//! 签署记录数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 签署状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignStatus {
    /// 已开始，未完成
    Pending,
    /// 已签署
    Signed,
}

/// 签署记录的唯一键：文档 + 用户 + 签署轮次
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignKey {
    pub doc_id: String,
    pub user_id: String,
    pub window: u32,
}

impl SignKey {
    pub fn new(doc_id: impl Into<String>, user_id: impl Into<String>, window: u32) -> Self {
        Self {
            doc_id: doc_id.into(),
            user_id: user_id.into(),
            window,
        }
    }
}

impl Display for SignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {} 用户 {} 轮次 {}]",
            self.doc_id, self.user_id, self.window
        )
    }
}

/// 签署记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRecord {
    pub doc_id: String,
    pub user_id: String,
    pub window: u32,
    pub status: SignStatus,
    /// 只在变为 signed 时设置
    pub sign_time: Option<DateTime<Utc>>,
}

impl SignRecord {
    pub fn pending(key: &SignKey) -> Self {
        Self {
            doc_id: key.doc_id.clone(),
            user_id: key.user_id.clone(),
            window: key.window,
            status: SignStatus::Pending,
            sign_time: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.status == SignStatus::Signed
    }
}

/// 单个签署人在当前轮次的进度，`status` 为空表示尚未开始
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerProgress {
    pub user_id: String,
    pub status: Option<SignStatus>,
}
