//! 文档数据模型
//!
//! 文档状态只允许 `unpublished → published → ended` 单向流转，
//! 状态用封闭枚举表示，不接受任意字符串。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 文档状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    /// 未发布，可以修改发布设置
    Unpublished,
    /// 已发布，签署中
    Published,
    /// 签署结束，已合成最终文档
    Ended,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Unpublished => "unpublished",
            DocStatus::Published => "published",
            DocStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 签名区域（页码 + 坐标 + 签署人）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignPlacement {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub signer: String,
}

/// 文档记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 文档ID，上传时生成
    pub id: String,
    /// 原始文件名，仅用于显示
    pub name: String,
    /// 文件存放位置
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub status: DocStatus,
    pub creator_id: String,

    // --- 发布设置 ---
    pub title: Option<String>,
    pub description: Option<String>,
    /// 需要签署的用户
    pub signers: Vec<String>,
    /// 签名区域，发布后不再修改
    pub sign_area: Vec<SignPlacement>,
    /// 签署截止时间
    pub deadline: Option<DateTime<Utc>>,

    /// 结束时间，只在进入 ended 时设置一次
    pub end_time: Option<DateTime<Utc>>,
    /// 剩余补签次数
    pub repeat_sign_remaining: u32,
    /// 当前签署轮次，每次补签加一
    pub sign_window: u32,
}

impl Document {
    /// 需要签署的用户：签署人列表加上签名区域中出现的签署人，按首次出现顺序去重
    pub fn required_signers(&self) -> Vec<String> {
        let mut signers: Vec<String> = Vec::new();
        let from_area = self.sign_area.iter().map(|p| &p.signer);
        for signer in self.signers.iter().chain(from_area) {
            if !signers.contains(signer) {
                signers.push(signer.clone());
            }
        }
        signers
    }
}

/// 创建文档所需的信息
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub name: String,
    pub storage_path: String,
    pub creator_id: String,
}

impl NewDocument {
    pub fn into_document(self, created_at: DateTime<Utc>) -> Document {
        Document {
            id: self.id,
            name: self.name,
            storage_path: self.storage_path,
            created_at,
            status: DocStatus::Unpublished,
            creator_id: self.creator_id,
            title: None,
            description: None,
            signers: Vec::new(),
            sign_area: Vec::new(),
            deadline: None,
            end_time: None,
            repeat_sign_remaining: 0,
            sign_window: 0,
        }
    }
}

/// 发布基础设置（只更新提供了的字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseBasic {
    pub title: Option<String>,
    pub description: Option<String>,
    pub signers: Option<Vec<String>>,
}

/// 确认发布时的选项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseOptions {
    pub deadline: Option<DateTime<Utc>>,
    /// 为空时使用配置中的默认补签次数
    pub repeat_sign_limit: Option<u32>,
}

/// 对文档的部分更新
#[derive(Debug, Clone)]
pub enum DocumentPatch {
    Basic(ReleaseBasic),
    SignArea(Vec<SignPlacement>),
}

impl DocumentPatch {
    pub fn apply(self, doc: &mut Document) {
        match self {
            DocumentPatch::Basic(basic) => {
                if let Some(title) = basic.title {
                    doc.title = Some(title);
                }
                if let Some(description) = basic.description {
                    doc.description = Some(description);
                }
                if let Some(signers) = basic.signers {
                    doc.signers = signers;
                }
            }
            DocumentPatch::SignArea(area) => doc.sign_area = area,
        }
    }
}

/// 状态变更
#[derive(Debug, Clone)]
pub enum StatusTransition {
    Publish {
        deadline: Option<DateTime<Utc>>,
        repeat_sign_limit: u32,
    },
    End {
        end_time: DateTime<Utc>,
    },
}

impl StatusTransition {
    pub fn target(&self) -> DocStatus {
        match self {
            StatusTransition::Publish { .. } => DocStatus::Published,
            StatusTransition::End { .. } => DocStatus::Ended,
        }
    }

    /// 合法的前置状态
    pub fn expected_from(&self) -> DocStatus {
        match self {
            StatusTransition::Publish { .. } => DocStatus::Unpublished,
            StatusTransition::End { .. } => DocStatus::Published,
        }
    }

    pub fn apply(self, doc: &mut Document) {
        doc.status = self.target();
        match self {
            StatusTransition::Publish {
                deadline,
                repeat_sign_limit,
            } => {
                doc.deadline = deadline;
                doc.repeat_sign_remaining = repeat_sign_limit;
            }
            StatusTransition::End { end_time } => doc.end_time = Some(end_time),
        }
    }
}

/// 列表查询的时间范围（按创建时间）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    #[default]
    All,
    LastDay,
    LastWeek,
    LastMonth,
}

impl TimeRange {
    fn earliest(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::All => None,
            TimeRange::LastDay => Some(now - Duration::days(1)),
            TimeRange::LastWeek => Some(now - Duration::weeks(1)),
            TimeRange::LastMonth => Some(now - Duration::days(30)),
        }
    }
}

/// 文档列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub status: Option<DocStatus>,
    pub time_range: TimeRange,
    pub creator_id: Option<String>,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &Document, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != doc.status) {
            return false;
        }
        if let Some(creator) = &self.creator_id {
            if creator != &doc.creator_id {
                return false;
            }
        }
        match self.time_range.earliest(now) {
            Some(earliest) => doc.created_at >= earliest,
            None => true,
        }
    }
}
