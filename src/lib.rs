//! # Sign Flow
//!
//! 电子签署文档的生命周期核心：上传、发布设置、发布、多人签署、合成结束
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 存储、文件和合并引擎的窄接口及实现
//! - `MemoryStore` - 文档与签署记录存储，条件更新 + 可选 JSON 快照
//! - `LocalFileStore` / `SidecarMergeEngine` - 磁盘文件与合成输出
//!
//! ### ② 业务能力层（Services）
//! - `DocumentService` - 文档状态机 `unpublished → published → ended`
//! - `SignService` - 每个签署人的 `none → pending → signed`
//!
//! ### ③ 流程层（Workflow）
//! - `ReleaseFlow` - basic → sign_area → confirm → sign_end
//! - `UploadFlow` - 上传（失败回滚文件）、删除、下载合成文档
//!
//! ### ④ 编排层（Orchestration）
//! - `App` - 按配置装配所有组件
//! - `OrphanSweep` - 清理没有记录引用的文件

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ErrorKind, SignError, SignResult};
pub use models::{DocStatus, Document, SignPlacement, SignRecord, SignStatus};
pub use orchestrator::App;
pub use services::{CompleteOutcome, DocumentService, SignService};
pub use workflow::{ReleaseFlow, UploadFlow};
