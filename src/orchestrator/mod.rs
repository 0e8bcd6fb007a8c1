//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用装配
//! - 按配置创建存储、文件存储、合并引擎
//! - 把同一组句柄注入服务和流程
//! - 启动时执行维护任务
//!
//! ### `orphan_sweep` - 孤立文件清理
//! - 扫描上传目录
//! - 删除没有文档记录引用的文件（Semaphore 限制并发）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator (装配 + 维护)
//!     ↓
//! workflow (ReleaseFlow / UploadFlow)
//!     ↓
//! services (DocumentService / SignService)
//!     ↓
//! infrastructure (DocumentStore / SignRecordStore / FileStore / MergeEngine)
//! ```

pub mod app;
pub mod orphan_sweep;

pub use app::App;
pub use orphan_sweep::{OrphanSweep, SweepStats};
