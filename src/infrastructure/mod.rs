//! 基础设施层（Infrastructure）
//!
//! 持有存储、文件和合并引擎等外部资源，只暴露窄接口给上层。
//! 上层只依赖这里的 trait，具体实现由调用方注入。

pub mod document_store;
pub mod file_store;
pub mod memory_store;
pub mod merge_engine;
pub mod sign_store;

pub use document_store::DocumentStore;
pub use file_store::{FileStore, LocalFileStore};
pub use memory_store::MemoryStore;
pub use merge_engine::{placements_file_name, MergeEngine, SidecarMergeEngine};
pub use sign_store::SignRecordStore;
