//! 应用装配 - 编排层
//!
//! ## 职责
//!
//! 1. **资源创建**：按配置创建存储、文件存储和合并引擎
//! 2. **依赖注入**：把同一组存储句柄注入各个服务和流程，不使用全局状态
//! 3. **启动维护**：启动时清理上传目录和签署目录中的孤立文件并输出统计

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::infrastructure::{
    DocumentStore, FileStore, LocalFileStore, MemoryStore, MergeEngine, SidecarMergeEngine,
    SignRecordStore,
};
use crate::orchestrator::orphan_sweep::{OrphanSweep, SweepStats};
use crate::services::{DocumentService, SignService};
use crate::utils::logging;
use crate::workflow::{ReleaseFlow, UploadFlow};

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<MemoryStore>,
    files: Arc<LocalFileStore>,
    documents: Arc<DocumentService>,
    signing: Arc<SignService>,
    release: ReleaseFlow,
    upload: UploadFlow,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let store = match &config.state_file {
            Some(path) => Arc::new(
                MemoryStore::open(path)
                    .await
                    .with_context(|| format!("无法打开存储快照: {}", path.display()))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };
        let files = Arc::new(LocalFileStore::new(&config.upload_dir));
        let merge_engine: Arc<dyn MergeEngine> =
            Arc::new(SidecarMergeEngine::new(config.signed_dir()));

        Ok(Self::assemble(config, store, files, merge_engine))
    }

    /// 用给定的资源装配应用
    pub fn assemble(
        config: Config,
        store: Arc<MemoryStore>,
        files: Arc<LocalFileStore>,
        merge_engine: Arc<dyn MergeEngine>,
    ) -> Self {
        let doc_store: Arc<dyn DocumentStore> = store.clone();
        let sign_store: Arc<dyn SignRecordStore> = store.clone();
        let file_store: Arc<dyn FileStore> = files.clone();

        let documents = Arc::new(DocumentService::new(
            doc_store.clone(),
            file_store.clone(),
            &config,
        ));
        let signing = Arc::new(SignService::new(doc_store, sign_store));
        let release = ReleaseFlow::new(documents.clone(), signing.clone(), merge_engine, &config);
        let upload = UploadFlow::new(documents.clone(), file_store, &config);

        Self {
            config,
            store,
            files,
            documents,
            signing,
            release,
            upload,
        }
    }

    /// 运行启动维护任务
    pub async fn run(&self) -> Result<SweepStats> {
        let signed = Arc::new(LocalFileStore::new(self.config.signed_dir()));
        let sweep = OrphanSweep::new(
            self.store.clone(),
            self.files.clone(),
            signed,
            self.config.max_concurrent_removals,
        );
        let stats = sweep.run().await.context("孤立文件清理失败")?;
        logging::print_sweep_stats(&stats, &self.config);
        Ok(stats)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    pub fn signing(&self) -> &SignService {
        &self.signing
    }

    pub fn release(&self) -> &ReleaseFlow {
        &self.release
    }

    pub fn upload(&self) -> &UploadFlow {
        &self.upload
    }
}
