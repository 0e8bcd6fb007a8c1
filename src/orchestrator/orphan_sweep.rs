//! 孤立文件清理 - 编排层
//!
//! 删除文档时先删记录再删文件，文件删除失败会留下没有记录引用的文件。
//! 本模块扫描上传目录和签署目录，删除所有不被任何文档引用的文件。
//! 文件按文件名匹配：上传文件对应 `storage_path` 的文件名，签署目录对应
//! `<doc_id>` 和它的签名区域清单。

use futures::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::{SignError, SignResult};
use crate::infrastructure::{placements_file_name, DocumentStore, FileStore};
use crate::models::DocumentFilter;

/// 清理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub kept: usize,
    pub removed: usize,
    pub failed: usize,
}

/// 孤立文件清理器
pub struct OrphanSweep {
    documents: Arc<dyn DocumentStore>,
    uploads: Arc<dyn FileStore>,
    signed: Arc<dyn FileStore>,
    max_concurrent: usize,
}

impl OrphanSweep {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        uploads: Arc<dyn FileStore>,
        signed: Arc<dyn FileStore>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            documents,
            uploads,
            signed,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 执行一次清理
    pub async fn run(&self) -> SignResult<SweepStats> {
        let documents = self
            .documents
            .find_many(&DocumentFilter::default())
            .await?;

        let uploads: HashSet<String> = documents
            .iter()
            .filter_map(|d| file_name(&d.storage_path))
            .collect();
        let outputs: HashSet<String> = documents
            .iter()
            .flat_map(|d| [d.id.clone(), placements_file_name(&d.id)])
            .collect();

        let mut stats = SweepStats::default();
        self.sweep(&self.uploads, &uploads, &mut stats).await?;
        self.sweep(&self.signed, &outputs, &mut stats).await?;

        if stats.removed + stats.failed == 0 {
            info!("✓ 没有孤立文件 (共扫描 {} 个)", stats.scanned);
        }
        Ok(stats)
    }

    /// 清理一个目录，`referenced` 是需要保留的文件名
    async fn sweep(
        &self,
        files: &Arc<dyn FileStore>,
        referenced: &HashSet<String>,
        stats: &mut SweepStats,
    ) -> SignResult<()> {
        let listed = files.list().await?;
        let scanned = listed.len();

        let orphans: Vec<String> = listed
            .into_iter()
            .filter(|path| file_name(path).is_some_and(|name| !referenced.contains(&name)))
            .collect();
        stats.scanned += scanned;
        stats.kept += scanned - orphans.len();

        if orphans.is_empty() {
            return Ok(());
        }
        info!("🧹 发现 {} 个孤立文件，开始清理", orphans.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::new();

        for path in orphans {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SignError::persistence("sweep.acquire", e))?;
            let files = files.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                files.remove(&path).await.map_err(|e| (path, e))
            });
            handles.push(handle);
        }

        for result in join_all(handles).await {
            match result {
                Ok(Ok(())) => stats.removed += 1,
                Ok(Err((path, e))) => {
                    warn!("⚠️ 删除孤立文件失败 {}: {}", path, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("清理任务执行失败: {}", e);
                    stats.failed += 1;
                }
            }
        }

        Ok(())
    }
}

fn file_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
