//! 文件存储 - 基础设施层
//!
//! 只负责原始字节的保存和删除，不认识文档状态。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{SignError, SignResult};

#[async_trait]
pub trait FileStore: Send + Sync {
    /// 保存文件，返回存放路径
    async fn save(&self, name: &str, bytes: &[u8]) -> SignResult<String>;

    /// 删除文件，文件不存在时返回 `NotFound`
    async fn remove(&self, path: &str) -> SignResult<()>;

    async fn exists(&self, path: &str) -> SignResult<bool>;

    /// 列出根目录下的所有普通文件（不含子目录）
    async fn list(&self) -> SignResult<Vec<String>>;
}

/// 本地磁盘文件存储
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> SignResult<String> {
        // 文件名由上层生成，这里仍然拒绝路径分隔符
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(SignError::InvalidInput(format!("非法文件名: {}", name)));
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SignError::file(self.root.display().to_string(), e))?;

        let path = self.root.join(name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| SignError::file(path.display().to_string(), e))?;

        debug!("文件已保存: {} ({} 字节)", path.display(), bytes.len());
        Ok(path.to_string_lossy().to_string())
    }

    async fn remove(&self, path: &str) -> SignResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("文件已删除: {}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SignError::NotFound {
                entity: "file",
                id: path.to_string(),
            }),
            Err(e) => Err(SignError::file(path, e)),
        }
    }

    async fn exists(&self, path: &str) -> SignResult<bool> {
        fs::try_exists(path)
            .await
            .map_err(|e| SignError::file(path, e))
    }

    async fn list(&self) -> SignResult<Vec<String>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(SignError::file(self.root.display().to_string(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SignError::file(self.root.display().to_string(), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SignError::file(entry.path().display().to_string(), e))?;
            if file_type.is_file() {
                files.push(entry.path().to_string_lossy().to_string());
            }
        }

        files.sort();
        Ok(files)
    }
}
