//! 合并引擎 - 基础设施层
//!
//! 把签名区域合成到原始文档上，产出最终签署文档。
//! 具体的 PDF 叠加渲染不在本 crate 内，`SidecarMergeEngine` 只负责产出位置和清单。

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use crate::error::{SignError, SignResult};
use crate::models::SignPlacement;

/// 签名区域清单文件名 `<doc_id>.placements.json`
pub fn placements_file_name(doc_id: &str) -> String {
    format!("{}.placements.json", doc_id)
}

#[async_trait]
pub trait MergeEngine: Send + Sync {
    /// 合成签署文档，返回合成文件路径；任何格式或 IO 问题都返回 `Merge`
    async fn merge(
        &self,
        doc_id: &str,
        base_path: &str,
        sign_area: &[SignPlacement],
    ) -> SignResult<String>;
}

/// 输出到签署目录的合并引擎
///
/// 原始文件复制为 `<output_dir>/<doc_id>`，签名区域写入
/// `<output_dir>/<doc_id>.placements.json`，由下游渲染服务完成叠加。
pub struct SidecarMergeEngine {
    output_dir: PathBuf,
}

impl SidecarMergeEngine {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 文档合成后的输出路径
    pub fn output_path(&self, doc_id: &str) -> PathBuf {
        self.output_dir.join(doc_id)
    }
}

#[async_trait]
impl MergeEngine for SidecarMergeEngine {
    async fn merge(
        &self,
        doc_id: &str,
        base_path: &str,
        sign_area: &[SignPlacement],
    ) -> SignResult<String> {
        let fail = |message: String| SignError::merge_failed(doc_id, message);

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let output = self.output_path(doc_id);
        fs::copy(base_path, &output)
            .await
            .map_err(|e| fail(format!("复制 {} 失败: {}", base_path, e)))?;

        let sidecar = self.output_dir.join(placements_file_name(doc_id));
        let manifest = serde_json::to_vec_pretty(sign_area).map_err(|e| fail(e.to_string()))?;
        fs::write(&sidecar, manifest)
            .await
            .map_err(|e| fail(e.to_string()))?;

        info!(
            "文档 {} 合成完成: {} 个签名区域 -> {}",
            doc_id,
            sign_area.len(),
            output.display()
        );
        Ok(output.to_string_lossy().to_string())
    }
}
