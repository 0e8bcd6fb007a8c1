use crate::error::{SignError, SignResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 上传文档存放目录
    pub upload_dir: PathBuf,
    /// 合成后的签署文档目录（相对 upload_dir）
    pub signed_dir_name: String,
    /// 存储快照文件，为空时只保存在内存中
    pub state_file: Option<PathBuf>,
    /// 单个上传文件大小上限（字节）
    pub max_upload_bytes: u64,
    /// 发布时未指定补签次数时使用的默认值
    pub default_repeat_sign_limit: u32,
    /// 结束签署前是否要求所有签署人都已签署
    pub enforce_signer_completion: bool,
    /// 清理孤立文件时的最大并发数
    pub max_concurrent_removals: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("public/upload/docs"),
            signed_dir_name: "sign-docs".to_string(),
            state_file: Some(PathBuf::from("data/sign_flow.json")),
            max_upload_bytes: 5 * 1024 * 1024,
            default_repeat_sign_limit: 0,
            enforce_signer_completion: true,
            max_concurrent_removals: 8,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            upload_dir: std::env::var("SIGN_UPLOAD_DIR").map(PathBuf::from).unwrap_or(default.upload_dir),
            signed_dir_name: std::env::var("SIGN_SIGNED_DIR_NAME").unwrap_or(default.signed_dir_name),
            state_file: match std::env::var("SIGN_STATE_FILE") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(PathBuf::from(v)),
                Err(_) => default.state_file,
            },
            max_upload_bytes: std::env::var("SIGN_MAX_UPLOAD_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_upload_bytes),
            default_repeat_sign_limit: std::env::var("SIGN_DEFAULT_REPEAT_SIGN_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.default_repeat_sign_limit),
            enforce_signer_completion: std::env::var("SIGN_ENFORCE_SIGNER_COMPLETION").ok().and_then(|v| v.parse().ok()).unwrap_or(default.enforce_signer_completion),
            max_concurrent_removals: std::env::var("SIGN_MAX_CONCURRENT_REMOVALS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_removals),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> SignResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SignError::file(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SignResult<Self> {
        let config: Config = toml::from_str(content)?;
        if config.max_concurrent_removals == 0 {
            return Err(SignError::Config(
                "max_concurrent_removals 必须大于 0".to_string(),
            ));
        }
        Ok(config)
    }

    /// 合成文档所在目录
    pub fn signed_dir(&self) -> PathBuf {
        self.upload_dir.join(&self.signed_dir_name)
    }
}
