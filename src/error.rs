use thiserror::Error;

/// 签署流程错误类型
///
/// 调用方需要区分"不存在"、"当前状态不允许"和"临时失败可重试"三类情况，
/// 因此每个变体都对应一个稳定的 [`ErrorKind`]。
#[derive(Debug, Error)]
pub enum SignError {
    /// 文档或签署记录不存在
    #[error("不存在: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// 当前状态不允许该操作
    #[error("文档 {doc_id} 状态不允许该操作: {reason}")]
    InvalidState { doc_id: String, reason: String },

    /// 签署会话已经开始
    #[error("用户 {user_id} 已开始签署文档 {doc_id}")]
    DuplicateSession { doc_id: String, user_id: String },

    /// 补签次数已用完或文档不允许补签
    #[error("文档 {doc_id} 不允许补签，或补签次数已用完")]
    QuotaExceeded { doc_id: String },

    /// 存储层错误（可重试）
    #[error("数据库操作出错 ({operation}): {message}")]
    Persistence { operation: String, message: String },

    /// 签名与文档合并失败（可重试）
    #[error("文档 {doc_id} 合并失败: {message}")]
    Merge { doc_id: String, message: String },

    /// 输入校验失败
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 文件操作错误
    #[error("文件操作失败 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

/// 错误类别，供调用方映射为用户可见的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    DuplicateSession,
    QuotaExceeded,
    Persistence,
    Merge,
    InvalidInput,
    File,
    Config,
}

impl SignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignError::NotFound { .. } => ErrorKind::NotFound,
            SignError::InvalidState { .. } => ErrorKind::InvalidState,
            SignError::DuplicateSession { .. } => ErrorKind::DuplicateSession,
            SignError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            SignError::Persistence { .. } => ErrorKind::Persistence,
            SignError::Merge { .. } => ErrorKind::Merge,
            SignError::InvalidInput(_) => ErrorKind::InvalidInput,
            SignError::File { .. } => ErrorKind::File,
            SignError::Config(_) => ErrorKind::Config,
        }
    }

    /// 调用方是否可以原样重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Persistence | ErrorKind::Merge | ErrorKind::File
        )
    }
}

// ========== 便捷构造函数 ==========

impl SignError {
    /// 创建文档不存在错误
    pub fn document_not_found(doc_id: impl Into<String>) -> Self {
        SignError::NotFound {
            entity: "document",
            id: doc_id.into(),
        }
    }

    /// 创建状态不允许错误
    pub fn invalid_state(doc_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SignError::InvalidState {
            doc_id: doc_id.into(),
            reason: reason.into(),
        }
    }

    /// 创建存储层错误
    pub fn persistence(operation: impl Into<String>, message: impl ToString) -> Self {
        SignError::Persistence {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// 创建合并失败错误
    pub fn merge_failed(doc_id: impl Into<String>, message: impl ToString) -> Self {
        SignError::Merge {
            doc_id: doc_id.into(),
            message: message.to_string(),
        }
    }

    /// 创建文件操作错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        SignError::File {
            path: path.into(),
            source,
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for SignError {
    fn from(err: serde_json::Error) -> Self {
        SignError::persistence("serde_json", err)
    }
}

impl From<toml::de::Error> for SignError {
    fn from(err: toml::de::Error) -> Self {
        SignError::Config(err.to_string())
    }
}

// ========== Result 类型别名 ==========

/// 签署流程结果类型
pub type SignResult<T> = Result<T, SignError>;
