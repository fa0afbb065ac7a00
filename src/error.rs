// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("会话凭据被拒绝 (Cookie 无效或已过期)")]
    SessionInvalid,
    #[error("请求超时: {0}")]
    Timeout(String),
    #[error("扫描已被同一课程的新扫描取代")]
    Superseded,
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("安全错误: {0}")]
    Security(String),
    #[error("用户中断")]
    UserInterrupt,
    #[error("{0}")] // 只打印内部信息，不加任何前缀
    UserInputError(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// 单个链接解析失败的原因。全部是局部、非致命的：只跳过当前条目。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("页面获取失败: {0}")]
    FetchFailure(String),
    #[error("未能从页面中提取目标链接")]
    ExtractionMiss,
    #[error("目标链接被排除: {0}")]
    ClassificationReject(String),
    #[error("无法解析的链接: {0}")]
    MalformedUrl(String),
}

impl From<&AppError> for ResolveError {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Url(e) => ResolveError::MalformedUrl(e.to_string()),
            other => ResolveError::FetchFailure(other.to_string()),
        }
    }
}
