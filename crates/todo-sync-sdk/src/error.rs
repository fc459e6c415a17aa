use thiserror::Error;

/// SDK 内部错误
///
/// 控制器命令不会把这些错误直接抛给调用方，而是转换为 [`crate::ErrorKind`]
/// 写入错误通道；网关、配置校验等底层接口仍以 `Result` 返回。
#[derive(Debug, Error)]
pub enum TodoSyncError {
    /// 传输层错误（连接失败、超时等）
    #[error("Transport error: {0}")]
    Transport(String),

    /// 服务端返回非 2xx 状态码
    #[error("HTTP error [{status}]: {message}")]
    Http { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 服务端或调用方给出的数据违反本地不变式
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: todo {0}")]
    NotFound(u64),

    /// 同一条目已有进行中的远程变更
    #[error("Todo {0} is already processing")]
    AlreadyProcessing(u64),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TodoSyncError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TodoSyncError::Serialization(error.to_string())
        } else if let Some(status) = error.status() {
            TodoSyncError::Http {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            TodoSyncError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for TodoSyncError {
    fn from(error: serde_json::Error) -> Self {
        TodoSyncError::Serialization(error.to_string())
    }
}

impl TodoSyncError {
    /// 判断是否是服务端拒绝（HTTP 状态码错误）
    pub fn is_http_error(&self) -> bool {
        matches!(self, TodoSyncError::Http { .. })
    }

    /// 获取 HTTP 状态码（如果这是一个 HTTP 错误）
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TodoSyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TodoSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_helpers() {
        let err = TodoSyncError::Http {
            status: 404,
            message: "missing".to_string(),
        };
        assert!(err.is_http_error());
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(err.to_string(), "HTTP error [404]: missing");

        let err = TodoSyncError::Transport("connection refused".to_string());
        assert!(!err.is_http_error());
        assert_eq!(err.http_status(), None);
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<u64>("not a number").unwrap_err();
        let err: TodoSyncError = parse_err.into();
        assert!(matches!(err, TodoSyncError::Serialization(_)));
    }
}
