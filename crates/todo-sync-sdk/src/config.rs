//! SDK 配置
//!
//! 默认值对应参考部署：`https://mate.academy/students-api`，所有者 3093。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TodoSyncError};

/// 默认服务端地址
pub const DEFAULT_BASE_URL: &str = "https://mate.academy/students-api";

/// 默认所有者 id
pub const DEFAULT_OWNER_ID: u64 = 3093;

/// HTTP 客户端配置
///
/// 只影响传输层；控制器本身不对远程调用设置超时。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// 连接超时（秒）
    pub connect_timeout_secs: Option<u64>,
    /// 请求超时（秒）
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: Some(30),
            request_timeout_secs: Some(60),
        }
    }
}

/// Todo 同步 SDK 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoSyncConfig {
    /// 服务端 API 基础 URL
    pub base_url: String,
    /// 条目所有者（远端资源按它划分）
    pub owner_id: u64,
    /// 错误提示展示时长（毫秒）
    pub error_display_ms: u64,
    /// HTTP 客户端配置
    pub http_client_config: HttpClientConfig,
    /// 事件缓冲区大小
    pub event_buffer_size: usize,
}

impl Default for TodoSyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            owner_id: DEFAULT_OWNER_ID,
            error_display_ms: 3000,
            http_client_config: HttpClientConfig::default(),
            event_buffer_size: 1000,
        }
    }
}

impl TodoSyncConfig {
    pub fn builder() -> TodoSyncConfigBuilder {
        TodoSyncConfigBuilder::new()
    }

    pub fn error_display_duration(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.owner_id == 0 {
            return Err(TodoSyncError::Config("owner_id must be non-zero".to_string()));
        }
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(TodoSyncError::Config("base_url is empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(TodoSyncError::Config(format!(
                "base_url must be http(s): {}",
                base
            )));
        }
        if self.error_display_ms == 0 {
            return Err(TodoSyncError::Config(
                "error_display_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 配置构建器
pub struct TodoSyncConfigBuilder {
    config: TodoSyncConfig,
}

impl Default for TodoSyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoSyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TodoSyncConfig::default(),
        }
    }

    /// 设置服务端地址（去掉末尾的 `/`）
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn owner_id(mut self, owner_id: u64) -> Self {
        self.config.owner_id = owner_id;
        self
    }

    pub fn error_display_ms(mut self, millis: u64) -> Self {
        self.config.error_display_ms = millis;
        self
    }

    pub fn http_client_config(mut self, config: HttpClientConfig) -> Self {
        self.config.http_client_config = config;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.config.event_buffer_size = size;
        self
    }

    pub fn build(self) -> TodoSyncConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = TodoSyncConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.owner_id, 3093);
        assert_eq!(config.error_display_duration(), Duration::from_millis(3000));
        assert_ok!(config.validate());
    }

    #[test]
    fn test_builder() {
        let config = TodoSyncConfig::builder()
            .base_url("http://127.0.0.1:8080/api/")
            .owner_id(7)
            .error_display_ms(500)
            .event_buffer_size(16)
            .build();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.owner_id, 7);
        assert_eq!(config.error_display_ms, 500);
        assert_eq!(config.event_buffer_size, 16);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_owner = TodoSyncConfig::builder().owner_id(0).build();
        assert!(matches!(bad_owner.validate(), Err(TodoSyncError::Config(_))));

        let bad_url = TodoSyncConfig::builder().base_url("ftp://example.com").build();
        assert_err!(bad_url.validate());

        let empty_url = TodoSyncConfig::builder().base_url("").build();
        assert_err!(empty_url.validate());

        let bad_timer = TodoSyncConfig::builder().error_display_ms(0).build();
        assert_err!(bad_timer.validate());
    }
}
