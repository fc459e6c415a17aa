//! HTTP 网关 - 基于 reqwest 的远程网关实现
//!
//! 资源路径：
//! - `GET    {base}/todos?userId={owner}`
//! - `POST   {base}/todos`
//! - `DELETE {base}/todos/{id}`
//! - `PATCH  {base}/todos/{id}`

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, error, info};

use super::RemoteGateway;
use crate::config::{HttpClientConfig, TodoSyncConfig};
use crate::error::{Result, TodoSyncError};
use crate::storage::{NewTodo, Todo, TodoPatch};
use crate::version;

/// HTTP 网关
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// 创建新的 HTTP 网关
    pub fn new(config: &HttpClientConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(version::user_agent());

        if let Some(timeout) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(timeout));
        }

        if let Some(timeout) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| TodoSyncError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("✅ HTTP 网关已创建 (base_url: {})", base_url);

        Ok(Self { client, base_url })
    }

    /// 按 SDK 配置创建
    pub fn from_config(config: &TodoSyncConfig) -> Result<Self> {
        Self::new(&config.http_client_config, config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn todos_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn todo_url(&self, id: u64) -> String {
        format!("{}/todos/{}", self.base_url, id)
    }

    /// 非 2xx 状态码转换为 `TodoSyncError::Http`
    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        error!("❌ {} 失败，HTTP 状态码: {}, 错误: {}", action, status, error_text);
        Err(TodoSyncError::Http {
            status: status.as_u16(),
            message: error_text,
        })
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn list(&self, owner_id: u64) -> Result<Vec<Todo>> {
        debug!("📥 拉取条目: owner_id={}", owner_id);
        let response = self
            .client
            .get(self.todos_url())
            .query(&[("userId", owner_id)])
            .send()
            .await?;
        let response = Self::ensure_success(response, "list todos").await?;
        let todos: Vec<Todo> = response.json().await?;
        debug!("📥 拉取完成: {} 条", todos.len());
        Ok(todos)
    }

    async fn create(&self, owner_id: u64, title: &str) -> Result<Todo> {
        debug!("📤 创建条目: owner_id={}, title={:?}", owner_id, title);
        let body = NewTodo {
            user_id: owner_id,
            title: title.to_string(),
            completed: false,
        };
        let response = self
            .client
            .post(self.todos_url())
            .json(&body)
            .send()
            .await?;
        let response = Self::ensure_success(response, "create todo").await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        debug!("🗑️ 删除条目: id={}", id);
        let response = self.client.delete(self.todo_url(id)).send().await?;
        Self::ensure_success(response, "delete todo").await?;
        Ok(())
    }

    async fn update(&self, id: u64, patch: &TodoPatch) -> Result<Todo> {
        debug!("✏️ 更新条目: id={}, patch={:?}", id, patch);
        let response = self
            .client
            .patch(self.todo_url(id))
            .json(patch)
            .send()
            .await?;
        let response = Self::ensure_success(response, "update todo").await?;
        Ok(response.json().await?)
    }
}
