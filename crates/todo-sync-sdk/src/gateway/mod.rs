//! 远程网关
//!
//! 控制器通过 [`RemoteGateway`] 访问按所有者划分的远端 todos 资源。
//! 传输编码不属于控制器：`http` 提供基于 reqwest 的实现，
//! `memory` 提供进程内实现（可注入失败，供测试与演示使用）。

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::{Todo, TodoPatch};

pub mod http;
pub mod memory;

pub use http::HttpGateway;
pub use memory::{GatewayCall, GatewayOp, InMemoryGateway};

/// 远程网关 trait（由传输层实现）
///
/// 每个调用一旦发出便无法取消；失败统一以 `Err` 返回。
#[async_trait]
pub trait RemoteGateway: Send + Sync + std::fmt::Debug {
    /// 拉取所有者的全部条目
    async fn list(&self, owner_id: u64) -> Result<Vec<Todo>>;

    /// 创建条目，返回服务端分配 id 后的条目
    async fn create(&self, owner_id: u64, title: &str) -> Result<Todo>;

    /// 删除条目
    async fn delete(&self, id: u64) -> Result<()>;

    /// 更新部分字段，返回服务端回显的条目
    async fn update(&self, id: u64, patch: &TodoPatch) -> Result<Todo>;
}
