//! 进程内网关
//!
//! 行为与远端资源一致（服务端分配 id、按所有者过滤、未知 id 返回 404），
//! 并支持按操作或按条目注入失败、模拟延迟、记录调用，用于测试与演示。

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use super::RemoteGateway;
use crate::error::{Result, TodoSyncError};
use crate::storage::{Todo, TodoPatch};

/// 网关操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    Create,
    Delete,
    Update,
}

/// 一次网关调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    List { owner_id: u64 },
    Create { owner_id: u64, title: String },
    Delete { id: u64 },
    Update { id: u64, patch: TodoPatch },
}

impl GatewayCall {
    pub fn op(&self) -> GatewayOp {
        match self {
            GatewayCall::List { .. } => GatewayOp::List,
            GatewayCall::Create { .. } => GatewayOp::Create,
            GatewayCall::Delete { .. } => GatewayOp::Delete,
            GatewayCall::Update { .. } => GatewayOp::Update,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    todos: Vec<Todo>,
    next_id: u64,
    failing_ops: HashSet<GatewayOp>,
    failing_ids: HashSet<u64>,
    calls: Vec<GatewayCall>,
}

/// 进程内网关
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<MemoryState>,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有条目初始化，新 id 从最大 id 之后开始分配
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let next_id = todos.iter().map(|todo| todo.id).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(MemoryState {
                todos,
                next_id,
                ..Default::default()
            }),
            latency: Mutex::new(None),
        }
    }

    /// 让某类操作全部失败
    pub fn fail_op(&self, op: GatewayOp) {
        self.state.lock().failing_ops.insert(op);
    }

    /// 让针对某个条目的删除和更新失败
    pub fn fail_id(&self, id: u64) {
        self.state.lock().failing_ids.insert(id);
    }

    /// 清除所有失败注入
    pub fn recover(&self) {
        let mut state = self.state.lock();
        state.failing_ops.clear();
        state.failing_ids.clear();
    }

    /// 每次调用前等待的时长
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// 服务端当前保存的条目
    pub fn todos(&self) -> Vec<Todo> {
        self.state.lock().todos.clone()
    }

    /// 按发出顺序记录的调用
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, op: GatewayOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn injected_failure(op: GatewayOp, id: Option<u64>) -> TodoSyncError {
        match id {
            Some(id) => TodoSyncError::Transport(format!("injected {:?} failure for todo {}", op, id)),
            None => TodoSyncError::Transport(format!("injected {:?} failure", op)),
        }
    }

    fn not_found(id: u64) -> TodoSyncError {
        TodoSyncError::Http {
            status: 404,
            message: format!("todo {} not found", id),
        }
    }
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn list(&self, owner_id: u64) -> Result<Vec<Todo>> {
        self.state.lock().calls.push(GatewayCall::List { owner_id });
        self.simulate_latency().await;

        let state = self.state.lock();
        if state.failing_ops.contains(&GatewayOp::List) {
            return Err(Self::injected_failure(GatewayOp::List, None));
        }
        Ok(state
            .todos
            .iter()
            .filter(|todo| todo.user_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create(&self, owner_id: u64, title: &str) -> Result<Todo> {
        self.state.lock().calls.push(GatewayCall::Create {
            owner_id,
            title: title.to_string(),
        });
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.failing_ops.contains(&GatewayOp::Create) {
            return Err(Self::injected_failure(GatewayOp::Create, None));
        }
        let id = state.next_id.max(1);
        state.next_id = id + 1;
        let todo = Todo::new(id, owner_id, title, false);
        state.todos.push(todo.clone());
        debug!("memory gateway created todo {}", id);
        Ok(todo)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.state.lock().calls.push(GatewayCall::Delete { id });
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.failing_ops.contains(&GatewayOp::Delete) || state.failing_ids.contains(&id) {
            return Err(Self::injected_failure(GatewayOp::Delete, Some(id)));
        }
        let index = state
            .todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        state.todos.remove(index);
        Ok(())
    }

    async fn update(&self, id: u64, patch: &TodoPatch) -> Result<Todo> {
        self.state.lock().calls.push(GatewayCall::Update {
            id,
            patch: patch.clone(),
        });
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.failing_ops.contains(&GatewayOp::Update) || state.failing_ids.contains(&id) {
            return Err(Self::injected_failure(GatewayOp::Update, Some(id)));
        }
        let todo = state
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        patch.apply_to(todo);
        Ok(todo.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let gateway = InMemoryGateway::with_todos(vec![
            Todo::new(1, 7, "mine", false),
            Todo::new(2, 8, "other owner", false),
        ]);

        assert_eq!(gateway.list(7).await.unwrap().len(), 1);

        let created = gateway.create(7, "new").await.unwrap();
        assert_eq!(created.id, 3);

        let updated = gateway
            .update(3, &TodoPatch::new().with_completed(true))
            .await
            .unwrap();
        assert!(updated.completed);

        gateway.delete(1).await.unwrap();
        assert_eq!(gateway.delete(1).await.unwrap_err().http_status(), Some(404));
        assert_eq!(gateway.list(7).await.unwrap(), vec![updated]);
        assert_eq!(gateway.call_count(GatewayOp::Delete), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let gateway = InMemoryGateway::with_todos(vec![
            Todo::new(1, 7, "a", true),
            Todo::new(2, 7, "b", true),
        ]);
        gateway.fail_id(2);
        assert!(gateway.delete(1).await.is_ok());
        assert!(gateway.delete(2).await.is_err());

        gateway.fail_op(GatewayOp::Create);
        assert!(gateway.create(7, "x").await.is_err());

        gateway.recover();
        assert!(gateway.create(7, "x").await.is_ok());
        assert!(gateway.delete(2).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_gateway_allocates_from_one() {
        let gateway = InMemoryGateway::new();
        assert_eq!(gateway.create(1, "first").await.unwrap().id, 1);
        assert_eq!(gateway.create(1, "second").await.unwrap().id, 2);
    }
}
