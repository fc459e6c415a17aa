//! 数据实体定义 - 对应远端 todos 资源
//!
//! 这里定义了本地镜像使用的结构体，用于：
//! - 类型安全的数据传输
//! - 乐观添加期间的占位条目表示
//! - 序列化/反序列化支持（字段名与服务端 JSON 一致，驼峰命名）

use serde::{Deserialize, Serialize};
use std::fmt;

/// 已持久化的 todo 条目
///
/// `id` 由服务端分配，在已确认条目中唯一；本地存储永远不会出现 `id == 0`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

impl Todo {
    pub fn new(id: u64, user_id: u64, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            completed,
        }
    }
}

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.completed { "x" } else { " " };
        write!(f, "[{}] #{} {}", mark, self.id, self.title)
    }
}

/// 部分字段更新（PATCH 请求体）
///
/// 未设置的字段不会被序列化，服务端保持原值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// 在本地条目上应用补丁
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

/// 创建请求体（POST /todos）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

/// 添加进行中的占位条目（尚未持久化，没有服务端 id）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTodo {
    pub user_id: u64,
    pub title: String,
}

impl PendingTodo {
    /// 以占位条目的形式展示（completed 恒为 false）
    pub fn completed(&self) -> bool {
        false
    }
}

/// 展示列表中的一项：已确认的条目或添加中的占位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListItem {
    Confirmed(Todo),
    Pending(PendingTodo),
}

impl ListItem {
    pub fn title(&self) -> &str {
        match self {
            ListItem::Confirmed(todo) => &todo.title,
            ListItem::Pending(pending) => &pending.title,
        }
    }

    /// 已确认条目的 id；占位条目没有 id
    pub fn id(&self) -> Option<u64> {
        match self {
            ListItem::Confirmed(todo) => Some(todo.id),
            ListItem::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ListItem::Pending(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_uses_camel_case_fields() {
        let json = r#"{"id":7,"userId":3093,"title":"buy milk","completed":false}"#;
        let todo: Todo = serde_json::from_str(json).unwrap();
        assert_eq!(todo, Todo::new(7, 3093, "buy milk", false));

        let value = serde_json::to_value(&todo).unwrap();
        assert_eq!(value["userId"], 3093);
        assert!(value.get("user_id").is_none());
    }

    #[test]
    fn test_patch_only_serializes_present_fields() {
        let patch = TodoPatch::new().with_completed(true);
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"completed":true}"#);

        let patch = TodoPatch::new().with_title("renamed");
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"title":"renamed"}"#);
        assert!(TodoPatch::new().is_empty());
    }

    #[test]
    fn test_patch_apply() {
        let mut todo = Todo::new(1, 1, "a", false);
        TodoPatch::new().with_title("b").apply_to(&mut todo);
        assert_eq!(todo.title, "b");
        assert!(!todo.completed);

        TodoPatch::new().with_completed(true).apply_to(&mut todo);
        assert!(todo.completed);
    }

    #[test]
    fn test_list_item_accessors() {
        let confirmed = ListItem::Confirmed(Todo::new(3, 1, "x", true));
        let pending = ListItem::Pending(PendingTodo {
            user_id: 1,
            title: "y".to_string(),
        });
        assert_eq!(confirmed.id(), Some(3));
        assert_eq!(pending.id(), None);
        assert!(pending.is_pending());
        assert_eq!(pending.title(), "y");
    }
}
