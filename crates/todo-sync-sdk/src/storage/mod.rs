//! 存储模块 - 本地内存镜像
//!
//! - `entities`：条目、补丁与占位条目
//! - `todo_store`：已确认条目的有序存储
//! - `processing`：进行中集合（每条目互斥）
//!
//! 这里的结构只由同步控制器修改，自身不做任何网络操作。

pub mod entities;
pub mod processing;
pub mod todo_store;

pub use entities::{ListItem, NewTodo, PendingTodo, Todo, TodoPatch};
pub use processing::ProcessingSet;
pub use todo_store::TodoStore;
