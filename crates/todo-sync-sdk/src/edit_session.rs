//! 编辑会话 - 重命名进行中的临时状态，不持久化

use serde::{Deserialize, Serialize};

/// 同一时刻最多一个编辑会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    /// 正在编辑的条目
    pub todo_id: u64,
    /// 草稿标题（未裁剪的原始输入）
    pub draft_title: String,
}

impl EditSession {
    pub fn new(todo_id: u64, draft_title: impl Into<String>) -> Self {
        Self {
            todo_id,
            draft_title: draft_title.into(),
        }
    }

    pub fn is_editing(&self, todo_id: u64) -> bool {
        self.todo_id == todo_id
    }
}
