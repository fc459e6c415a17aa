//! 本地条目存储
//!
//! 有序保存已被服务端确认的条目，插入顺序即展示顺序。
//! 纯数据容器：不感知网络，也不做任何重试。
//!
//! 不变式：
//! - id 两两不同
//! - 不存在 `id == 0` 的条目
//! - 所有操作都保持未触及条目的相对顺序

use std::collections::HashSet;

use super::entities::Todo;
use crate::error::{Result, TodoSyncError};

#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todos: Vec<Todo>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一组条目构造存储，校验不变式
    pub fn from_todos(todos: Vec<Todo>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(todos.len());
        for todo in &todos {
            Self::check_id(todo.id)?;
            if !seen.insert(todo.id) {
                return Err(TodoSyncError::InvalidData(format!(
                    "duplicate todo id {}",
                    todo.id
                )));
            }
        }
        Ok(Self { todos })
    }

    pub fn list(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    /// 追加到末尾
    pub fn append(&mut self, todo: Todo) -> Result<()> {
        Self::check_id(todo.id)?;
        if self.contains(todo.id) {
            return Err(TodoSyncError::InvalidData(format!(
                "duplicate todo id {}",
                todo.id
            )));
        }
        self.todos.push(todo);
        Ok(())
    }

    /// 删除指定条目，返回被删除的条目
    pub fn remove(&mut self, id: u64) -> Option<Todo> {
        let index = self.todos.iter().position(|todo| todo.id == id)?;
        Some(self.todos.remove(index))
    }

    /// 原位替换指定条目
    ///
    /// 新条目的 id 可以与原 id 不同，但不能与其他条目冲突。
    pub fn replace(&mut self, id: u64, todo: Todo) -> Result<()> {
        Self::check_id(todo.id)?;
        if todo.id != id && self.contains(todo.id) {
            return Err(TodoSyncError::InvalidData(format!(
                "replacement id {} collides with an existing todo",
                todo.id
            )));
        }
        let slot = self
            .todos
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or(TodoSyncError::NotFound(id))?;
        *slot = todo;
        Ok(())
    }

    /// 批量删除，一次性完成；返回实际删除的数量
    pub fn remove_many(&mut self, ids: &[u64]) -> usize {
        let targets: HashSet<u64> = ids.iter().copied().collect();
        let before = self.todos.len();
        self.todos.retain(|todo| !targets.contains(&todo.id));
        before - self.todos.len()
    }

    /// 对指定条目批量应用更新函数；返回被更新的数量
    ///
    /// 更新函数不得修改 id。
    pub fn apply_many<F>(&mut self, ids: &[u64], mut updater: F) -> usize
    where
        F: FnMut(&mut Todo),
    {
        let targets: HashSet<u64> = ids.iter().copied().collect();
        let mut updated = 0;
        for todo in self.todos.iter_mut().filter(|todo| targets.contains(&todo.id)) {
            let id = todo.id;
            updater(todo);
            todo.id = id;
            updated += 1;
        }
        updated
    }

    /// 未完成条目数
    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.todos.len() - self.active_count()
    }

    /// 非空且全部已完成
    pub fn all_completed(&self) -> bool {
        !self.todos.is_empty() && self.todos.iter().all(|todo| todo.completed)
    }

    /// 按条件筛选 id，保持存储顺序
    pub fn select_ids<P>(&self, mut predicate: P) -> Vec<u64>
    where
        P: FnMut(&Todo) -> bool,
    {
        self.todos
            .iter()
            .filter(|todo| predicate(todo))
            .map(|todo| todo.id)
            .collect()
    }

    fn check_id(id: u64) -> Result<()> {
        if id == 0 {
            return Err(TodoSyncError::InvalidData(
                "todo id 0 is reserved for unsaved todos".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TodoStore {
        TodoStore::from_todos(vec![
            Todo::new(1, 9, "a", false),
            Todo::new(2, 9, "b", true),
            Todo::new(3, 9, "c", true),
            Todo::new(4, 9, "d", false),
        ])
        .unwrap()
    }

    fn ids(store: &TodoStore) -> Vec<u64> {
        store.list().iter().map(|todo| todo.id).collect()
    }

    #[test]
    fn test_from_todos_rejects_invalid_ids() {
        assert!(TodoStore::from_todos(vec![Todo::new(0, 1, "x", false)]).is_err());
        assert!(TodoStore::from_todos(vec![
            Todo::new(5, 1, "x", false),
            Todo::new(5, 1, "y", false),
        ])
        .is_err());
    }

    #[test]
    fn test_append_keeps_ids_unique() {
        let mut store = sample();
        store.append(Todo::new(5, 9, "e", false)).unwrap();
        assert_eq!(ids(&store), vec![1, 2, 3, 4, 5]);

        assert!(store.append(Todo::new(5, 9, "dup", false)).is_err());
        assert!(store.append(Todo::new(0, 9, "placeholder", false)).is_err());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut store = sample();
        let removed = store.remove(2).unwrap();
        assert_eq!(removed.title, "b");
        assert_eq!(ids(&store), vec![1, 3, 4]);
        assert!(store.remove(2).is_none());
    }

    #[test]
    fn test_replace_in_place() {
        let mut store = sample();
        store.replace(3, Todo::new(3, 9, "renamed", false)).unwrap();
        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
        assert_eq!(store.get(3).unwrap().title, "renamed");

        assert!(matches!(
            store.replace(42, Todo::new(42, 9, "x", false)),
            Err(TodoSyncError::NotFound(42))
        ));
        assert!(store.replace(3, Todo::new(1, 9, "collide", false)).is_err());
    }

    #[test]
    fn test_remove_many_is_single_pass() {
        let mut store = sample();
        assert_eq!(store.remove_many(&[2, 3, 99]), 2);
        assert_eq!(ids(&store), vec![1, 4]);
    }

    #[test]
    fn test_apply_many_cannot_change_ids() {
        let mut store = sample();
        let updated = store.apply_many(&[1, 4], |todo| {
            todo.completed = true;
            todo.id = 100;
        });
        assert_eq!(updated, 2);
        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
        assert!(store.all_completed());
    }

    #[test]
    fn test_counters() {
        let store = sample();
        assert_eq!(store.active_count(), 2);
        assert_eq!(store.completed_count(), 2);
        assert!(!store.all_completed());
        assert!(!TodoStore::new().all_completed());
        assert_eq!(store.select_ids(|todo| todo.completed), vec![2, 3]);
    }
}
