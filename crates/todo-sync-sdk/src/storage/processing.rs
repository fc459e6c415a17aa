//! 进行中集合
//!
//! 记录正在等待远程变更结果的条目 id。既用于界面禁用，也是每个条目的互斥锁：
//! 同一 id 在结果返回前不能再发起第二次变更。

use std::collections::BTreeSet;

use crate::error::{Result, TodoSyncError};

#[derive(Debug, Clone, Default)]
pub struct ProcessingSet {
    ids: BTreeSet<u64>,
}

impl ProcessingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 占用一个 id；已被占用时返回 `AlreadyProcessing`
    pub fn begin(&mut self, id: u64) -> Result<()> {
        if !self.ids.insert(id) {
            return Err(TodoSyncError::AlreadyProcessing(id));
        }
        Ok(())
    }

    /// 一次占用多个 id，要么全部成功，要么一个都不占用
    pub fn begin_many(&mut self, ids: &[u64]) -> Result<()> {
        if let Some(busy) = ids.iter().find(|id| self.ids.contains(*id)) {
            return Err(TodoSyncError::AlreadyProcessing(*busy));
        }
        let mut unique = BTreeSet::new();
        if let Some(dup) = ids.iter().find(|id| !unique.insert(**id)) {
            return Err(TodoSyncError::InvalidArgument(format!(
                "id {} listed twice in one batch",
                dup
            )));
        }
        self.ids.extend(unique);
        Ok(())
    }

    /// 释放一个 id；返回该 id 之前是否被占用
    pub fn end(&mut self, id: u64) -> bool {
        self.ids.remove(&id)
    }

    pub fn end_many(&mut self, ids: &[u64]) {
        for id in ids {
            self.ids.remove(id);
        }
    }

    pub fn is_processing(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn any_processing(&self) -> bool {
        !self.ids.is_empty()
    }

    /// 当前占用的 id（升序）
    pub fn ids(&self) -> Vec<u64> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_rejects_second_claim() {
        let mut set = ProcessingSet::new();
        set.begin(1).unwrap();
        assert!(matches!(set.begin(1), Err(TodoSyncError::AlreadyProcessing(1))));
        assert!(set.is_processing(1));
        assert!(set.any_processing());

        assert!(set.end(1));
        assert!(!set.end(1));
        assert!(!set.any_processing());
        set.begin(1).unwrap();
    }

    #[test]
    fn test_begin_many_is_all_or_nothing() {
        let mut set = ProcessingSet::new();
        set.begin(2).unwrap();

        assert!(matches!(
            set.begin_many(&[1, 2, 3]),
            Err(TodoSyncError::AlreadyProcessing(2))
        ));
        assert_eq!(set.ids(), vec![2]);

        assert!(set.begin_many(&[4, 4]).is_err());
        assert_eq!(set.ids(), vec![2]);

        set.begin_many(&[3, 1]).unwrap();
        assert_eq!(set.ids(), vec![1, 2, 3]);

        set.end_many(&[1, 2, 3, 9]);
        assert!(set.is_empty());
    }
}
