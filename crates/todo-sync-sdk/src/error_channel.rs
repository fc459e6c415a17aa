//! 错误通道
//!
//! 同一时刻只保留一个错误：新错误覆盖旧错误并重新开始计时，
//! 计时结束且期间没有被覆盖或清除时自动清空。

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::{event_builders, EventManager};

/// 默认展示时长
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_millis(3000);

/// 展示给用户的错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorKind {
    #[default]
    None,
    LoadFailed,
    TitleEmpty,
    AddFailed,
    DeleteFailed,
    UpdateFailed,
}

impl ErrorKind {
    /// 错误横幅文案，`None` 为空串
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::None => "",
            ErrorKind::LoadFailed => "Unable to load todos",
            ErrorKind::TitleEmpty => "Title should not be empty",
            ErrorKind::AddFailed => "Unable to add a todo",
            ErrorKind::DeleteFailed => "Unable to delete a todo",
            ErrorKind::UpdateFailed => "Unable to update a todo",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ErrorKind::None)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Default)]
struct ErrorSlot {
    kind: ErrorKind,
    /// 每次 set/clear 递增，过期任务只清除自己那一代的错误
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// 错误通道，可廉价克隆，克隆体共享同一状态
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    inner: Arc<Mutex<ErrorSlot>>,
    display_duration: Duration,
    event_manager: Arc<EventManager>,
}

impl ErrorChannel {
    pub fn new(display_duration: Duration, event_manager: Arc<EventManager>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ErrorSlot::default())),
            display_duration,
            event_manager,
        }
    }

    /// 当前错误
    pub fn current(&self) -> ErrorKind {
        self.inner.lock().kind
    }

    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }

    /// 设置错误并（重新）开始过期计时
    ///
    /// 必须在 tokio 运行时内调用。
    pub async fn set(&self, kind: ErrorKind) {
        if kind.is_none() {
            self.clear().await;
            return;
        }

        let generation = {
            let mut slot = self.inner.lock();
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
            slot.generation += 1;
            slot.kind = kind;
            slot.generation
        };

        let inner = Arc::clone(&self.inner);
        let event_manager = Arc::clone(&self.event_manager);
        let display_duration = self.display_duration;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(display_duration).await;
            let expired = {
                let mut slot = inner.lock();
                if slot.generation == generation && !slot.kind.is_none() {
                    slot.kind = ErrorKind::None;
                    slot.timer = None;
                    true
                } else {
                    false
                }
            };
            if expired {
                debug!("⏱️ 错误提示已过期: generation={}", generation);
                event_manager
                    .emit(event_builders::error_changed(ErrorKind::None))
                    .await;
            }
        });

        {
            let mut slot = self.inner.lock();
            if slot.generation == generation {
                slot.timer = Some(timer);
            } else {
                timer.abort();
            }
        }

        debug!("⚠️ 设置错误提示: {:?}", kind);
        self.event_manager
            .emit(event_builders::error_changed(kind))
            .await;
    }

    /// 立即清除错误并取消计时
    pub async fn clear(&self) {
        let previous = {
            let mut slot = self.inner.lock();
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
            slot.generation += 1;
            std::mem::take(&mut slot.kind)
        };

        if !previous.is_none() {
            self.event_manager
                .emit(event_builders::error_changed(ErrorKind::None))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SyncEvent;

    fn channel() -> (ErrorChannel, Arc<EventManager>) {
        let events = Arc::new(EventManager::new(64));
        (ErrorChannel::new(DEFAULT_ERROR_DISPLAY, events.clone()), events)
    }

    #[test]
    fn test_messages() {
        assert_eq!(ErrorKind::None.message(), "");
        assert_eq!(ErrorKind::LoadFailed.to_string(), "Unable to load todos");
        assert_eq!(ErrorKind::TitleEmpty.to_string(), "Title should not be empty");
        assert_eq!(ErrorKind::AddFailed.to_string(), "Unable to add a todo");
        assert_eq!(ErrorKind::DeleteFailed.to_string(), "Unable to delete a todo");
        assert_eq!(ErrorKind::UpdateFailed.to_string(), "Unable to update a todo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_expires_after_display_duration() {
        let (errors, _events) = channel();
        errors.set(ErrorKind::AddFailed).await;
        assert_eq!(errors.current(), ErrorKind::AddFailed);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(errors.current(), ErrorKind::AddFailed);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(errors.current(), ErrorKind::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_error_restarts_timer() {
        let (errors, _events) = channel();
        errors.set(ErrorKind::AddFailed).await;
        tokio::time::sleep(Duration::from_millis(2000)).await;

        errors.set(ErrorKind::DeleteFailed).await;
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(errors.current(), ErrorKind::DeleteFailed);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(errors.current(), ErrorKind::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_timer() {
        let (errors, events) = channel();
        let mut receiver = events.subscribe();

        errors.set(ErrorKind::UpdateFailed).await;
        errors.clear().await;
        assert_eq!(errors.current(), ErrorKind::None);

        // 旧计时器不应在新错误期间提前清除
        errors.set(ErrorKind::LoadFailed).await;
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(errors.current(), ErrorKind::LoadFailed);

        let kinds: Vec<ErrorKind> = std::iter::from_fn(|| receiver.try_recv().ok())
            .filter_map(|event| match event {
                SyncEvent::ErrorChanged { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::UpdateFailed, ErrorKind::None, ErrorKind::LoadFailed]
        );
    }

    #[tokio::test]
    async fn test_clear_without_error_emits_nothing() {
        let (errors, events) = channel();
        errors.clear().await;
        assert_eq!(events.get_stats().await.total_events, 0);

        errors.set(ErrorKind::None).await;
        assert_eq!(errors.current(), ErrorKind::None);
        assert_eq!(events.get_stats().await.total_events, 0);
    }
}
