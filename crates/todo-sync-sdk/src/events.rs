//! 事件系统模块 - 把控制器的状态变化推送给展示层
//!
//! 功能包括：
//! - 条目列表、加载状态、占位条目变更事件
//! - 错误通道变更事件
//! - 进行中集合、编辑会话变更事件
//! - 事件广播和订阅机制

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::edit_session::EditSession;
use crate::error_channel::ErrorKind;
use crate::storage::PendingTodo;

/// 同步事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// 已确认条目列表变更
    TodosChanged { count: usize, timestamp: i64 },
    /// 加载状态变更
    LoadingChanged { loading: bool, timestamp: i64 },
    /// 占位条目出现或消失
    PlaceholderChanged {
        pending: Option<PendingTodo>,
        timestamp: i64,
    },
    /// 错误通道变更（包括自动过期）
    ErrorChanged { kind: ErrorKind, timestamp: i64 },
    /// 进行中集合变更
    ProcessingChanged { ids: Vec<u64>, timestamp: i64 },
    /// 编辑会话打开、关闭或草稿变化
    EditSessionChanged {
        session: Option<EditSession>,
        timestamp: i64,
    },
    /// 新建输入框内容变更
    TitleInputChanged { title: String, timestamp: i64 },
}

impl SyncEvent {
    /// 获取事件类型字符串
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::TodosChanged { .. } => "todos_changed",
            SyncEvent::LoadingChanged { .. } => "loading_changed",
            SyncEvent::PlaceholderChanged { .. } => "placeholder_changed",
            SyncEvent::ErrorChanged { .. } => "error_changed",
            SyncEvent::ProcessingChanged { .. } => "processing_changed",
            SyncEvent::EditSessionChanged { .. } => "edit_session_changed",
            SyncEvent::TitleInputChanged { .. } => "title_input_changed",
        }
    }

    /// 获取事件时间戳（UTC 毫秒）
    pub fn timestamp(&self) -> i64 {
        match self {
            SyncEvent::TodosChanged { timestamp, .. } => *timestamp,
            SyncEvent::LoadingChanged { timestamp, .. } => *timestamp,
            SyncEvent::PlaceholderChanged { timestamp, .. } => *timestamp,
            SyncEvent::ErrorChanged { timestamp, .. } => *timestamp,
            SyncEvent::ProcessingChanged { timestamp, .. } => *timestamp,
            SyncEvent::EditSessionChanged { timestamp, .. } => *timestamp,
            SyncEvent::TitleInputChanged { timestamp, .. } => *timestamp,
        }
    }
}

/// 事件过滤器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// 事件类型过滤器
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加事件类型过滤
    pub fn with_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    /// 检查事件是否匹配过滤器
    pub fn matches(&self, event: &SyncEvent) -> bool {
        match &self.event_types {
            Some(types) => types.iter().any(|t| t == event.event_type()),
            None => true,
        }
    }
}

/// 事件监听器类型
pub type EventListener = Box<dyn Fn(&SyncEvent) + Send + Sync>;

/// 事件统计信息
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    /// 总事件数
    pub total_events: u64,
    /// 按类型分组的事件数
    pub events_by_type: HashMap<String, u64>,
    /// 监听器数量
    pub listener_count: usize,
    /// 最后事件时间
    pub last_event_time: Option<i64>,
}

/// 事件管理器
pub struct EventManager {
    /// 广播发送器
    sender: broadcast::Sender<SyncEvent>,
    /// 事件监听器映射
    listeners: Arc<tokio::sync::RwLock<HashMap<String, Vec<EventListener>>>>,
    /// 事件统计
    stats: Arc<tokio::sync::RwLock<EventStats>>,
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl EventManager {
    /// 创建新的事件管理器
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            listeners: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            stats: Arc::new(tokio::sync::RwLock::new(EventStats::default())),
        }
    }

    /// 发布事件
    pub async fn emit(&self, event: SyncEvent) {
        debug!("Emitting event: {}", event.event_type());

        {
            let mut stats = self.stats.write().await;
            stats.total_events += 1;
            *stats
                .events_by_type
                .entry(event.event_type().to_string())
                .or_insert(0) += 1;
            stats.last_event_time = Some(event.timestamp());
        }

        // 无订阅者时 send 会失败，属正常场景（无界面的调用方），仅打 debug
        if let Err(e) = self.sender.send(event.clone()) {
            debug!("Failed to broadcast event (no active receivers): {}", e);
        }

        let listeners = self.listeners.read().await;
        if let Some(event_listeners) = listeners.get(event.event_type()) {
            for listener in event_listeners {
                listener(&event);
            }
        }
        if let Some(general_listeners) = listeners.get("*") {
            for listener in general_listeners {
                listener(&event);
            }
        }
    }

    /// 订阅全部事件
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// 订阅特定类型的事件
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredEventReceiver {
        FilteredEventReceiver::new(self.sender.subscribe(), filter)
    }

    /// 添加事件监听器，`"*"` 表示监听全部事件
    pub async fn add_listener<F>(&self, event_type: &str, listener: F)
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write().await;
        listeners
            .entry(event_type.to_string())
            .or_insert_with(Vec::new)
            .push(Box::new(listener));

        let mut stats = self.stats.write().await;
        stats.listener_count = listeners.values().map(|v| v.len()).sum();

        info!("Added listener for event type: {}", event_type);
    }

    /// 移除所有监听器
    pub async fn clear_listeners(&self) {
        let mut listeners = self.listeners.write().await;
        listeners.clear();

        let mut stats = self.stats.write().await;
        stats.listener_count = 0;

        info!("Cleared all event listeners");
    }

    /// 获取事件统计
    pub async fn get_stats(&self) -> EventStats {
        self.stats.read().await.clone()
    }

    /// 获取活跃订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// 过滤事件接收器
pub struct FilteredEventReceiver {
    receiver: broadcast::Receiver<SyncEvent>,
    filter: EventFilter,
}

impl FilteredEventReceiver {
    pub fn new(receiver: broadcast::Receiver<SyncEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// 接收下一个匹配的事件
    pub async fn recv(&mut self) -> Result<SyncEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// 尝试接收事件（非阻塞）
    pub fn try_recv(&mut self) -> Result<SyncEvent, broadcast::error::TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}

/// 事件生成器 - 辅助函数
pub mod event_builders {
    use super::*;

    fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn todos_changed(count: usize) -> SyncEvent {
        SyncEvent::TodosChanged {
            count,
            timestamp: now_millis(),
        }
    }

    pub fn loading_changed(loading: bool) -> SyncEvent {
        SyncEvent::LoadingChanged {
            loading,
            timestamp: now_millis(),
        }
    }

    pub fn placeholder_changed(pending: Option<PendingTodo>) -> SyncEvent {
        SyncEvent::PlaceholderChanged {
            pending,
            timestamp: now_millis(),
        }
    }

    pub fn error_changed(kind: ErrorKind) -> SyncEvent {
        SyncEvent::ErrorChanged {
            kind,
            timestamp: now_millis(),
        }
    }

    pub fn processing_changed(ids: Vec<u64>) -> SyncEvent {
        SyncEvent::ProcessingChanged {
            ids,
            timestamp: now_millis(),
        }
    }

    pub fn edit_session_changed(session: Option<EditSession>) -> SyncEvent {
        SyncEvent::EditSessionChanged {
            session,
            timestamp: now_millis(),
        }
    }

    pub fn title_input_changed(title: String) -> SyncEvent {
        SyncEvent::TitleInputChanged {
            title,
            timestamp: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_event_manager_basic_functionality() {
        let manager = EventManager::new(100);
        let mut receiver = manager.subscribe();

        manager.emit(event_builders::todos_changed(3)).await;

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "todos_changed");
        assert!(received.timestamp() > 0);

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.events_by_type.get("todos_changed"), Some(&1));
    }

    #[tokio::test]
    async fn test_event_filter() {
        let manager = EventManager::new(100);
        let mut filtered = manager
            .subscribe_filtered(EventFilter::new().with_event_types(["error_changed"]));

        manager.emit(event_builders::loading_changed(true)).await;
        manager
            .emit(event_builders::error_changed(ErrorKind::AddFailed))
            .await;

        match filtered.recv().await.unwrap() {
            SyncEvent::ErrorChanged { kind, .. } => assert_eq!(kind, ErrorKind::AddFailed),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(filtered.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_event_listeners() {
        let manager = EventManager::new(100);
        let specific = Arc::new(AtomicUsize::new(0));
        let general = Arc::new(AtomicUsize::new(0));

        let specific_clone = specific.clone();
        manager
            .add_listener("processing_changed", move |_event| {
                specific_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let general_clone = general.clone();
        manager
            .add_listener("*", move |_event| {
                general_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        manager
            .emit(event_builders::processing_changed(vec![1, 2]))
            .await;
        manager.emit(event_builders::todos_changed(0)).await;

        assert_eq!(specific.load(Ordering::SeqCst), 1);
        assert_eq!(general.load(Ordering::SeqCst), 2);
        assert_eq!(manager.get_stats().await.listener_count, 2);

        manager.clear_listeners().await;
        assert_eq!(manager.get_stats().await.listener_count, 0);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let manager = EventManager::new(4);
        assert_eq!(manager.subscriber_count(), 0);
        manager.emit(event_builders::todos_changed(0)).await;
        assert_eq!(manager.get_stats().await.total_events, 1);
    }
}
