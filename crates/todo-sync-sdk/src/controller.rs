//! 同步控制器 - SDK 主入口
//!
//! 分层结构：
//! ```text
//! SyncController (业务逻辑层)
//!   ├── RemoteGateway (传输层，trait 对象)
//!   ├── TodoStore + ProcessingSet (本地镜像，单把锁保护)
//!   ├── ErrorChannel (错误提示，自动过期)
//!   └── EventManager (事件系统层)
//! ```
//!
//! 每个命令的流程相同：先在本地登记（进行中集合或占位条目），再调用远程网关，
//! 结果返回后一次性修正本地状态。无论成功失败，登记都会被撤销。
//! 网关错误从不直接返回给调用方，而是转换为 [`ErrorKind`] 写入错误通道。
//!
//! 锁只在同步代码块内持有，绝不跨越 `.await`；批量操作的所有远程调用并发发出，
//! 全部结束后在同一次加锁内修正存储并释放进行中 id。

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::TodoSyncConfig;
use crate::edit_session::EditSession;
use crate::error::{Result, TodoSyncError};
use crate::error_channel::{ErrorChannel, ErrorKind};
use crate::events::{event_builders, EventManager, FilteredEventReceiver, EventFilter, SyncEvent};
use crate::gateway::{HttpGateway, RemoteGateway};
use crate::storage::{ListItem, PendingTodo, ProcessingSet, Todo, TodoPatch, TodoStore};

/// 命令被拒绝的原因（未发出任何远程调用，本地状态不变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// 该条目已有进行中的远程变更
    AlreadyProcessing(u64),
    /// 已有一个添加请求在进行中
    AddInFlight,
    /// 本地存储中没有该条目
    UnknownEntity(u64),
    /// 有变更在进行中，不能整体重新加载
    Busy,
}

/// 命令结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommandOutcome {
    /// 远程调用成功，本地状态已修正
    Succeeded,
    /// 无需任何操作
    Unchanged,
    /// 已执行但失败，错误已写入错误通道
    Failed(ErrorKind),
    /// 未被接受
    Rejected(RejectReason),
}

impl CommandOutcome {
    /// 命令是否被接受（`Accepted | Rejected` 视角）
    pub fn is_accepted(&self) -> bool {
        !matches!(self, CommandOutcome::Rejected(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded)
    }
}

/// 展示层可见的全部状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSnapshot {
    pub todos: Vec<Todo>,
    pub loading: bool,
    pub placeholder: Option<PendingTodo>,
    pub error: ErrorKind,
    pub processing_ids: Vec<u64>,
    pub edit_session: Option<EditSession>,
    pub title_input: String,
    pub active_count: usize,
    pub completed_count: usize,
    pub all_completed: bool,
}

impl SyncSnapshot {
    pub fn has_todos(&self) -> bool {
        !self.todos.is_empty()
    }

    pub fn is_adding(&self) -> bool {
        self.placeholder.is_some()
    }

    pub fn any_processing(&self) -> bool {
        !self.processing_ids.is_empty()
    }
}

#[derive(Debug, Default)]
struct SyncState {
    store: TodoStore,
    processing: ProcessingSet,
    placeholder: Option<PendingTodo>,
    edit_session: Option<EditSession>,
    title_input: String,
    /// 展示用加载标志，首次加载完成前为 true
    loading: bool,
    load_in_flight: bool,
}

impl SyncState {
    /// 关闭指向已删除条目的编辑会话，返回是否关闭
    fn close_session_for(&mut self, removed: &[u64]) -> bool {
        let stale = self
            .edit_session
            .as_ref()
            .is_some_and(|session| removed.contains(&session.todo_id));
        if stale {
            self.edit_session = None;
        }
        stale
    }
}

/// 进行中登记
///
/// 持有期间对应 id 处于进行中集合（以及占位条目存在、加载标志置位）；
/// `settle` 或析构时撤销登记，因此即使调用方丢弃了命令 future，也不会留下残留状态。
struct InFlight<'a> {
    state: &'a Mutex<SyncState>,
    ids: Vec<u64>,
    placeholder: bool,
    load: bool,
}

impl<'a> InFlight<'a> {
    fn ids(state: &'a Mutex<SyncState>, ids: Vec<u64>) -> Self {
        Self {
            state,
            ids,
            placeholder: false,
            load: false,
        }
    }

    fn placeholder(state: &'a Mutex<SyncState>) -> Self {
        Self {
            state,
            ids: Vec::new(),
            placeholder: true,
            load: false,
        }
    }

    fn load(state: &'a Mutex<SyncState>) -> Self {
        Self {
            state,
            ids: Vec::new(),
            placeholder: false,
            load: true,
        }
    }

    /// 在同一次加锁内应用结果并撤销登记
    fn settle<R>(mut self, apply: impl FnOnce(&mut SyncState) -> R) -> R {
        let lock = self.state;
        let mut state = lock.lock();
        let result = apply(&mut state);
        self.release(&mut state);
        result
    }

    fn release(&mut self, state: &mut SyncState) {
        state.processing.end_many(&self.ids);
        if self.placeholder {
            state.placeholder = None;
        }
        if self.load {
            state.loading = false;
            state.load_in_flight = false;
        }
        self.ids.clear();
        self.placeholder = false;
        self.load = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.ids.is_empty() && !self.placeholder && !self.load {
            return;
        }
        warn!("命令在远程结果返回前被丢弃，撤销进行中登记: ids={:?}", self.ids);
        let lock = self.state;
        let mut state = lock.lock();
        self.release(&mut state);
    }
}

/// 同步控制器
///
/// 每个会话构造一次，通过 `Arc` 共享给展示层。所有共享状态只由控制器修改。
pub struct SyncController {
    config: TodoSyncConfig,
    gateway: Arc<dyn RemoteGateway>,
    state: Mutex<SyncState>,
    errors: ErrorChannel,
    event_manager: Arc<EventManager>,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("owner_id", &self.config.owner_id)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl SyncController {
    /// 使用 HTTP 网关初始化并完成首次加载
    pub async fn initialize(config: TodoSyncConfig) -> Result<Arc<Self>> {
        info!("正在初始化 SyncController...");
        config.validate()?;
        let gateway = HttpGateway::from_config(&config)?;
        let controller = Arc::new(Self::new(config, Arc::new(gateway))?);
        controller.load().await;
        info!("✅ SyncController 初始化完成");
        Ok(controller)
    }

    /// 使用任意网关构造（不加载）
    pub fn new(config: TodoSyncConfig, gateway: Arc<dyn RemoteGateway>) -> Result<Self> {
        config.validate()?;
        let event_manager = Arc::new(EventManager::new(config.event_buffer_size));
        let errors = ErrorChannel::new(config.error_display_duration(), event_manager.clone());
        Ok(Self {
            config,
            gateway,
            state: Mutex::new(SyncState {
                loading: true,
                ..Default::default()
            }),
            errors,
            event_manager,
        })
    }

    pub fn config(&self) -> &TodoSyncConfig {
        &self.config
    }

    pub fn owner_id(&self) -> u64 {
        self.config.owner_id
    }

    // ========================
    // 状态读取
    // ========================

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.state.lock();
        SyncSnapshot {
            todos: state.store.list().to_vec(),
            loading: state.loading,
            placeholder: state.placeholder.clone(),
            error: self.errors.current(),
            processing_ids: state.processing.ids(),
            edit_session: state.edit_session.clone(),
            title_input: state.title_input.clone(),
            active_count: state.store.active_count(),
            completed_count: state.store.completed_count(),
            all_completed: state.store.all_completed(),
        }
    }

    pub fn todos(&self) -> Vec<Todo> {
        self.state.lock().store.list().to_vec()
    }

    /// 展示列表：全部已确认条目，末尾附加添加中的占位条目
    pub fn list_items(&self) -> Vec<ListItem> {
        let state = self.state.lock();
        state
            .store
            .list()
            .iter()
            .cloned()
            .map(ListItem::Confirmed)
            .chain(state.placeholder.clone().map(ListItem::Pending))
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn placeholder(&self) -> Option<PendingTodo> {
        self.state.lock().placeholder.clone()
    }

    pub fn current_error(&self) -> ErrorKind {
        self.errors.current()
    }

    pub fn processing_ids(&self) -> Vec<u64> {
        self.state.lock().processing.ids()
    }

    pub fn is_processing(&self, id: u64) -> bool {
        self.state.lock().processing.is_processing(id)
    }

    pub fn any_processing(&self) -> bool {
        self.state.lock().processing.any_processing()
    }

    pub fn edit_session(&self) -> Option<EditSession> {
        self.state.lock().edit_session.clone()
    }

    pub fn title_input(&self) -> String {
        self.state.lock().title_input.clone()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().store.active_count()
    }

    pub fn all_completed(&self) -> bool {
        self.state.lock().store.all_completed()
    }

    pub fn event_manager(&self) -> &Arc<EventManager> {
        &self.event_manager
    }

    /// 订阅全部状态变更事件
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SyncEvent> {
        self.event_manager.subscribe()
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredEventReceiver {
        self.event_manager.subscribe_filtered(filter)
    }

    // ========================
    // 命令
    // ========================

    /// 首次加载：拉取所有者的全部条目并整体替换本地存储
    pub async fn load(&self) -> CommandOutcome {
        let in_flight = {
            let mut state = self.state.lock();
            if state.load_in_flight
                || state.processing.any_processing()
                || state.placeholder.is_some()
            {
                return CommandOutcome::Rejected(RejectReason::Busy);
            }
            state.load_in_flight = true;
            state.loading = true;
            InFlight::load(&self.state)
        };
        self.errors.clear().await;
        self.emit(event_builders::loading_changed(true)).await;
        info!("📥 加载条目: owner_id={}", self.config.owner_id);

        let loaded = self
            .gateway
            .list(self.config.owner_id)
            .await
            .and_then(TodoStore::from_todos);

        let outcome = match loaded {
            Ok(store) => {
                let count = store.len();
                in_flight.settle(|state| {
                    state.store = store;
                    let stale = state
                        .edit_session
                        .as_ref()
                        .is_some_and(|session| !state.store.contains(session.todo_id));
                    if stale {
                        state.edit_session = None;
                    }
                });
                info!("✅ 加载完成: {} 条", count);
                self.emit(event_builders::todos_changed(count)).await;
                CommandOutcome::Succeeded
            }
            Err(e) => {
                warn!("❌ 加载失败: {}", e);
                self.errors.set(ErrorKind::LoadFailed).await;
                in_flight.settle(|_| ());
                CommandOutcome::Failed(ErrorKind::LoadFailed)
            }
        };

        self.emit(event_builders::loading_changed(false)).await;
        outcome
    }

    /// 重新加载（语义同首次加载）
    pub async fn reload(&self) -> CommandOutcome {
        self.load().await
    }

    /// 更新新建输入框内容
    pub async fn set_title_input(&self, title: impl Into<String>) {
        let title = title.into();
        self.state.lock().title_input = title.clone();
        self.emit(event_builders::title_input_changed(title)).await;
    }

    /// 添加条目
    ///
    /// 标题裁剪后为空时只设置 `TitleEmpty`，不发出远程调用；
    /// 同一时刻只允许一个添加请求。
    pub async fn add(&self, title: &str) -> CommandOutcome {
        let title = title.trim();
        if title.is_empty() {
            debug!("标题为空，拒绝添加");
            self.errors.set(ErrorKind::TitleEmpty).await;
            return CommandOutcome::Failed(ErrorKind::TitleEmpty);
        }

        let (in_flight, pending) = {
            let mut state = self.state.lock();
            if state.placeholder.is_some() {
                return CommandOutcome::Rejected(RejectReason::AddInFlight);
            }
            let pending = PendingTodo {
                user_id: self.config.owner_id,
                title: title.to_string(),
            };
            state.placeholder = Some(pending.clone());
            (InFlight::placeholder(&self.state), pending)
        };

        self.errors.clear().await;
        self.emit(event_builders::placeholder_changed(Some(pending)))
            .await;
        info!("📤 添加条目: {:?}", title);

        let created = self.gateway.create(self.config.owner_id, title).await;

        let appended = match created {
            Ok(todo) => in_flight.settle(|state| {
                state.store.append(todo).map(|_| {
                    state.title_input.clear();
                    state.store.len()
                })
            }),
            Err(e) => {
                in_flight.settle(|_| ());
                Err(e)
            }
        };

        let outcome = match appended {
            Ok(count) => {
                info!("✅ 添加成功");
                self.emit(event_builders::todos_changed(count)).await;
                self.emit(event_builders::title_input_changed(String::new()))
                    .await;
                CommandOutcome::Succeeded
            }
            Err(e) => {
                warn!("❌ 添加失败: {}", e);
                self.errors.set(ErrorKind::AddFailed).await;
                CommandOutcome::Failed(ErrorKind::AddFailed)
            }
        };

        self.emit(event_builders::placeholder_changed(None)).await;
        outcome
    }

    /// 删除条目
    pub async fn delete(&self, id: u64) -> CommandOutcome {
        let in_flight = match self.begin_single(id) {
            Ok(in_flight) => in_flight,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };
        self.emit_processing().await;
        self.errors.clear().await;
        info!("🗑️ 删除条目: id={}", id);

        let outcome = match self.gateway.delete(id).await {
            Ok(()) => {
                let (count, session_closed) = in_flight.settle(|state| {
                    state.store.remove(id);
                    let closed = state.close_session_for(&[id]);
                    (state.store.len(), closed)
                });
                info!("✅ 删除成功: id={}", id);
                self.emit(event_builders::todos_changed(count)).await;
                if session_closed {
                    self.emit(event_builders::edit_session_changed(None)).await;
                }
                CommandOutcome::Succeeded
            }
            Err(e) => {
                in_flight.settle(|_| ());
                warn!("❌ 删除失败: id={}, error={}", id, e);
                self.errors.set(ErrorKind::DeleteFailed).await;
                CommandOutcome::Failed(ErrorKind::DeleteFailed)
            }
        };

        self.emit_processing().await;
        outcome
    }

    /// 切换单个条目的完成状态，成功后以服务端回显为准
    pub async fn update(&self, id: u64, completed: bool) -> CommandOutcome {
        let in_flight = match self.begin_single(id) {
            Ok(in_flight) => in_flight,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };
        self.emit_processing().await;
        self.errors.clear().await;
        info!("✏️ 更新完成状态: id={}, completed={}", id, completed);

        let patch = TodoPatch::new().with_completed(completed);
        let echoed = self
            .gateway
            .update(id, &patch)
            .await
            .and_then(|todo| Self::check_echo(id, todo));

        let applied = match echoed {
            Ok(todo) => in_flight.settle(|state| state.store.replace(id, todo)),
            Err(e) => {
                in_flight.settle(|_| ());
                Err(e)
            }
        };

        let outcome = match applied {
            Ok(()) => {
                let count = self.state.lock().store.len();
                self.emit(event_builders::todos_changed(count)).await;
                CommandOutcome::Succeeded
            }
            Err(e) => {
                warn!("❌ 更新失败: id={}, error={}", id, e);
                self.errors.set(ErrorKind::UpdateFailed).await;
                CommandOutcome::Failed(ErrorKind::UpdateFailed)
            }
        };

        self.emit_processing().await;
        outcome
    }

    /// 删除全部已完成条目
    ///
    /// 所有删除并发发出，全部结束后一次性移除成功的条目；
    /// 任一失败只报告一次 `DeleteFailed`。
    pub async fn clear_completed(&self) -> CommandOutcome {
        let (selected, in_flight) = match self.begin_batch(|todo| todo.completed) {
            Ok(Some(batch)) => batch,
            Ok(None) => return CommandOutcome::Unchanged,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };
        self.errors.clear().await;
        self.emit_processing().await;
        info!("🧹 清除已完成条目: {} 条", selected.len());

        let results = join_all(selected.iter().map(|&id| self.gateway.delete(id))).await;
        let (succeeded, failed) = Self::partition(&selected, results, "delete");

        let (count, session_closed) = in_flight.settle(|state| {
            state.store.remove_many(&succeeded);
            let closed = state.close_session_for(&succeeded);
            (state.store.len(), closed)
        });
        info!(
            "清除完成: 成功 {} 条, 失败 {} 条",
            succeeded.len(),
            failed.len()
        );

        if !succeeded.is_empty() {
            self.emit(event_builders::todos_changed(count)).await;
        }
        if session_closed {
            self.emit(event_builders::edit_session_changed(None)).await;
        }

        let outcome = if failed.is_empty() {
            CommandOutcome::Succeeded
        } else {
            self.errors.set(ErrorKind::DeleteFailed).await;
            CommandOutcome::Failed(ErrorKind::DeleteFailed)
        };

        self.emit_processing().await;
        outcome
    }

    /// 全部切换
    ///
    /// 全部已完成时目标为未完成，否则目标为已完成；只更新状态与目标不同的条目。
    pub async fn toggle_all(&self) -> CommandOutcome {
        let target = !self.state.lock().store.all_completed();
        let (selected, in_flight) = match self.begin_batch(|todo| todo.completed != target) {
            Ok(Some(batch)) => batch,
            Ok(None) => return CommandOutcome::Unchanged,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };
        self.errors.clear().await;
        self.emit_processing().await;
        info!("🔁 全部切换: target={}, {} 条", target, selected.len());

        let patch = TodoPatch::new().with_completed(target);
        let results = join_all(selected.iter().map(|&id| self.gateway.update(id, &patch))).await;
        let (succeeded, failed) = Self::partition(&selected, results, "update");

        let count = in_flight.settle(|state| {
            state
                .store
                .apply_many(&succeeded, |todo| todo.completed = target);
            state.store.len()
        });

        if !succeeded.is_empty() {
            self.emit(event_builders::todos_changed(count)).await;
        }

        let outcome = if failed.is_empty() {
            CommandOutcome::Succeeded
        } else {
            self.errors.set(ErrorKind::UpdateFailed).await;
            CommandOutcome::Failed(ErrorKind::UpdateFailed)
        };

        self.emit_processing().await;
        outcome
    }

    /// 打开编辑会话；添加进行中时静默忽略
    pub async fn start_edit(&self, id: u64, current_title: &str) -> CommandOutcome {
        let session = {
            let mut state = self.state.lock();
            if state.placeholder.is_some() {
                return CommandOutcome::Unchanged;
            }
            if !state.store.contains(id) {
                return CommandOutcome::Rejected(RejectReason::UnknownEntity(id));
            }
            let session = EditSession::new(id, current_title);
            state.edit_session = Some(session.clone());
            session
        };
        debug!("开始编辑: id={}", id);
        self.emit(event_builders::edit_session_changed(Some(session)))
            .await;
        CommandOutcome::Succeeded
    }

    /// 更新编辑草稿
    pub async fn set_edit_draft(&self, draft: impl Into<String>) -> CommandOutcome {
        let session = {
            let mut state = self.state.lock();
            match state.edit_session.as_mut() {
                Some(session) => {
                    session.draft_title = draft.into();
                    session.clone()
                }
                None => return CommandOutcome::Unchanged,
            }
        };
        self.emit(event_builders::edit_session_changed(Some(session)))
            .await;
        CommandOutcome::Succeeded
    }

    /// 放弃编辑
    pub async fn cancel_edit(&self) -> CommandOutcome {
        if self.close_edit_session().await {
            CommandOutcome::Succeeded
        } else {
            CommandOutcome::Unchanged
        }
    }

    /// 保存编辑
    ///
    /// - 标题未变：关闭会话，不发远程调用
    /// - 标题为空：等同删除，之后无论结果如何都关闭会话
    /// - 其他：重命名；失败时保留会话以便重试或放弃
    pub async fn save_edit(&self, id: u64, draft_title: &str) -> CommandOutcome {
        let title = draft_title.trim();
        if title.is_empty() {
            debug!("标题清空，转为删除: id={}", id);
            let outcome = self.delete(id).await;
            self.close_edit_session().await;
            return outcome;
        }

        let current = self.state.lock().store.get(id).map(|todo| todo.title.clone());
        let Some(current) = current else {
            return CommandOutcome::Rejected(RejectReason::UnknownEntity(id));
        };

        if title == current {
            self.close_edit_session().await;
            return CommandOutcome::Unchanged;
        }

        let in_flight = match self.begin_single(id) {
            Ok(in_flight) => in_flight,
            Err(reason) => return CommandOutcome::Rejected(reason),
        };
        self.emit_processing().await;
        self.errors.clear().await;
        info!("✏️ 重命名: id={}, title={:?}", id, title);

        let patch = TodoPatch::new().with_title(title);
        let echoed = self
            .gateway
            .update(id, &patch)
            .await
            .and_then(|todo| Self::check_echo(id, todo));

        let applied = match echoed {
            Ok(todo) => in_flight.settle(|state| {
                state.store.replace(id, todo).map(|_| {
                    let closed = state.edit_session.take().is_some();
                    (state.store.len(), closed)
                })
            }),
            Err(e) => {
                in_flight.settle(|_| ());
                Err(e)
            }
        };

        let outcome = match applied {
            Ok((count, session_closed)) => {
                self.emit(event_builders::todos_changed(count)).await;
                if session_closed {
                    self.emit(event_builders::edit_session_changed(None)).await;
                }
                CommandOutcome::Succeeded
            }
            Err(e) => {
                warn!("❌ 重命名失败: id={}, error={}", id, e);
                self.errors.set(ErrorKind::UpdateFailed).await;
                CommandOutcome::Failed(ErrorKind::UpdateFailed)
            }
        };

        self.emit_processing().await;
        outcome
    }

    /// 手动关闭错误提示
    pub async fn dismiss_error(&self) {
        self.errors.clear().await;
    }

    // ========================
    // 内部辅助
    // ========================

    /// 登记单个条目；条目不存在或已在进行中时拒绝
    fn begin_single(&self, id: u64) -> std::result::Result<InFlight<'_>, RejectReason> {
        let mut state = self.state.lock();
        if !state.store.contains(id) {
            debug!("拒绝命令: 条目 {} 不存在", id);
            return Err(RejectReason::UnknownEntity(id));
        }
        if state.processing.begin(id).is_err() {
            debug!("拒绝命令: 条目 {} 正在处理中", id);
            return Err(RejectReason::AlreadyProcessing(id));
        }
        Ok(InFlight::ids(&self.state, vec![id]))
    }

    /// 选出满足条件的条目并整体登记；没有目标时返回 `None`
    #[allow(clippy::type_complexity)]
    fn begin_batch<P>(
        &self,
        predicate: P,
    ) -> std::result::Result<Option<(Vec<u64>, InFlight<'_>)>, RejectReason>
    where
        P: FnMut(&Todo) -> bool,
    {
        let mut state = self.state.lock();
        let selected = state.store.select_ids(predicate);
        if selected.is_empty() {
            return Ok(None);
        }
        match state.processing.begin_many(&selected) {
            Ok(()) => Ok(Some((selected.clone(), InFlight::ids(&self.state, selected)))),
            Err(TodoSyncError::AlreadyProcessing(busy)) => {
                debug!("拒绝批量命令: 条目 {} 正在处理中", busy);
                Err(RejectReason::AlreadyProcessing(busy))
            }
            Err(e) => {
                error!("批量登记失败: {}", e);
                Err(RejectReason::Busy)
            }
        }
    }

    /// 按调用顺序把结果划分为成功 id 与失败 id
    fn partition<T>(
        selected: &[u64],
        results: Vec<Result<T>>,
        action: &str,
    ) -> (Vec<u64>, Vec<u64>) {
        let mut succeeded = Vec::with_capacity(selected.len());
        let mut failed = Vec::new();
        for (&id, result) in selected.iter().zip(results) {
            match result {
                Ok(_) => succeeded.push(id),
                Err(e) => {
                    warn!("批量 {} 失败: id={}, error={}", action, id, e);
                    failed.push(id);
                }
            }
        }
        (succeeded, failed)
    }

    /// 服务端回显必须是同一个条目
    fn check_echo(id: u64, todo: Todo) -> Result<Todo> {
        if todo.id != id {
            return Err(TodoSyncError::InvalidData(format!(
                "server echoed todo {} for todo {}",
                todo.id, id
            )));
        }
        Ok(todo)
    }

    async fn close_edit_session(&self) -> bool {
        let closed = self.state.lock().edit_session.take().is_some();
        if closed {
            self.emit(event_builders::edit_session_changed(None)).await;
        }
        closed
    }

    async fn emit_processing(&self) {
        let ids = self.state.lock().processing.ids();
        self.emit(event_builders::processing_changed(ids)).await;
    }

    async fn emit(&self, event: SyncEvent) {
        self.event_manager.emit(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;

    fn controller(todos: Vec<Todo>) -> SyncController {
        let config = TodoSyncConfig::builder().owner_id(1).build();
        SyncController::new(config, Arc::new(InMemoryGateway::with_todos(todos))).unwrap()
    }

    #[tokio::test]
    async fn test_in_flight_drop_releases_registration() {
        let controller = controller(vec![Todo::new(1, 1, "a", false)]);
        controller.load().await;

        {
            let in_flight = controller.begin_single(1).unwrap();
            assert!(controller.is_processing(1));
            assert_eq!(
                controller.begin_single(1).err(),
                Some(RejectReason::AlreadyProcessing(1))
            );
            drop(in_flight);
        }
        assert!(!controller.any_processing());
    }

    #[tokio::test]
    async fn test_begin_batch_is_all_or_nothing() {
        let controller = controller(vec![
            Todo::new(1, 1, "a", true),
            Todo::new(2, 1, "b", true),
        ]);
        controller.load().await;

        let single = controller.begin_single(2).unwrap();
        assert_eq!(
            controller.begin_batch(|todo| todo.completed).err(),
            Some(RejectReason::AlreadyProcessing(2))
        );
        assert_eq!(controller.processing_ids(), vec![2]);
        drop(single);

        assert!(controller.begin_batch(|todo| !todo.completed).unwrap().is_none());
    }

    #[test]
    fn test_partition_keeps_call_order() {
        let results: Vec<Result<()>> = vec![
            Ok(()),
            Err(TodoSyncError::Transport("x".to_string())),
            Ok(()),
        ];
        let (ok, failed) = SyncController::partition(&[5, 6, 7], results, "delete");
        assert_eq!(ok, vec![5, 7]);
        assert_eq!(failed, vec![6]);
    }

    #[test]
    fn test_check_echo_rejects_mismatched_id() {
        assert!(SyncController::check_echo(1, Todo::new(1, 1, "a", false)).is_ok());
        assert!(SyncController::check_echo(1, Todo::new(2, 1, "a", false)).is_err());
    }

    #[test]
    fn test_outcome_acceptance() {
        assert!(CommandOutcome::Succeeded.is_accepted());
        assert!(CommandOutcome::Failed(ErrorKind::AddFailed).is_accepted());
        assert!(!CommandOutcome::Rejected(RejectReason::AddInFlight).is_accepted());
        assert!(!CommandOutcome::Unchanged.is_success());
    }
}
