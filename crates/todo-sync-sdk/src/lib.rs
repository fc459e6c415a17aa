//! Todo Sync SDK - 乐观更新的待办同步引擎
//!
//! 本 SDK 维护远端待办列表的本地镜像，并负责：
//! - 📥 加载：按所有者拉取全部条目
//! - ✏️ 变更：添加、删除、切换完成状态、重命名，以及批量清除/全部切换
//! - ⏳ 进行中跟踪：同一条目同一时刻只允许一个远程变更
//! - ⚠️ 错误通道：单一错误提示，3 秒后自动清除
//! - ⚙️ 事件系统：状态变化通过广播推送给展示层
//!
//! 本地状态只在远端确认后才修改；展示层通过进行中集合和占位条目显示等待状态。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use todo_sync_sdk::{SyncController, TodoSyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TodoSyncConfig::builder()
//!         .base_url("https://mate.academy/students-api")
//!         .owner_id(3093)
//!         .build();
//!
//!     // 初始化并完成首次加载
//!     let controller = SyncController::initialize(config).await?;
//!
//!     controller.add("Buy milk").await;
//!     controller.toggle_all().await;
//!     controller.clear_completed().await;
//!
//!     let snapshot = controller.snapshot();
//!     println!("{} items left", snapshot.active_count);
//!     Ok(())
//! }
//! ```

// 导出核心模块
pub mod config;
pub mod controller;
pub mod edit_session;
pub mod error;
pub mod error_channel;
pub mod events;
pub mod gateway;
pub mod storage;
pub mod version;

// 重新导出核心类型，方便使用
pub use config::{HttpClientConfig, TodoSyncConfig, TodoSyncConfigBuilder};
pub use controller::{CommandOutcome, RejectReason, SyncController, SyncSnapshot};
pub use edit_session::EditSession;
pub use error::{Result, TodoSyncError};
pub use error_channel::{ErrorChannel, ErrorKind};
pub use events::{EventFilter, EventManager, FilteredEventReceiver, SyncEvent};
pub use gateway::{GatewayCall, GatewayOp, HttpGateway, InMemoryGateway, RemoteGateway};
pub use storage::{ListItem, PendingTodo, ProcessingSet, Todo, TodoPatch, TodoStore};
