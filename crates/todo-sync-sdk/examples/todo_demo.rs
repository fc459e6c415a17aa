//! 同步控制器演示
//!
//! 使用进程内网关演示加载、添加、批量操作、失败注入与错误过期。
//! 传入 `--http` 时改为连接默认服务端。

use std::sync::Arc;
use std::time::Duration;

use todo_sync_sdk::{
    GatewayOp, InMemoryGateway, ListItem, SyncController, SyncEvent, Todo, TodoSyncConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("\n==============================================");
    println!("📝 Todo 同步演示");
    println!("==============================================\n");

    if std::env::args().any(|arg| arg == "--http") {
        let controller = SyncController::initialize(TodoSyncConfig::default()).await?;
        print_items(&controller);
        return Ok(());
    }

    let config = TodoSyncConfig::builder().owner_id(3093).build();
    let gateway = Arc::new(InMemoryGateway::with_todos(vec![
        Todo::new(1, 3093, "Learn Rust", true),
        Todo::new(2, 3093, "Write the sync engine", false),
    ]));
    let controller = Arc::new(SyncController::new(config, gateway.clone())?);

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SyncEvent::ErrorChanged { kind, .. } = event {
                println!("  🔔 错误提示: {:?}", kind);
            }
        }
    });

    println!("📥 加载: {:?}", controller.load().await);
    print_items(&controller);

    println!("\n➕ 添加: {:?}", controller.add("  Review the PR  ").await);
    println!("🔁 全部切换: {:?}", controller.toggle_all().await);
    print_items(&controller);

    println!("\n💥 注入删除失败（条目 2）");
    gateway.fail_id(2);
    println!("🧹 清除已完成: {:?}", controller.clear_completed().await);
    print_items(&controller);

    tokio::time::sleep(Duration::from_millis(3100)).await;
    println!("\n⏱️ 3 秒后错误: {:?}", controller.current_error());

    gateway.recover();
    gateway.fail_op(GatewayOp::Update);
    controller.start_edit(2, "Write the sync engine").await;
    println!("✏️ 重命名: {:?}", controller.save_edit(2, "Ship the sync engine").await);
    println!("   编辑会话仍打开: {:?}", controller.edit_session());
    controller.cancel_edit().await;

    let snapshot = controller.snapshot();
    println!(
        "\n📊 {} 条未完成, {} 条已完成",
        snapshot.active_count, snapshot.completed_count
    );

    println!("\n==============================================");
    println!("✅ 演示完成");
    println!("==============================================\n");
    Ok(())
}

fn print_items(controller: &SyncController) {
    for item in controller.list_items() {
        match item {
            ListItem::Confirmed(todo) => {
                let mark = if todo.completed { "x" } else { " " };
                println!("  [{}] #{} {}", mark, todo.id, todo.title);
            }
            ListItem::Pending(pending) => println!("  [ ] ... {}", pending.title),
        }
    }
}
