//! Order Server - 订单生命周期引擎
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 校验、计价、分类、状态机、双后端存储、定时任务
//! - **实时广播** (`fanout`): 厨房队列、看板、通知推送
//! - **HTTP API** (`api`): REST 接口与 SSE 事件流
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单生命周期
//! ├── fanout/        # 订单事件分发与消费端视图
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod core;
pub mod fanout;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerError, ServerState};
pub use orders::{OrderError, OrderService};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 设置运行环境：加载 .env、读取配置、创建工作目录、初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        Some(&log_dir.to_string_lossy()),
    )?;
    Ok(config)
}

/// 一次性回填：重新分类 `[from, to)` 内创建的订单
pub async fn run_backfill(config: &Config, from: i64, to: i64) -> core::Result<orders::BackfillReport> {
    let state = ServerState::initialize(config)?;
    if !state.service.store().durable_reachable().await {
        return Err(ServerError::Internal(anyhow::anyhow!(
            "durable store unavailable at {}",
            config.database_path().display()
        )));
    }
    let job = orders::BackfillJob::new(state.service.clone(), config.backfill_settings());
    let report = job.run(from, to).await?;
    state.shutdown.cancel();
    Ok(report)
}
