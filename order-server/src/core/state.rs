use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::core::{BackgroundTasks, Config, Result, TaskKind};
use crate::fanout::{FanoutSink, LogNotifier, RealtimeFanout, SubscriptionFilter, run_sink};
use crate::orders::scheduler::TaskScheduler;
use crate::orders::{
    FallbackStore, OfflineBackend, OrderBackend, OrderClassifier, OrderService, OrderStore,
    RedbBackend, ServiceConfig, TimerCoordinator,
};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | service | OrderService | 订单生命周期服务 |
/// | fanout | RealtimeFanout | 实时事件广播 |
/// | shutdown | CancellationToken | 全局关闭信号 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订单服务
    pub service: OrderService,
    /// 实时广播 (与 service 共享同一通道)
    pub fanout: RealtimeFanout,
    /// 全局关闭信号 (调度器、后台任务、SSE 共享)
    pub shutdown: CancellationToken,
    started_at: Instant,
}

impl ServerState {
    /// 用指定的持久化后端组装状态
    pub fn with_backend(config: &Config, durable: Arc<dyn OrderBackend>) -> Self {
        let shutdown = CancellationToken::new();
        let fanout = RealtimeFanout::new(config.fanout_capacity);
        let store = OrderStore::new(durable, Arc::new(FallbackStore::new()));
        let service = OrderService::new(
            store,
            fanout.clone(),
            OrderClassifier::new(config.classifier_config()),
            TaskScheduler::new(shutdown.clone()),
            Arc::new(TimerCoordinator::new()),
            ServiceConfig {
                fee_policy: config.fee_policy(),
                auto_confirm_delay: config.auto_confirm_delay(),
            },
        );

        Self {
            config: config.clone(),
            service,
            fanout,
            shutdown,
            started_at: Instant::now(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 数据库 (work_dir/orders.redb)，打开失败时进入 fallback 模式
    /// 3. 订单服务
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db_path = config.database_path();
        let durable: Arc<dyn OrderBackend> = match RedbBackend::open(&db_path) {
            Ok(backend) => {
                tracing::info!(path = %db_path.display(), "Durable store opened");
                Arc::new(backend)
            }
            Err(e) => {
                tracing::error!(
                    path = %db_path.display(),
                    error = %e,
                    "Failed to open durable store, running on fallback store only"
                );
                Arc::new(OfflineBackend::new(e.to_string()))
            }
        };

        Ok(Self::with_backend(config, durable))
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 通知推送 (LogNotifier)
    /// - 超时巡检 (overdue sweep)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::with_shutdown(self.shutdown.clone());

        let sink: Arc<dyn FanoutSink> = Arc::new(LogNotifier);
        let subscription = self.fanout.subscribe(SubscriptionFilter::all());
        tasks.spawn(
            "notification_sink",
            TaskKind::Listener,
            run_sink(sink, subscription, self.shutdown.clone()),
        );

        let service = self.service.clone();
        tasks.spawn_periodic("overdue_sweep", self.config.overdue_sweep_interval(), move || {
            let service = service.clone();
            async move {
                service.sweep_overdue();
            }
        });

        tasks.log_summary();
        tasks
    }

    /// 运行时间 (秒)
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
