use std::path::PathBuf;
use std::time::Duration;

use crate::orders::backfill::BackfillSettings;
use crate::orders::classifier::ClassifierConfig;
use crate::orders::fee::FeePolicy;

/// 服务器配置 - 订单引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false (生产环境为 true) | JSON 日志 |
/// | FREE_DELIVERY_THRESHOLD | 50.00 | 免配送费门槛 |
/// | DELIVERY_FEE | 4.99 | 配送费 |
/// | TAX_RATE | 0.08 | 税率 |
/// | AUTO_CONFIRM_DELAY_SECS | 10 | 自动确认延迟(秒) |
/// | TEST_ITEM_IDS | test-item | 测试商品 ID，逗号分隔 |
/// | TEST_AMOUNT_THRESHOLD | 0.05 | 测试金额阈值 (负数关闭) |
/// | DEFAULT_CURRENCY | usd | 默认币种 |
/// | FANOUT_CAPACITY | 1024 | 广播缓冲区大小 |
/// | OVERDUE_SWEEP_SECS | 60 | 超时巡检周期(秒) |
/// | BACKFILL_ALLOW_WRITES | false | 回填写入开关 |
/// | BACKFILL_ALLOW_PRODUCTION | false | 允许在生产环境回填 |
/// | BACKFILL_BATCH_SIZE | 50 | 回填批大小 |
/// | BACKFILL_PAUSE_MS | 500 | 批间暂停(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/orders HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志级别
    pub log_level: String,
    /// 是否输出 JSON 日志
    pub log_json: bool,

    // === 金额 ===
    pub free_delivery_threshold: f64,
    pub delivery_fee: f64,
    pub tax_rate: f64,

    // === 订单流程 ===
    /// 自动确认延迟 (秒)
    pub auto_confirm_delay_secs: u64,
    /// 测试商品 ID
    pub test_item_ids: Vec<String>,
    /// 测试金额阈值
    pub test_amount_threshold: f64,
    /// 默认币种
    pub default_currency: String,

    // === 实时推送 ===
    pub fanout_capacity: usize,
    pub overdue_sweep_secs: u64,

    // === 回填 ===
    pub backfill_allow_writes: bool,
    pub backfill_allow_production: bool,
    pub backfill_batch_size: usize,
    pub backfill_pause_ms: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_parse("LOG_JSON", is_production),
            environment,

            free_delivery_threshold: env_parse("FREE_DELIVERY_THRESHOLD", 50.0),
            delivery_fee: env_parse("DELIVERY_FEE", 4.99),
            tax_rate: env_parse("TAX_RATE", 0.08),

            auto_confirm_delay_secs: env_parse("AUTO_CONFIRM_DELAY_SECS", 10),
            test_item_ids: std::env::var("TEST_ITEM_IDS")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| vec!["test-item".to_string()]),
            test_amount_threshold: env_parse("TEST_AMOUNT_THRESHOLD", 0.05),
            default_currency: std::env::var("DEFAULT_CURRENCY")
                .map(|c| c.trim().to_lowercase())
                .unwrap_or_else(|_| "usd".into()),

            fanout_capacity: env_parse("FANOUT_CAPACITY", 1024),
            overdue_sweep_secs: env_parse("OVERDUE_SWEEP_SECS", 60),

            backfill_allow_writes: env_parse("BACKFILL_ALLOW_WRITES", false),
            backfill_allow_production: env_parse("BACKFILL_ALLOW_PRODUCTION", false),
            backfill_batch_size: env_parse("BACKFILL_BATCH_SIZE", 50),
            backfill_pause_ms: env_parse("BACKFILL_PAUSE_MS", 500),
        }
    }

    /// 使用自定义工作目录和端口覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn auto_confirm_delay(&self) -> Duration {
        Duration::from_secs(self.auto_confirm_delay_secs)
    }

    pub fn overdue_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.overdue_sweep_secs.max(1))
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy::new(self.free_delivery_threshold, self.delivery_fee, self.tax_rate)
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            test_item_ids: self.test_item_ids.clone(),
            amount_threshold: self.test_amount_threshold,
            default_currency: self.default_currency.clone(),
        }
    }

    pub fn backfill_settings(&self) -> BackfillSettings {
        BackfillSettings {
            allow_writes: self.backfill_allow_writes,
            allow_production: self.backfill_allow_production,
            is_production: self.is_production(),
            batch_size: self.backfill_batch_size.max(1),
            pause: Duration::from_millis(self.backfill_pause_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" test-item, qa-burger ,,"),
            vec!["test-item".to_string(), "qa-burger".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides("/tmp/orders", 8080);
        assert_eq!(config.work_dir, "/tmp/orders");
        assert_eq!(config.http_port, 8080);
        assert!(config.database_path().ends_with("orders.redb"));
    }
}
