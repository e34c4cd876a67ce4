use thiserror::Error;

use crate::orders::OrderError;

/// 进程级错误 (启动、监听、回填)
///
/// HTTP 处理器使用 [`shared::AppError`]，这里只覆盖进程边界。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("订单错误: {0}")]
    Order(#[from] OrderError),

    #[error("参数错误: {0}")]
    Usage(String),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 服务器 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
