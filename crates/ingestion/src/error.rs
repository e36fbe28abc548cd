//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 事件源已有活动订阅
    #[error("source {source_id} is already listening")]
    AlreadyListening {
        /// 事件源 ID
        source_id: String,
    },

    /// 订阅不属于该适配器或已失效
    #[error("source {source_id} is not listening for subscription {subscription_id}")]
    NotListening {
        /// 事件源 ID
        source_id: String,
        /// 订阅 ID
        subscription_id: u64,
    },

    /// Mock 源频率非法（必须为有限正数）
    #[error("source {source_id} has invalid frequency {frequency_hz} Hz")]
    InvalidFrequency {
        /// 事件源 ID
        source_id: String,
        /// 配置的频率
        frequency_hz: f64,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
