//! 에러 타입 정의.

use cube_core::{CoreError, SourceError};
use cube_notification::NotificationError;
use thiserror::Error;

/// 감시기 에러 타입
#[derive(Debug, Error)]
pub enum WatcherError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 에러 (Xueqiu)
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    /// 알림 채널 에러
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// 저장소 파일 I/O 에러
    #[error("Store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    /// 저장소 직렬화 에러
    #[error("Store serialization error: {0}")]
    StoreFormat(#[from] serde_json::Error),
}

impl From<CoreError> for WatcherError {
    fn from(err: CoreError) -> Self {
        Self::Config(err.to_string())
    }
}

impl WatcherError {
    /// 다음 틱에서 저절로 회복될 수 있는 에러인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        match self {
            WatcherError::Source(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, WatcherError>;
