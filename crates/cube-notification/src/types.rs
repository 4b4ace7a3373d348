//! 알림 trait 및 에러 정의.

use async_trait::async_trait;

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// 알림 전송기 trait.
///
/// 전송 실패는 `Err`로만 보고하며 재시도하지 않습니다.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 텍스트 알림을 전송합니다.
    async fn send_text(&self, content: &str) -> NotificationResult<()>;

    /// 전송기가 활성화되어 있는지 확인합니다.
    fn is_enabled(&self) -> bool;

    /// 전송기 이름을 반환합니다.
    fn name(&self) -> &str;
}
