//! # Cube Notification
//!
//! 리밸런싱 알림 전송 서비스.
//!
//! 지원 채널:
//! - DingTalk (custom robot webhook, 선택적 서명)

pub mod dingtalk;
pub mod types;

pub use dingtalk::*;
pub use types::*;
