//! 포트폴리오 리밸런싱 감시를 위한 도메인 모델.

mod rebalancing;
mod source;

pub use rebalancing::*;
pub use source::*;
