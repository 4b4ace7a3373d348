//! Xueqiu 포트폴리오(큐브) 리밸런싱 감시기.
//!
//! 이 crate는 다음을 제공합니다:
//! - Xueqiu HTTP 클라이언트 (`RebalancingSource` 구현)
//! - 처리 완료 이벤트 저장소 (JSON 파일)
//! - 리밸런싱 감지 및 DingTalk 알림 (Poller)
//! - 거래 시간 게이트가 적용된 주기 실행 스케줄러

pub mod error;
pub mod modules;
pub mod source;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, WatcherError};
pub use modules::{
    build_poller, PollOutcome, PollerSettings, ProcessedEventStore, RebalancingPoller,
    RebalancingReport, Scheduler,
};
pub use source::XueqiuClient;
pub use stats::CycleStats;
