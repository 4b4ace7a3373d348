//! 폴링 사이클 통계.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::modules::PollOutcome;
use crate::Result;

/// 한 번의 폴링 사이클 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleStats {
    /// 조회한 포트폴리오 수
    pub total: usize,
    /// 새로 감지된 리밸런싱 수
    pub new_events: usize,
    /// 알림 전송 성공
    pub delivered: usize,
    /// 알림 전송 실패 (이벤트는 처리 완료로 기록됨)
    pub delivery_failed: usize,
    /// 새 이벤트 없음
    pub unchanged: usize,
    /// 조회/처리 에러
    pub errors: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CycleStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 포트폴리오 하나의 결과를 반영합니다.
    pub fn record(&mut self, result: &Result<PollOutcome>) {
        self.total += 1;
        match result {
            Ok(PollOutcome::NoNewEvent) => self.unchanged += 1,
            Ok(PollOutcome::Notified { delivered, .. }) => {
                self.new_events += 1;
                if *delivered {
                    self.delivered += 1;
                } else {
                    self.delivery_failed += 1;
                }
            }
            Err(_) => self.errors += 1,
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            new_events = self.new_events,
            delivered = self.delivered,
            delivery_failed = self.delivery_failed,
            unchanged = self.unchanged,
            errors = self.errors,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "폴링 사이클 완료"
        );
    }
}
