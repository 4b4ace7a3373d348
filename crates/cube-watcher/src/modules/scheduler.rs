//! 거래 시간 게이트가 적용된 주기 실행 스케줄러.
//!
//! 시작 직후 게이트와 무관하게 한 번 평가(warm-up)한 뒤, 고정 주기마다
//! 현재 시각이 거래 시간 안일 때만 Poller 사이클을 실행합니다.
//! 사이클은 스케줄러 태스크 안에서 순차 실행되므로 겹치지 않으며,
//! 사이클이 주기보다 오래 걸리면 밀린 틱은 건너뜁니다.

use std::time::Duration;

use cube_core::{now_display, IntervalSpec, TradingWindow};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::modules::RebalancingPoller;
use crate::CycleStats;

/// 주기 실행 스케줄러.
pub struct Scheduler {
    poller: RebalancingPoller,
    window: TradingWindow,
    interval: IntervalSpec,
}

impl Scheduler {
    pub fn new(poller: RebalancingPoller, window: TradingWindow, interval: IntervalSpec) -> Self {
        Self {
            poller,
            window,
            interval,
        }
    }

    pub fn poller(&self) -> &RebalancingPoller {
        &self.poller
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// 한 번 평가합니다. 게이트가 닫혀 있고 `bypass_gate`가 아니면 `None`.
    pub async fn evaluate(&mut self, bypass_gate: bool) -> Option<CycleStats> {
        let open = self.window.is_open_now();
        info!(
            now = %now_display(),
            trading_hours = open,
            next_in = %self.interval,
            "감시 평가"
        );

        if !open && !bypass_gate {
            debug!("거래 시간 외, 이번 틱 건너뜀");
            return None;
        }

        Some(self.poller.run_cycle().await)
    }

    /// 취소될 때까지 실행합니다. 진행 중인 사이클은 끝까지 실행한 뒤 종료합니다.
    pub async fn run(mut self, shutdown: CancellationToken) -> RebalancingPoller {
        let period = self.period();
        info!(
            interval = %self.interval,
            portfolios = self.poller.portfolios().len(),
            "스케줄러 시작"
        );

        // warm-up
        self.evaluate(true).await;

        let now = Instant::now();
        let mut ticker = interval_at(now.checked_add(period).unwrap_or(now), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("종료 신호 수신, 스케줄러 정지");
                    break;
                }
                _ = ticker.tick() => {
                    self.evaluate(false).await;
                }
            }
        }

        self.poller
    }
}
