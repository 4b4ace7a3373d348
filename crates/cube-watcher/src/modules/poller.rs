//! 리밸런싱 감지 모듈.
//!
//! 포트폴리오마다 순차적으로:
//! 1. 시세 메타데이터 조회 (표시 이름)
//! 2. 최신 리밸런싱 요약 조회
//! 3. 저장소에 이미 있는 ID면 건너뜀
//! 4. 새 이벤트면 이력 페이지 조회 → ID 저장 → 알림 전송
//!
//! 한 포트폴리오의 실패는 같은 사이클의 다른 포트폴리오에 영향을 주지 않습니다.
//!
//! # 알림 실패 처리
//!
//! 이벤트 ID는 알림 전송 **전에** 저장됩니다. 웹훅이 실패해도 다시 보내지
//! 않으므로 장애 중의 알림은 유실될 수 있지만 중복 알림 폭주는 생기지 않습니다.

use std::sync::Arc;
use std::time::Instant;

use cube_core::{AppConfig, EventId, PortfolioId, RebalancingEvent, RebalancingSource};
use cube_notification::{DingTalkConfig, DingTalkSender, NotificationSender};
use tracing::{debug, error, info, warn, Instrument};

use crate::modules::{ProcessedEventStore, RebalancingReport};
use crate::source::XueqiuClient;
use crate::{CycleStats, Result};

/// 포트폴리오 하나의 폴링 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// 새 이벤트 없음 (리밸런싱 기록 없음 포함)
    NoNewEvent,
    /// 새 이벤트 감지 및 처리 완료 기록
    Notified {
        event_id: EventId,
        /// 웹훅 전송 성공 여부
        delivered: bool,
    },
}

/// Poller 동작 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// 이력 조회 페이지 크기
    pub history_page_size: u32,
    /// 이력 조회 페이지 번호
    pub history_page: u32,
    /// 생성 시각 표시 보정 (시간)
    pub timestamp_offset_hours: i64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            history_page_size: 5,
            history_page: 1,
            timestamp_offset_hours: 0,
        }
    }
}

/// 리밸런싱 Poller.
///
/// 처리 완료 저장소의 유일한 작성자입니다.
pub struct RebalancingPoller {
    source: Arc<dyn RebalancingSource>,
    notifier: Arc<dyn NotificationSender>,
    store: ProcessedEventStore,
    portfolios: Vec<PortfolioId>,
    settings: PollerSettings,
}

impl RebalancingPoller {
    pub fn new(
        source: Arc<dyn RebalancingSource>,
        notifier: Arc<dyn NotificationSender>,
        store: ProcessedEventStore,
        portfolios: Vec<PortfolioId>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            portfolios,
            settings,
        }
    }

    pub fn store(&self) -> &ProcessedEventStore {
        &self.store
    }

    pub fn portfolios(&self) -> &[PortfolioId] {
        &self.portfolios
    }

    /// 설정된 모든 포트폴리오를 한 번 순회합니다.
    pub async fn run_cycle(&mut self) -> CycleStats {
        let started = Instant::now();
        let mut stats = CycleStats::new();
        let portfolios = self.portfolios.clone();

        for id in &portfolios {
            let span = tracing::info_span!("poll", cube_id = %id);
            let result = self.poll_portfolio(id).instrument(span).await;

            match &result {
                Err(e) if e.is_transient() => warn!(
                    cube_id = %id,
                    source = self.source.source_name(),
                    error = %e,
                    "일시적 조회 실패, 다음 틱에 재시도"
                ),
                Err(e) => error!(
                    cube_id = %id,
                    source = self.source.source_name(),
                    error = %e,
                    "포트폴리오 감시 중 오류"
                ),
                Ok(_) => {}
            }
            stats.record(&result);
        }

        stats.elapsed = started.elapsed();
        stats.log_summary();
        stats
    }

    /// 포트폴리오 하나를 조회하고 새 리밸런싱이면 알림을 보냅니다.
    pub async fn poll_portfolio(&mut self, id: &PortfolioId) -> Result<PollOutcome> {
        let quote = self.source.fetch_current_quote(id).await?;

        let Some(summary) = self.source.fetch_latest_rebalancing(id).await? else {
            debug!("리밸런싱 기록 없음");
            return Ok(PollOutcome::NoNewEvent);
        };

        if self.store.contains(&summary.id) {
            debug!(event_id = %summary.id, "이미 처리된 리밸런싱");
            return Ok(PollOutcome::NoNewEvent);
        }

        info!(event_id = %summary.id, status = %summary.status, "새 리밸런싱 감지");

        // 이력 조회가 실패하면 저장하지 않고 다음 틱에 다시 시도
        let history = self
            .source
            .fetch_rebalancing_history(
                id,
                self.settings.history_page_size,
                self.settings.history_page,
            )
            .await?;

        let event = RebalancingEvent::from_summary(id.clone(), summary, &history);
        if event.trade_lines.is_empty() {
            debug!(event_id = %event.id, "이력 페이지에 종목 변경 내역 없음");
        }

        if let Err(e) = self.store.commit(event.id.clone()) {
            warn!(
                event_id = %event.id,
                error = %e,
                "처리 완료 ID 저장 실패 (재시작 시 중복 알림 가능)"
            );
        }

        let content = RebalancingReport::new(
            quote.display_name(),
            &event,
            self.settings.timestamp_offset_hours,
        )
        .render();
        info!("\n{}", content);

        let delivered = match self.notifier.send_text(&content).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    event_id = %event.id,
                    channel = self.notifier.name(),
                    error = %e,
                    "알림 전송 실패"
                );
                false
            }
        };

        Ok(PollOutcome::Notified {
            event_id: event.id,
            delivered,
        })
    }
}

/// 설정으로부터 Xueqiu 소스, DingTalk 전송기, 저장소를 묶은 Poller를 만듭니다.
pub fn build_poller(config: &AppConfig) -> Result<RebalancingPoller> {
    let source = XueqiuClient::new(&config.source)?;
    let notifier = DingTalkSender::new(DingTalkConfig::from(&config.dingtalk))?;
    let store = ProcessedEventStore::load(&config.watch.store_path);

    info!(
        source = source.source_name(),
        portfolios = config.watch.cube_ids.len(),
        processed = store.len(),
        store = %store.path().display(),
        "Poller 준비 완료"
    );

    Ok(RebalancingPoller::new(
        Arc::new(source),
        Arc::new(notifier),
        store,
        config.watch.cube_ids.clone(),
        PollerSettings {
            history_page_size: config.watch.history_page_size,
            history_page: config.watch.history_page,
            timestamp_offset_hours: config.watch.timestamp_offset_hours,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{acme_line, FakeSource, RecordingNotifier};

    const T: i64 = 1_700_000_000_000;

    fn poller(
        dir: &tempfile::TempDir,
        source: Arc<FakeSource>,
        notifier: Arc<RecordingNotifier>,
        portfolios: &[&str],
    ) -> RebalancingPoller {
        RebalancingPoller::new(
            source,
            notifier,
            ProcessedEventStore::load(dir.path().join("processed_ids.json")),
            portfolios.iter().map(|p| PortfolioId::new(*p)).collect(),
            PollerSettings::default(),
        )
    }

    fn scenario_source() -> Arc<FakeSource> {
        let source = FakeSource::new();
        source.set_latest("ZH123", "E1", "success", T);
        source.set_history("ZH123", "E1", vec![acme_line()]);
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_new_event_is_notified_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut poller = poller(&dir, scenario_source(), notifier.clone(), &["ZH123"]);

        let stats = poller.run_cycle().await;

        assert_eq!(stats.new_events, 1);
        assert_eq!(stats.delivered, 1);
        assert!(poller.store().contains(&EventId::from("E1")));

        let sent = notifier.messages();
        assert_eq!(sent.len(), 1);
        let content = &sent[0];
        for expected in [
            "ZH123",
            "E1",
            "success",
            "2023.11.15 06:13:20",
            "Acme (ACM)",
            "12.5",
            "10% -> 15%",
        ] {
            assert!(content.contains(expected), "missing {:?} in {}", expected, content);
        }

        // 디스크에도 반영
        let reloaded = ProcessedEventStore::load(dir.path().join("processed_ids.json"));
        assert!(reloaded.contains(&EventId::from("E1")));
    }

    #[tokio::test]
    async fn test_already_processed_event_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let source = scenario_source();
        let mut poller = poller(&dir, source.clone(), notifier.clone(), &["ZH123"]);

        poller.run_cycle().await;
        let stats = poller.run_cycle().await;

        assert_eq!(stats.unchanged, 1);
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(poller.store().len(), 1);
        // 두 번째 사이클에서는 이력을 조회하지 않음
        assert_eq!(source.history_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_still_marks_processed() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::failing());
        let mut poller = poller(&dir, scenario_source(), notifier.clone(), &["ZH123"]);

        let outcome = poller.poll_portfolio(&"ZH123".into()).await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Notified {
                event_id: EventId::from("E1"),
                delivered: false
            }
        );
        assert!(poller.store().contains(&EventId::from("E1")));

        // 다음 사이클에 재전송하지 않음
        poller.run_cycle().await;
        assert_eq!(notifier.attempts(), 1);
    }

    #[tokio::test]
    async fn test_store_write_failure_still_notifies_once() {
        let dir = tempfile::tempdir().unwrap();
        // 디렉터리 경로에는 저장 파일을 쓸 수 없음
        let store_path = dir.path().join("occupied");
        std::fs::create_dir_all(store_path.join("child")).unwrap();

        let notifier = Arc::new(RecordingNotifier::new());
        let mut poller = RebalancingPoller::new(
            scenario_source(),
            notifier.clone(),
            ProcessedEventStore::load(&store_path),
            vec![PortfolioId::new("ZH123")],
            PollerSettings::default(),
        );

        let outcome = poller.poll_portfolio(&"ZH123".into()).await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Notified {
                event_id: EventId::from("E1"),
                delivered: true
            }
        );
        assert!(poller.store().contains(&EventId::from("E1")));

        // 메모리에는 남아 있으므로 같은 프로세스에서는 다시 보내지 않음
        poller.run_cycle().await;
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_no_rebalancing_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let source = Arc::new(FakeSource::new());
        let mut poller = poller(&dir, source, notifier.clone(), &["ZH999"]);

        let outcome = poller.poll_portfolio(&"ZH999".into()).await.unwrap();
        assert_eq!(outcome, PollOutcome::NoNewEvent);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_event_missing_from_history_page_has_no_trade_lines() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let source = FakeSource::new();
        source.set_latest("ZH123", "E9", "success", T);
        source.set_history("ZH123", "E1", vec![acme_line()]);
        let mut poller = poller(&dir, Arc::new(source), notifier.clone(), &["ZH123"]);

        poller.run_cycle().await;

        let sent = notifier.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("E9"));
        assert!(!sent[0].contains("Acme"));
    }

    #[tokio::test]
    async fn test_failing_portfolio_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let source = FakeSource::new();
        source.fail_quote("ZH000");
        source.set_latest("ZH123", "E1", "success", T);
        let mut poller = poller(&dir, Arc::new(source), notifier.clone(), &["ZH000", "ZH123"]);

        let stats = poller.run_cycle().await;

        assert_eq!(stats.total, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.new_events, 1);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_history_failure_leaves_event_unprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let source = FakeSource::new();
        source.set_latest("ZH123", "E1", "success", T);
        source.fail_history("ZH123");
        let mut poller = poller(&dir, Arc::new(source), notifier.clone(), &["ZH123"]);

        let result = poller.poll_portfolio(&"ZH123".into()).await;

        assert!(result.is_err());
        assert!(!poller.store().contains(&EventId::from("E1")));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_name_placeholder_in_report() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let source = scenario_source();
        source.clear_name("ZH123");
        let mut poller = poller(&dir, source, notifier.clone(), &["ZH123"]);

        poller.run_cycle().await;
        assert!(notifier.messages()[0].contains(cube_core::UNKNOWN_PORTFOLIO_NAME));
    }

    #[tokio::test]
    async fn test_duplicate_portfolio_entries_notify_once() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let mut poller = poller(&dir, scenario_source(), notifier.clone(), &["ZH123", "ZH123"]);

        let stats = poller.run_cycle().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(notifier.messages().len(), 1);
    }
}
