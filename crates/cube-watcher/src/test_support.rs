//! 단위 테스트용 가짜 소스와 알림 채널.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cube_core::{
    EventId, PortfolioId, PortfolioQuote, RebalancingHistoryEntry, RebalancingSource,
    RebalancingSummary, SourceError, TradeLine,
};
use cube_notification::{NotificationError, NotificationResult, NotificationSender};
use rust_decimal_macros::dec;

pub fn acme_line() -> TradeLine {
    TradeLine {
        stock_name: "Acme".to_string(),
        stock_symbol: "ACM".to_string(),
        prev_weight: dec!(10),
        weight: Some(dec!(15)),
        price: Some(dec!(12.5)),
    }
}

/// 메모리 기반 리밸런싱 소스.
#[derive(Default)]
pub struct FakeSource {
    unnamed: Mutex<HashSet<String>>,
    latest: Mutex<HashMap<String, RebalancingSummary>>,
    history: Mutex<HashMap<String, Vec<RebalancingHistoryEntry>>>,
    failing_quotes: Mutex<HashSet<String>>,
    failing_history: Mutex<HashSet<String>>,
    quote_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, cube: &str, event: &str, status: &str, created_at_ms: i64) {
        self.latest.lock().unwrap().insert(
            cube.to_string(),
            RebalancingSummary {
                id: EventId::from(event),
                status: status.to_string(),
                created_at_ms,
            },
        );
    }

    pub fn set_history(&self, cube: &str, event: &str, trade_lines: Vec<TradeLine>) {
        self.history.lock().unwrap().insert(
            cube.to_string(),
            vec![RebalancingHistoryEntry {
                id: EventId::from(event),
                trade_lines,
            }],
        );
    }

    pub fn clear_name(&self, cube: &str) {
        self.unnamed.lock().unwrap().insert(cube.to_string());
    }

    pub fn fail_quote(&self, cube: &str) {
        self.failing_quotes.lock().unwrap().insert(cube.to_string());
    }

    pub fn fail_history(&self, cube: &str) {
        self.failing_history.lock().unwrap().insert(cube.to_string());
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RebalancingSource for FakeSource {
    async fn fetch_current_quote(&self, id: &PortfolioId) -> Result<PortfolioQuote, SourceError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_quotes.lock().unwrap().contains(id.as_str()) {
            return Err(SourceError::Timeout("10s".to_string()));
        }
        let name = if self.unnamed.lock().unwrap().contains(id.as_str()) {
            None
        } else {
            Some("价值组合".to_string())
        };
        Ok(PortfolioQuote {
            portfolio_id: id.clone(),
            name,
        })
    }

    async fn fetch_latest_rebalancing(
        &self,
        id: &PortfolioId,
    ) -> Result<Option<RebalancingSummary>, SourceError> {
        Ok(self.latest.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn fetch_rebalancing_history(
        &self,
        id: &PortfolioId,
        _page_size: u32,
        _page: u32,
    ) -> Result<Vec<RebalancingHistoryEntry>, SourceError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_history.lock().unwrap().contains(id.as_str()) {
            return Err(SourceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn source_name(&self) -> &str {
        "fake"
    }
}

/// 보낸 메시지를 기록하는 알림 채널.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 항상 전송에 실패하는 채널.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send_text(&self, content: &str) -> NotificationResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotificationError::HttpStatus {
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.messages.lock().unwrap().push(content.to_string());
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}
