//! 포트폴리오 시세 메타데이터와 리밸런싱 이벤트 모델.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{EventId, PortfolioId};

/// 포트폴리오 이름을 얻지 못했을 때 사용하는 자리표시자.
pub const UNKNOWN_PORTFOLIO_NAME: &str = "未知名称";

/// 포트폴리오 현재 시세 메타데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioQuote {
    /// 포트폴리오 ID
    pub portfolio_id: PortfolioId,
    /// 포트폴리오 표시 이름 (소스가 내려주지 않으면 None)
    pub name: Option<String>,
}

impl PortfolioQuote {
    /// 표시용 이름. 이름이 없으면 [`UNKNOWN_PORTFOLIO_NAME`].
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_PORTFOLIO_NAME)
    }
}

/// "최신 리밸런싱" 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingSummary {
    /// 이벤트 ID
    pub id: EventId,
    /// 소스 시스템이 보고한 상태 (그대로 전달)
    pub status: String,
    /// 생성 시각 (epoch 밀리초)
    pub created_at_ms: i64,
}

/// 리밸런싱에 포함된 개별 종목 비중 변경.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLine {
    /// 종목명
    pub stock_name: String,
    /// 종목 코드 (예: SH600000)
    pub stock_symbol: String,
    /// 변경 전 비중 (%)
    pub prev_weight: Decimal,
    /// 변경 후 비중 (%)
    pub weight: Option<Decimal>,
    /// 체결 가격
    pub price: Option<Decimal>,
}

impl TradeLine {
    /// `종목명 (종목코드)` 형식 라벨.
    pub fn label(&self) -> String {
        format!("{} ({})", self.stock_name, self.stock_symbol)
    }

    /// 가격 표시 문자열. 가격이 없으면 `-`.
    pub fn price_text(&self) -> String {
        optional_decimal(self.price)
    }

    /// `이전% -> 이후%` 형식 비중 변화.
    pub fn weight_change(&self) -> String {
        format!(
            "{}% -> {}%",
            self.prev_weight.normalize(),
            optional_decimal(self.weight)
        )
    }
}

fn optional_decimal(value: Option<Decimal>) -> String {
    value
        .map(|v| v.normalize().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// 리밸런싱 이력 페이지의 한 항목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingHistoryEntry {
    /// 이벤트 ID
    pub id: EventId,
    /// 종목별 비중 변경 목록
    pub trade_lines: Vec<TradeLine>,
}

/// 이력 페이지에서 주어진 이벤트의 비중 변경 목록을 찾습니다.
///
/// 페이지에 해당 이벤트가 없으면 빈 목록입니다 (에러 아님).
pub fn trade_lines_for(history: &[RebalancingHistoryEntry], id: &EventId) -> Vec<TradeLine> {
    history
        .iter()
        .find(|entry| &entry.id == id)
        .map(|entry| entry.trade_lines.clone())
        .unwrap_or_default()
}

/// 감지된 리밸런싱 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancingEvent {
    /// 이벤트 ID (중복 제거 키)
    pub id: EventId,
    /// 소스 상태
    pub status: String,
    /// 생성 시각 (epoch 밀리초)
    pub created_at_ms: i64,
    /// 소속 포트폴리오
    pub portfolio_id: PortfolioId,
    /// 종목별 비중 변경 (없을 수 있음)
    pub trade_lines: Vec<TradeLine>,
}

impl RebalancingEvent {
    /// 최신 요약과 이력 페이지로부터 이벤트를 구성합니다.
    pub fn from_summary(
        portfolio_id: PortfolioId,
        summary: RebalancingSummary,
        history: &[RebalancingHistoryEntry],
    ) -> Self {
        let trade_lines = trade_lines_for(history, &summary.id);
        Self {
            id: summary.id,
            status: summary.status,
            created_at_ms: summary.created_at_ms,
            portfolio_id,
            trade_lines,
        }
    }
}
