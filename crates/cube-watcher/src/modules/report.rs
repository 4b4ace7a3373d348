//! 리밸런싱 알림 메시지 구성.
//!
//! DingTalk 그룹 수신자를 위해 중국어 라벨을 사용합니다.

use std::fmt::Write as _;

use cube_core::{format_timestamp, RebalancingEvent};
use tracing::warn;

/// 생성 시각을 표시할 수 없을 때 사용하는 값.
const UNKNOWN_TIME: &str = "-";

/// 한 건의 리밸런싱 알림.
#[derive(Debug, Clone)]
pub struct RebalancingReport<'a> {
    display_name: &'a str,
    event: &'a RebalancingEvent,
    created_at: String,
}

impl<'a> RebalancingReport<'a> {
    /// 알림을 구성합니다.
    ///
    /// 생성 시각 변환에 실패하면 경고를 남기고 `-`로 표시합니다.
    pub fn new(display_name: &'a str, event: &'a RebalancingEvent, offset_hours: i64) -> Self {
        let created_at = format_timestamp(event.created_at_ms, offset_hours).unwrap_or_else(|e| {
            warn!(
                cube_id = %event.portfolio_id,
                event_id = %event.id,
                error = %e,
                "생성 시각 변환 실패"
            );
            UNKNOWN_TIME.to_string()
        });

        Self {
            display_name,
            event,
            created_at,
        }
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// 알림 본문.
    pub fn render(&self) -> String {
        let event = self.event;
        let mut out = String::new();

        // String에 대한 write!는 실패하지 않음
        let _ = writeln!(out, "检测到新调仓操作，组合ID: {}", event.portfolio_id);
        let _ = writeln!(out, "组合名称: {}", self.display_name);
        let _ = writeln!(out, "  最新的一次调仓:");
        let _ = writeln!(out, "    调仓ID: {}", event.id);
        let _ = writeln!(out, "    调仓状态: {}", event.status);
        let _ = write!(out, "    调仓时间: {}", self.created_at);

        for line in &event.trade_lines {
            let _ = write!(
                out,
                "\n    股票信息: {}\n    调仓价格: {}\n    调仓结果: {}",
                line.label(),
                line.price_text(),
                line.weight_change()
            );
        }

        out
    }
}
