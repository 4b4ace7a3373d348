//! 상하이 시간 기준 시간 유틸리티.
//!
//! - 소스 epoch 밀리초를 표시 문자열로 변환
//! - A주 거래 시간(집합경쟁 포함) 판정

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// 표시 및 거래 시간 판정에 사용하는 시간대.
pub const MARKET_TZ: Tz = chrono_tz::Asia::Shanghai;

/// 표시 형식 (`2024.01.02 09:30:00`).
pub const DISPLAY_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// 현재 상하이 시각.
pub fn now_local() -> DateTime<Tz> {
    Utc::now().with_timezone(&MARKET_TZ)
}

/// 현재 상하이 시각의 표시 문자열.
pub fn now_display() -> String {
    now_local().format(DISPLAY_FORMAT).to_string()
}

/// epoch 밀리초를 UTC로 해석하고 `offset_hours`만큼 이동한 뒤
/// 상하이 시간 표시 문자열로 변환합니다.
///
/// # Errors
///
/// 표현할 수 없는 범위의 타임스탬프/오프셋이면 `CoreError::Timestamp`.
pub fn format_timestamp(epoch_ms: i64, offset_hours: i64) -> CoreResult<String> {
    let utc = DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .ok_or_else(|| CoreError::Timestamp(format!("범위를 벗어난 타임스탬프: {}", epoch_ms)))?;
    let offset = TimeDelta::try_hours(offset_hours)
        .ok_or_else(|| CoreError::Timestamp(format!("잘못된 시간 오프셋: {}h", offset_hours)))?;
    let shifted = utc.checked_add_signed(offset).ok_or_else(|| {
        CoreError::Timestamp(format!("{} + {}h 계산 중 오버플로", epoch_ms, offset_hours))
    })?;

    Ok(shifted.with_timezone(&MARKET_TZ).format(DISPLAY_FORMAT).to_string())
}

/// 하나의 거래 세션 (양 끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSession {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TradingSession {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// 거래 시간 게이트.
///
/// 상태가 없으며 스케줄러 틱마다 다시 평가됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    sessions: Vec<TradingSession>,
}

impl TradingWindow {
    /// 임의 세션 목록으로 생성합니다.
    pub fn new(sessions: Vec<TradingSession>) -> Self {
        Self { sessions }
    }

    /// A주 세션: 09:25–11:30, 13:00–15:00.
    pub fn a_share() -> Self {
        Self::new(vec![
            TradingSession::new(hm(9, 25), hm(11, 30)),
            TradingSession::new(hm(13, 0), hm(15, 0)),
        ])
    }

    /// 하루 종일 열려 있는 창 (수동 실행용).
    pub fn always_open() -> Self {
        Self::new(vec![TradingSession::new(
            NaiveTime::MIN,
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).expect("유효한 시각"),
        )])
    }

    pub fn sessions(&self) -> &[TradingSession] {
        &self.sessions
    }

    /// 상하이 현지 시각(time-of-day)이 어느 세션에든 속하는지.
    pub fn contains(&self, local_time: NaiveTime) -> bool {
        self.sessions.iter().any(|s| s.contains(local_time))
    }

    /// 임의 시간대의 시각을 상하이 시간으로 바꿔 판정합니다.
    pub fn is_open_at<T: TimeZone>(&self, at: &DateTime<T>) -> bool {
        self.contains(at.with_timezone(&MARKET_TZ).time())
    }

    pub fn is_open_now(&self) -> bool {
        self.contains(now_local().time())
    }
}

impl Default for TradingWindow {
    fn default() -> Self {
        Self::a_share()
    }
}

/// A주 거래 시간 여부.
pub fn is_trading_hours(local_time: NaiveTime) -> bool {
    TradingWindow::a_share().contains(local_time)
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("세션 경계는 유효한 시각")
}
