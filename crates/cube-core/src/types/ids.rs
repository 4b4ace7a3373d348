//! 포트폴리오 및 리밸런싱 이벤트 식별자.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 감시 대상 포트폴리오(큐브) ID.
///
/// 예: `ZH123456`. 외부에서 주어지는 불투명한 문자열입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioId(String);

impl PortfolioId {
    /// 새 포트폴리오 ID를 생성합니다. 앞뒤 공백은 제거됩니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// 문자열 표현을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortfolioId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PortfolioId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// 리밸런싱 이벤트 ID (중복 제거 키).
///
/// 소스 API는 숫자 ID를 내려주지만 저장 파일에는 문자열도 허용되므로
/// JSON 모양 그대로 보존합니다. 숫자는 `i64`, `u64`, 소수 순으로 해석합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    /// 숫자 ID
    Number(i64),
    /// `i64` 범위를 넘는 양의 정수 ID
    Unsigned(u64),
    /// 정수가 아닌 숫자 ID
    Fractional(FractionalId),
    /// 문자열 ID
    Text(String),
}

/// 정수가 아닌 숫자 ID.
///
/// 최단 십진 표기로 보관하므로 같은 값은 항상 같은 키가 됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FractionalId(String);

impl FractionalId {
    /// 유한한 값만 허용합니다.
    pub fn new(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(|n| Self(n.to_string()))
    }

    pub fn value(&self) -> f64 {
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for FractionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for FractionalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl<'de> Deserialize<'de> for FractionalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        FractionalId::new(value)
            .ok_or_else(|| de::Error::custom(format!("유한하지 않은 숫자 ID: {}", value)))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Number(n) => write!(f, "{}", n),
            EventId::Unsigned(n) => write!(f, "{}", n),
            EventId::Fractional(n) => write!(f, "{}", n),
            EventId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EventId {
    fn from(n: i64) -> Self {
        EventId::Number(n)
    }
}

impl From<u64> for EventId {
    fn from(n: u64) -> Self {
        i64::try_from(n)
            .map(EventId::Number)
            .unwrap_or(EventId::Unsigned(n))
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId::Text(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        EventId::Text(s)
    }
}

impl std::str::FromStr for EventId {
    type Err = std::convert::Infallible;

    /// 숫자로 해석되면 숫자 ID, 아니면 문자열 ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Ok(EventId::Number(n));
        }
        if let Ok(n) = s.parse::<u64>() {
            return Ok(EventId::Unsigned(n));
        }
        if s.contains(['.', 'e', 'E']) {
            if let Some(id) = s.parse::<f64>().ok().and_then(FractionalId::new) {
                return Ok(EventId::Fractional(id));
            }
        }
        Ok(EventId::Text(s.to_string()))
    }
}
