//! 설정 관리.
//!
//! 설정 파일(TOML 또는 INI, 확장자로 판별)과 `CUBEWATCH__섹션__키`
//! 환경 변수를 합쳐 [`AppConfig`]를 만듭니다.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::types::PortfolioId;

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "CUBEWATCH";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 감시 설정
    pub watch: WatchConfig,
    /// 데이터 소스 설정
    pub source: SourceConfig,
    /// DingTalk 웹훅 설정
    pub dingtalk: WebhookConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 감시 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// 감시할 포트폴리오 ID 목록 (`"ZH1,ZH2"` 또는 배열)
    #[serde(deserialize_with = "portfolio_list")]
    pub cube_ids: Vec<PortfolioId>,
    /// 주기 단위 (seconds, minutes, hours)
    #[serde(default = "default_interval_type")]
    pub interval_type: String,
    /// 주기 값
    #[serde(default = "default_interval_value")]
    pub interval_value: f64,
    /// 처리 완료 ID 저장 파일
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// 이력 조회 페이지 크기
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
    /// 이력 조회 페이지 번호
    #[serde(default = "default_history_page")]
    pub history_page: u32,
    /// 생성 시각 표시 보정 (시간)
    #[serde(default)]
    pub timestamp_offset_hours: i64,
}

fn default_interval_type() -> String {
    "minutes".to_string()
}
fn default_interval_value() -> f64 {
    1.0
}
fn default_store_path() -> PathBuf {
    PathBuf::from("processed_ids.json")
}
fn default_history_page_size() -> u32 {
    5
}
fn default_history_page() -> u32 {
    1
}

impl WatchConfig {
    /// 스케줄러 주기.
    pub fn interval(&self) -> IntervalSpec {
        IntervalSpec::new(IntervalUnit::parse(&self.interval_type), self.interval_value)
    }
}

/// 데이터 소스(Xueqiu) 설정.
#[derive(Clone, Deserialize)]
pub struct SourceConfig {
    /// API 기본 URL
    #[serde(default = "default_source_base_url")]
    pub base_url: String,
    /// 세션 쿠키 `xq_a_token`
    #[serde(default)]
    pub xq_a_token: String,
    /// 세션 쿠키 `u`
    #[serde(default)]
    pub u: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User-Agent 헤더
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_source_base_url() -> String {
    "https://xueqiu.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("base_url", &self.base_url)
            .field("xq_a_token", &"[REDACTED]")
            .field("u", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// DingTalk 웹훅 설정.
#[derive(Clone, Deserialize)]
pub struct WebhookConfig {
    /// 전송 활성화 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 웹훅 URL (access_token 포함)
    #[serde(default)]
    pub webhook_url: String,
    /// @ 멘션할 휴대폰 번호 목록
    #[serde(default, deserialize_with = "string_list")]
    pub at_mobiles: Vec<String>,
    /// 서명 비밀키 (DingTalk "加签" 보안 설정 사용 시)
    #[serde(default)]
    pub secret: Option<String>,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("enabled", &self.enabled)
            .field("webhook_url", &"[REDACTED]")
            .field("at_mobiles", &self.at_mobiles)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 허용하는 최대 스케줄 주기 (7일).
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 3600);

/// 스케줄 주기 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    /// 단위 문자열 해석. 알 수 없는 값은 분 단위로 취급합니다.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "s" => Self::Seconds,
            "hours" | "hour" | "h" => Self::Hours,
            _ => Self::Minutes,
        }
    }

    fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Seconds => "초",
            Self::Minutes => "분",
            Self::Hours => "시간",
        }
    }
}

/// 스케줄 주기 (단위 + 값).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSpec {
    pub unit: IntervalUnit,
    pub value: f64,
}

impl IntervalSpec {
    pub fn new(unit: IntervalUnit, value: f64) -> Self {
        Self { unit, value }
    }

    /// 주기를 초 단위로 반환합니다.
    pub fn as_secs_f64(&self) -> f64 {
        self.value * self.unit.seconds()
    }

    /// 주기를 Duration으로 반환. 표현할 수 없는 값이면 1분,
    /// [`MAX_INTERVAL`]보다 길면 [`MAX_INTERVAL`].
    pub fn period(&self) -> Duration {
        let secs = self.as_secs_f64();
        if secs >= MAX_INTERVAL.as_secs_f64() {
            return MAX_INTERVAL;
        }
        Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(60))
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드하고 검증합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    /// TOML 문자열에서 설정을 로드합니다 (환경 변수 미적용).
    pub fn from_toml_str(toml: &str) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));

        Self::build(builder)
    }

    fn build(
        builder: config::builder::ConfigBuilder<config::builder::DefaultState>,
    ) -> CoreResult<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 값의 일관성을 검증합니다.
    pub fn validate(&self) -> CoreResult<()> {
        if self.watch.cube_ids.is_empty() {
            return Err(CoreError::Config(
                "watch.cube_ids에 감시할 포트폴리오가 없습니다".to_string(),
            ));
        }
        if !self.watch.interval_value.is_finite() || self.watch.interval_value <= 0.0 {
            return Err(CoreError::Config(format!(
                "watch.interval_value는 양수여야 합니다: {}",
                self.watch.interval_value
            )));
        }
        if self.watch.interval().as_secs_f64() > MAX_INTERVAL.as_secs_f64() {
            return Err(CoreError::Config(format!(
                "watch 주기가 너무 깁니다: {} (최대 {}초)",
                self.watch.interval(),
                MAX_INTERVAL.as_secs()
            )));
        }
        if self.watch.history_page_size == 0 || self.watch.history_page == 0 {
            return Err(CoreError::Config(
                "watch.history_page_size / history_page는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.source.xq_a_token.trim().is_empty() {
            return Err(CoreError::Config(
                "source.xq_a_token이 설정되지 않았습니다".to_string(),
            ));
        }
        if self.dingtalk.enabled && self.dingtalk.webhook_url.trim().is_empty() {
            return Err(CoreError::Config(
                "dingtalk.webhook_url이 설정되지 않았습니다".to_string(),
            ));
        }
        Ok(())
    }
}

/// 문자열/숫자 스칼라. INI와 환경 변수 값은 숫자로 파싱될 수 있습니다.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(x) => x.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarOrList {
    List(Vec<Scalar>),
    One(Scalar),
}

/// 배열 또는 쉼표 구분 문자열을 공백 제거된 비어 있지 않은 항목 목록으로 읽습니다.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match ScalarOrList::deserialize(deserializer)? {
        ScalarOrList::List(items) => items.into_iter().map(Scalar::into_string).collect(),
        ScalarOrList::One(one) => one
            .into_string()
            .split(',')
            .map(str::to_string)
            .collect::<Vec<_>>(),
    };

    Ok(raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn portfolio_list<'de, D>(deserializer: D) -> Result<Vec<PortfolioId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_list(deserializer)?
        .into_iter()
        .map(PortfolioId::new)
        .collect())
}
