//! Xueqiu(雪球) 큐브 API 클라이언트.
//!
//! ## 엔드포인트
//! - `/cubes/quote.json?code=`: 포트폴리오 시세 (이름 포함)
//! - `/cubes/rebalancing/current.json?cube_symbol=`: 최신 리밸런싱 (`last_rb`)
//! - `/cubes/rebalancing/history.json?cube_symbol=&count=&page=`: 리밸런싱 이력
//!
//! 모든 요청은 로그인 세션 쿠키(`xq_a_token`, `u`)를 필요로 합니다.

use async_trait::async_trait;
use cube_core::{
    EventId, PortfolioId, PortfolioQuote, RebalancingHistoryEntry, RebalancingSource,
    RebalancingSummary, SourceConfig, SourceError, TradeLine,
};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// `current.json` 응답.
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    last_rb: Option<LastRebalancing>,
}

#[derive(Debug, Deserialize)]
struct LastRebalancing {
    id: Option<EventId>,
    #[serde(default)]
    status: Option<String>,
    created_at: Option<i64>,
}

/// `history.json` 응답.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    list: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    id: EventId,
    #[serde(default)]
    rebalancing_histories: Vec<HistoryRecord>,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(default)]
    stock_name: Option<String>,
    #[serde(default)]
    stock_symbol: Option<String>,
    #[serde(default)]
    prev_weight: Option<Decimal>,
    #[serde(default)]
    weight: Option<Decimal>,
    #[serde(default)]
    price: Option<Decimal>,
}

impl From<HistoryRecord> for TradeLine {
    fn from(record: HistoryRecord) -> Self {
        Self {
            stock_name: record.stock_name.unwrap_or_default(),
            stock_symbol: record.stock_symbol.unwrap_or_default(),
            prev_weight: record.prev_weight.unwrap_or(Decimal::ZERO),
            weight: record.weight,
            price: record.price,
        }
    }
}

/// Xueqiu 클라이언트
pub struct XueqiuClient {
    client: Client,
    base_url: String,
    cookie: SecretString,
}

impl XueqiuClient {
    /// 설정으로 클라이언트를 생성합니다.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| SourceError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        let cookie = format!("xq_a_token={};u={}", config.xq_a_token, config.u);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie: SecretString::new(cookie.into()),
        })
    }

    fn headers(&self) -> Result<HeaderMap, SourceError> {
        let mut cookie = HeaderValue::from_str(self.cookie.expose_secret())
            .map_err(|_| SourceError::Parse("쿠키에 허용되지 않는 문자가 있습니다".to_string()))?;
        cookie.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Xueqiu 요청");

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("{} 응답 해석 실패: {}", path, e)))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(err.to_string())
    } else {
        SourceError::Network(err.to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[async_trait]
impl RebalancingSource for XueqiuClient {
    async fn fetch_current_quote(&self, id: &PortfolioId) -> Result<PortfolioQuote, SourceError> {
        let body: serde_json::Value = self
            .get_json("/cubes/quote.json", &[("code", id.to_string())])
            .await?;

        let name = body
            .get(id.as_str())
            .and_then(|entry| entry.get("name"))
            .and_then(|name| name.as_str())
            .map(str::to_string);

        Ok(PortfolioQuote {
            portfolio_id: id.clone(),
            name,
        })
    }

    async fn fetch_latest_rebalancing(
        &self,
        id: &PortfolioId,
    ) -> Result<Option<RebalancingSummary>, SourceError> {
        let body: CurrentResponse = self
            .get_json(
                "/cubes/rebalancing/current.json",
                &[("cube_symbol", id.to_string())],
            )
            .await?;

        let Some(last) = body.last_rb else {
            return Ok(None);
        };

        Ok(Some(RebalancingSummary {
            id: last.id.ok_or(SourceError::MissingField("last_rb.id"))?,
            status: last.status.unwrap_or_default(),
            created_at_ms: last
                .created_at
                .ok_or(SourceError::MissingField("last_rb.created_at"))?,
        }))
    }

    async fn fetch_rebalancing_history(
        &self,
        id: &PortfolioId,
        page_size: u32,
        page: u32,
    ) -> Result<Vec<RebalancingHistoryEntry>, SourceError> {
        let body: HistoryResponse = self
            .get_json(
                "/cubes/rebalancing/history.json",
                &[
                    ("cube_symbol", id.to_string()),
                    ("count", page_size.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        Ok(body
            .list
            .into_iter()
            .map(|item| RebalancingHistoryEntry {
                id: item.id,
                trade_lines: item
                    .rebalancing_histories
                    .into_iter()
                    .map(TradeLine::from)
                    .collect(),
            })
            .collect())
    }

    fn source_name(&self) -> &str {
        "xueqiu"
    }
}
