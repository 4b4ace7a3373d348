//! 리밸런싱 데이터 소스 추상화.
//!
//! 포트폴리오 시세, 최신 리밸런싱 요약, 리밸런싱 이력 페이지를 조회하는
//! 소스 중립적인 인터페이스를 제공합니다.

use async_trait::async_trait;
use thiserror::Error;

use super::{PortfolioQuote, RebalancingHistoryEntry, RebalancingSummary};
use crate::types::PortfolioId;

// =============================================================================
// 에러 타입
// =============================================================================

/// 데이터 소스 에러.
#[derive(Debug, Error)]
pub enum SourceError {
    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 시간 초과
    #[error("요청 시간 초과: {0}")]
    Timeout(String),

    /// 2xx가 아닌 HTTP 응답
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 응답 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 필수 필드 누락
    #[error("필수 필드 누락: {0}")]
    MissingField(&'static str),
}

impl SourceError {
    /// 다음 틱에서 재시도할 가치가 있는 일시적 에러인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(_) | SourceError::Timeout(_) => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::Parse(_) | SourceError::MissingField(_) => false,
        }
    }
}

// =============================================================================
// RebalancingSource Trait
// =============================================================================

/// 리밸런싱 데이터 소스 trait.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct XueqiuClient { /* ... */ }
///
/// #[async_trait]
/// impl RebalancingSource for XueqiuClient {
///     async fn fetch_current_quote(&self, id: &PortfolioId) -> Result<PortfolioQuote, SourceError> {
///         // cubes/quote.json 호출 및 변환
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait RebalancingSource: Send + Sync {
    /// 포트폴리오 현재 시세 메타데이터 조회.
    async fn fetch_current_quote(&self, id: &PortfolioId) -> Result<PortfolioQuote, SourceError>;

    /// 최신 리밸런싱 요약 조회.
    ///
    /// # Returns
    ///
    /// 리밸런싱 기록이 아직 없으면 `None`.
    async fn fetch_latest_rebalancing(
        &self,
        id: &PortfolioId,
    ) -> Result<Option<RebalancingSummary>, SourceError>;

    /// 리밸런싱 이력 한 페이지 조회 (최신순).
    async fn fetch_rebalancing_history(
        &self,
        id: &PortfolioId,
        page_size: u32,
        page: u32,
    ) -> Result<Vec<RebalancingHistoryEntry>, SourceError>;

    /// 소스 이름 (로깅용).
    fn source_name(&self) -> &str;
}
