//! # Cube Core
//!
//! Xueqiu(雪球) 포트폴리오 리밸런싱 감시기의 공통 기반을 제공합니다:
//! - 포트폴리오/리밸런싱 이벤트 도메인 타입
//! - 리밸런싱 이력 데이터 소스 trait
//! - 상하이 시간 기준 타임스탬프 포맷 및 거래 시간 판정
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod market_time;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use market_time::*;
pub use types::*;
