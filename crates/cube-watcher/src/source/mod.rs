//! 리밸런싱 데이터 소스 구현.

pub mod xueqiu;

pub use xueqiu::XueqiuClient;
