//! 감시기 전반에서 사용되는 식별자 타입.

mod ids;

pub use ids::*;
