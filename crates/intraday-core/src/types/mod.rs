//! 시스템 전반에서 사용되는 공통 타입.

mod symbol;
mod timestamp;

pub use symbol::*;
pub use timestamp::*;
