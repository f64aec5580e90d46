//! 증분 수집을 위한 도메인 모델.

mod outcome;
mod series;
mod window;

pub use outcome::*;
pub use series::*;
pub use window::*;
