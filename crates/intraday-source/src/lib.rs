//! 벤더 가격 이력 데이터 소스.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - DataSource trait: 단일 심볼/단일 구간 조회 계약
//! - 주식 분봉/일봉 소스 (price-history REST API)
//! - 암호화폐 분봉 소스 (histominute API)
//! - 요청 속도 제한기
//! - 다중 심볼 조회 도우미 (순차/동시)

pub mod crypto;
pub mod equity;
pub mod error;
mod http;
pub mod pull;
pub mod rate_limit;
pub mod traits;

pub use crypto::{CryptoConfig, CryptoIntradaySource};
pub use equity::{EquityConfig, EquityFrequency, EquityIntradaySource, PriceHistoryRequest};
pub use error::*;
pub use pull::{pull_concurrent, pull_concurrent_until, pull_sequential};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use traits::*;
