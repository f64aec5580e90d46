//! # Intraday Core
//!
//! 가격 시계열 증분 수집 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 심볼 및 표준 타임스탬프 형식
//! - 시계열 행/시계열 타입
//! - 조회 구간(FetchWindow)과 구간 계산기(resolver)
//! - 심볼별 갱신 결과
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use resolver::{resolve, Resolution};
pub use types::*;
