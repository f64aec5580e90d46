//! 핵심 도메인 에러 타입.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// 도메인 타입 생성/검증 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 파일명으로 쓸 수 없는 심볼
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// 표준 형식이 아닌 타임스탬프 문자열
    #[error("Invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    /// 표현 범위를 벗어난 epoch 값
    #[error("Epoch out of range: {0}")]
    EpochOutOfRange(i64),

    /// 행의 값 개수가 컬럼 수와 다름
    #[error("Width mismatch at {timestamp}: expected {expected} values, got {actual}")]
    WidthMismatch {
        timestamp: DateTime<Utc>,
        expected: usize,
        actual: usize,
    },

    /// 타임스탬프가 엄격하게 증가하지 않음
    #[error("Timestamps not increasing: {current} <= {previous}")]
    NotIncreasing {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
