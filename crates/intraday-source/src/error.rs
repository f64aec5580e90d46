//! 데이터 소스 에러 타입.
//!
//! 벤더가 "데이터 없음"을 알려오는 경우는 에러가 아니라
//! [`FetchResult::Empty`](crate::FetchResult::Empty)로 표현합니다.

use intraday_core::CoreError;
use thiserror::Error;

/// 데이터 소스 관련 에러.
#[derive(Debug, Error)]
pub enum SourceError {
    /// 벤더가 요청을 거부함 (잘못된 심볼/파라미터, 인증 실패)
    #[error("Bad API request: {payload}")]
    BadApiRequest {
        /// 벤더 원본 응답
        payload: String,
    },

    /// 요청 한도 초과
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 벤더 서버 에러
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 응답 파싱 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 요청 파라미터 검증 실패
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 응답 정규화 실패
    #[error("Normalization failed: {0}")]
    Normalize(#[from] CoreError),
}

impl SourceError {
    /// 다음 실행에서 재시도하면 성공할 수 있는 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited(_)
                | SourceError::Http { .. }
                | SourceError::Timeout(_)
                | SourceError::NetworkError(_)
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::ParseError(err.to_string())
        } else {
            SourceError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::ParseError(err.to_string())
    }
}

/// 데이터 소스 작업을 위한 Result 타입.
pub type SourceResult<T> = Result<T, SourceError>;
