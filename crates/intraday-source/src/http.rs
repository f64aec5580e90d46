//! 벤더 HTTP 공통 처리.

use crate::error::{SourceError, SourceResult};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = concat!("intraday-collector/", env!("CARGO_PKG_VERSION"));

/// 타임아웃이 설정된 HTTP 클라이언트를 생성합니다.
pub(crate) fn build_client(timeout: Duration) -> SourceResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::NetworkError(format!("failed to build HTTP client: {}", e)))
}

/// 응답 본문을 읽고 상태 코드를 에러로 분류합니다.
///
/// 성공 응답은 본문 문자열을 그대로 반환합니다.
/// 4xx는 요청 거부로 보고 원본 본문을 `BadApiRequest`에 담습니다.
pub(crate) async fn read_body(response: reqwest::Response) -> SourceResult<String> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    Err(classify_status(status, body))
}

fn classify_status(status: StatusCode, body: String) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        SourceError::RateLimited(body)
    } else if status.is_client_error() {
        SourceError::BadApiRequest { payload: body }
    } else {
        SourceError::Http {
            status: status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "denied".into()),
            SourceError::BadApiRequest { payload } if payload == "denied"
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            SourceError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            SourceError::Http { status: 502, .. }
        ));
    }
}
