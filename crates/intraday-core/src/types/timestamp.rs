//! 표준 타임스탬프 형식.
//!
//! 저장 파일의 첫 컬럼과 실행 로그는 모두 [`TIMESTAMP_FORMAT`] 하나로
//! 읽고 씁니다. 모든 시각은 UTC 밀리초 정밀도로 정규화됩니다.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// 저장 파일과 실행 로그가 공유하는 타임스탬프 형식.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 표현 가능한 최소 시간 단위 (1ms).
pub const TIMESTAMP_EPSILON: Duration = Duration::milliseconds(1);

/// 타임스탬프를 표준 형식 문자열로 변환합니다.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// 표준 형식 문자열을 UTC 타임스탬프로 파싱합니다.
pub fn parse_timestamp(s: &str) -> CoreResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidTimestamp {
            input: s.to_string(),
            reason: e.to_string(),
        })
}

/// 밀리초 epoch를 타임스탬프로 변환합니다.
pub fn from_epoch_millis(ms: i64) -> CoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(CoreError::EpochOutOfRange(ms))
}

/// 초 단위 epoch를 타임스탬프로 변환합니다.
pub fn from_epoch_seconds(secs: i64) -> CoreResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(CoreError::EpochOutOfRange(secs))
}

/// 타임스탬프를 밀리초 epoch로 변환합니다.
pub fn to_epoch_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// 밀리초 미만 정밀도를 버립니다.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
