//! 조회 구간 계산기.
//!
//! 심볼의 마지막 저장 시각과 현재 시각, 벤더 조회 한도로부터
//! 백필/증분 여부와 요청 구간을 결정합니다.

use crate::domain::{FetchWindow, LookbackLimit};
use crate::types::{format_timestamp, TIMESTAMP_EPSILON};
use chrono::{DateTime, Utc};

/// 구간 계산 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 주어진 구간으로 조회
    Fetch(FetchWindow),
    /// 새 데이터가 있을 수 없음 (조회 생략)
    UpToDate,
}

/// 조회 구간을 계산합니다.
///
/// - 기록 없음 → `FullBackfill`
/// - 기록 있음 → `Incremental { last + ε, now }`, 시작이 벤더 한도보다
///   이르면 한도 경계로 당기고 경고를 남깁니다.
/// - 시작이 종료 이후가 되면 `UpToDate`.
pub fn resolve(
    last_known: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    lookback: &LookbackLimit,
) -> Resolution {
    let Some(last) = last_known else {
        return Resolution::Fetch(FetchWindow::FullBackfill);
    };

    let mut start = last + TIMESTAMP_EPSILON;
    let earliest = lookback.earliest(now);

    if start < earliest {
        tracing::warn!(
            requested = %format_timestamp(&start),
            earliest = %format_timestamp(&earliest),
            "조회 시작 시각이 벤더 최대 조회 범위를 벗어나 경계로 조정"
        );
        start = earliest;
    }

    if start >= now {
        return Resolution::UpToDate;
    }

    Resolution::Fetch(FetchWindow::Incremental { start, end: now })
}
