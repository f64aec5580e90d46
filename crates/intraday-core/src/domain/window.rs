//! 조회 구간 및 벤더 조회 한도.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 조회 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchMode {
    /// 기존 기록이 없는 심볼의 최대 이력 수집
    FullBackfill,
    /// 마지막 기록 이후 구간만 수집
    Incremental,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::FullBackfill => write!(f, "FULL_BACKFILL"),
            FetchMode::Incremental => write!(f, "INCREMENTAL"),
        }
    }
}

/// 한 심볼에 대해 한 번의 실행에서 계산되는 조회 구간.
///
/// 백필은 시작/종료를 데이터 소스가 자체 한도에 맞춰 정하므로 구간이 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchWindow {
    FullBackfill,
    Incremental {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl FetchWindow {
    pub fn mode(&self) -> FetchMode {
        match self {
            FetchWindow::FullBackfill => FetchMode::FullBackfill,
            FetchWindow::Incremental { .. } => FetchMode::Incremental,
        }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        match self {
            FetchWindow::FullBackfill => None,
            FetchWindow::Incremental { start, .. } => Some(*start),
        }
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        match self {
            FetchWindow::FullBackfill => None,
            FetchWindow::Incremental { end, .. } => Some(*end),
        }
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchWindow::FullBackfill => write!(f, "FULL_BACKFILL"),
            FetchWindow::Incremental { start, end } => {
                write!(f, "INCREMENTAL [{} .. {}]", start, end)
            }
        }
    }
}

/// 벤더가 한 번의 요청에 허용하는 최대 과거 조회 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackLimit {
    /// 달력 기준 최대 일수 (주식)
    Days(u32),
    /// 최대 행 수 × 봉 간격 (암호화폐 분봉)
    Bars { count: u32, bar: Duration },
}

impl LookbackLimit {
    /// 최대 조회 범위를 기간으로 반환합니다.
    ///
    /// 표현할 수 없을 만큼 크면 `Duration::MAX`로 포화됩니다.
    pub fn span(&self) -> Duration {
        match self {
            LookbackLimit::Days(days) => Duration::days(i64::from(*days)),
            LookbackLimit::Bars { count, bar } => i32::try_from(*count)
                .ok()
                .and_then(|count| bar.checked_mul(count))
                .unwrap_or(Duration::MAX),
        }
    }

    /// `now` 기준 요청 가능한 가장 이른 시각.
    ///
    /// 범위를 벗어나면 표현 가능한 가장 이른 시각을 반환합니다.
    pub fn earliest(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.span())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
