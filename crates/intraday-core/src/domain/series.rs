//! 시계열 데이터 타입.
//!
//! - `TimeSeriesRow` - 타임스탬프 + 소스별 고정 숫자 컬럼
//! - `TimeSeries` - 타임스탬프 기준 엄격 증가, 중복 없는 행 시퀀스

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 시계열의 한 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    /// 행 시각 (UTC)
    pub timestamp: DateTime<Utc>,
    /// 컬럼 순서대로의 값
    pub values: Vec<f64>,
}

impl TimeSeriesRow {
    /// 새 행을 생성합니다.
    pub fn new(timestamp: DateTime<Utc>, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }
}

/// 순서가 보장된 시계열.
///
/// 생성자를 통해서만 만들 수 있으며, 모든 행은 컬럼 수와 값 개수가 같고
/// 타임스탬프가 엄격하게 증가합니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    columns: Vec<String>,
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeries {
    /// 이미 정렬된 행으로 시계열을 생성합니다.
    pub fn new(columns: Vec<String>, rows: Vec<TimeSeriesRow>) -> CoreResult<Self> {
        check_width(&columns, &rows)?;

        for pair in rows.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(CoreError::NotIncreasing {
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }

        Ok(Self { columns, rows })
    }

    /// 벤더 응답처럼 순서가 보장되지 않은 행으로 시계열을 생성합니다.
    ///
    /// 타임스탬프 순으로 정렬하고, 같은 타임스탬프가 여러 번 나오면
    /// 마지막 행(가장 최근 수정본)만 남깁니다.
    pub fn from_unordered(columns: Vec<String>, mut rows: Vec<TimeSeriesRow>) -> CoreResult<Self> {
        check_width(&columns, &rows)?;

        // 안정 정렬이므로 같은 타임스탬프는 입력 순서를 유지
        rows.sort_by_key(|row| row.timestamp);

        let mut deduped: Vec<TimeSeriesRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match deduped.last_mut() {
                Some(last) if last.timestamp == row.timestamp => *last = row,
                _ => deduped.push(row),
            }
        }

        Ok(Self {
            columns,
            rows: deduped,
        })
    }

    /// 빈 시계열을 생성합니다.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 컬럼 이름 (타임스탬프 제외).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 전체 행.
    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 첫 행의 타임스탬프.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.first().map(|row| row.timestamp)
    }

    /// 마지막 행의 타임스탬프.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.last().map(|row| row.timestamp)
    }

    /// `start <= t <= end` 인 행만 남깁니다.
    pub fn retain_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.rows
            .retain(|row| row.timestamp >= start && row.timestamp <= end);
        self
    }
}

fn check_width(columns: &[String], rows: &[TimeSeriesRow]) -> CoreResult<()> {
    if let Some(row) = rows.iter().find(|row| row.values.len() != columns.len()) {
        return Err(CoreError::WidthMismatch {
            timestamp: row.timestamp,
            expected: columns.len(),
            actual: row.values.len(),
        });
    }
    Ok(())
}
