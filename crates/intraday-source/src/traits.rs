//! 데이터 소스 공통 계약.

use crate::error::SourceResult;
use async_trait::async_trait;
use intraday_core::{FetchWindow, LookbackLimit, Symbol, TimeSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 단일 조회 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// 정규화된 시계열 (비어 있지 않음)
    Series(TimeSeries),
    /// 벤더가 해당 구간에 데이터가 없다고 응답함
    Empty,
}

impl FetchResult {
    /// 필터링 후 행이 남지 않으면 `Empty`로 취급합니다.
    pub fn from_series(series: TimeSeries) -> Self {
        if series.is_empty() {
            FetchResult::Empty
        } else {
            FetchResult::Series(series)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FetchResult::Series(series) => series.len(),
            FetchResult::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchResult::Empty)
    }
}

/// 벤더 데이터 소스 trait.
///
/// 한 번의 호출은 한 심볼, 한 구간에 대한 제한된 조회입니다.
/// 구현체는 자체 최대 조회 범위를 스스로 강제하고, 증분 구간에서는
/// 구간 밖의 행을 걸러낸 뒤 엄격 증가 시계열을 반환해야 합니다.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 소스 이름 (로그용).
    fn name(&self) -> &'static str;

    /// 타임스탬프를 제외한 고정 컬럼 이름.
    fn columns(&self) -> &'static [&'static str];

    /// 벤더 최대 조회 범위.
    fn lookback(&self) -> LookbackLimit;

    /// 한 심볼의 한 구간을 조회합니다.
    async fn fetch(&self, symbol: &Symbol, window: &FetchWindow) -> SourceResult<FetchResult>;
}

/// 설정 시점에 선택되는 데이터 소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// 주식 1분봉
    Equity,
    /// 주식 일봉
    EquityDaily,
    /// 암호화폐 1분봉
    Crypto,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Equity => write!(f, "equity"),
            SourceKind::EquityDaily => write!(f, "equity-daily"),
            SourceKind::Crypto => write!(f, "crypto"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equity" | "stock" => Ok(Self::Equity),
            "equity-daily" | "stock-daily" => Ok(Self::EquityDaily),
            "crypto" => Ok(Self::Crypto),
            _ => Err(format!("Unknown data source: {}", s)),
        }
    }
}

/// 컬럼 이름 목록을 소유 문자열로 변환합니다.
pub(crate) fn owned_columns(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_from_str() {
        assert_eq!("equity".parse::<SourceKind>().unwrap(), SourceKind::Equity);
        assert_eq!("STOCK".parse::<SourceKind>().unwrap(), SourceKind::Equity);
        assert_eq!(
            "equity-daily".parse::<SourceKind>().unwrap(),
            SourceKind::EquityDaily
        );
        assert_eq!("crypto".parse::<SourceKind>().unwrap(), SourceKind::Crypto);
        assert!("forex".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_fetch_result_from_empty_series() {
        let series = TimeSeries::empty(owned_columns(&["close"]));
        assert!(FetchResult::from_series(series).is_empty());
    }
}
