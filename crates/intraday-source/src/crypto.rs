//! 암호화폐 분봉 소스 (histominute API).
//!
//! `GET {endpoint}?fsym=BTC&tsym=USD&limit=N&aggregate=1` 형식으로 최근 N개
//! 봉을 조회합니다. 벤더는 요청당 최대 2000행만 허용하며, 행의 `time`은
//! 초 단위 epoch입니다.

use crate::error::{SourceError, SourceResult};
use crate::http::{build_client, read_body};
use crate::traits::{owned_columns, DataSource, FetchResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use intraday_core::{
    from_epoch_seconds, truncate_to_millis, FetchWindow, LookbackLimit, Symbol, TimeSeries,
    TimeSeriesRow,
};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// 암호화폐 소스 컬럼.
pub const CRYPTO_COLUMNS: &[&str] = &["open", "high", "low", "close", "volumefrom", "volumeto"];

/// 기본 엔드포인트.
pub const DEFAULT_CRYPTO_ENDPOINT: &str = "https://min-api.cryptocompare.com/data/histominute";

/// 요청당 최대 행 수.
pub const MAX_LIMIT: u32 = 2000;

// ============================================================================
// 설정
// ============================================================================

/// 암호화폐 소스 설정.
#[derive(Debug)]
pub struct CryptoConfig {
    endpoint: Url,
    comparison_symbol: String,
    aggregate: u32,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl CryptoConfig {
    pub fn builder() -> CryptoConfigBuilder {
        CryptoConfigBuilder {
            endpoint: DEFAULT_CRYPTO_ENDPOINT.to_string(),
            comparison_symbol: "USD".to_string(),
            aggregate: 1,
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// 호가 통화 (`tsym`).
    pub fn comparison_symbol(&self) -> &str {
        &self.comparison_symbol
    }

    /// 봉 하나가 묶는 분 수.
    pub fn aggregate(&self) -> u32 {
        self.aggregate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn bar(&self) -> ChronoDuration {
        ChronoDuration::minutes(i64::from(self.aggregate))
    }
}

/// [`CryptoConfig`] 빌더.
#[derive(Debug, Clone)]
pub struct CryptoConfigBuilder {
    endpoint: String,
    comparison_symbol: String,
    aggregate: u32,
    api_key: Option<String>,
    timeout: Duration,
}

impl CryptoConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn comparison_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.comparison_symbol = symbol.into();
        self
    }

    pub fn aggregate(mut self, aggregate: u32) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 모든 필드를 한 번에 검증하고 설정을 생성합니다.
    pub fn build(self) -> SourceResult<CryptoConfig> {
        let mut problems = Vec::new();

        let endpoint = match Url::parse(&self.endpoint) {
            Ok(url) => Some(url),
            Err(e) => {
                problems.push(format!("invalid endpoint {:?}: {}", self.endpoint, e));
                None
            }
        };
        let comparison_symbol = self.comparison_symbol.trim().to_uppercase();
        if comparison_symbol.is_empty() || !comparison_symbol.chars().all(|c| c.is_ascii_alphanumeric())
        {
            problems.push(format!("invalid comparison symbol: {:?}", self.comparison_symbol));
        }
        if self.aggregate == 0 || self.aggregate > 30 {
            problems.push(format!("aggregate must be within 1..=30: {}", self.aggregate));
        }
        if self.timeout.is_zero() {
            problems.push("timeout must be positive".to_string());
        }

        match endpoint {
            Some(endpoint) if problems.is_empty() => Ok(CryptoConfig {
                endpoint,
                comparison_symbol,
                aggregate: self.aggregate,
                api_key: self.api_key.map(|k| SecretString::new(k.into())),
                timeout: self.timeout,
            }),
            _ => Err(SourceError::InvalidRequest(problems.join("; "))),
        }
    }
}

// ============================================================================
// 응답 구조
// ============================================================================

#[derive(Debug, Deserialize)]
struct HistoRow {
    time: i64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volumefrom: Option<f64>,
    volumeto: Option<f64>,
}

impl HistoRow {
    fn into_row(self) -> SourceResult<Option<TimeSeriesRow>> {
        let values = match (
            self.open,
            self.high,
            self.low,
            self.close,
            self.volumefrom,
            self.volumeto,
        ) {
            (Some(o), Some(h), Some(l), Some(c), Some(vf), Some(vt)) => vec![o, h, l, c, vf, vt],
            _ => return Ok(None),
        };
        let timestamp = from_epoch_seconds(self.time)?;
        Ok(Some(TimeSeriesRow::new(timestamp, values)))
    }
}

// ============================================================================
// 데이터 소스
// ============================================================================

/// 증분 조회 시 필요한 행 수.
///
/// `start`부터 `now`까지의 분(올림)을 봉 크기로 나눈 값이며 `[1, MAX_LIMIT]`로 제한됩니다.
pub fn incremental_limit(start: DateTime<Utc>, now: DateTime<Utc>, aggregate: u32) -> u32 {
    let seconds = (now - start).num_seconds().max(0);
    let minutes = (seconds + 59) / 60;
    let per_bar = i64::from(aggregate.max(1));
    let bars = (minutes + per_bar - 1) / per_bar;
    bars.clamp(1, i64::from(MAX_LIMIT)) as u32
}

/// 암호화폐 분봉 데이터 소스.
pub struct CryptoIntradaySource {
    config: CryptoConfig,
    client: Client,
}

impl CryptoIntradaySource {
    pub fn new(config: CryptoConfig) -> SourceResult<Self> {
        let client = build_client(config.timeout())?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    /// `limit` 행을 요청합니다.
    async fn request(&self, symbol: &Symbol, limit: u32) -> SourceResult<FetchResult> {
        let mut params = vec![
            ("fsym", symbol.as_str().to_uppercase()),
            ("tsym", self.config.comparison_symbol().to_string()),
            ("limit", limit.min(MAX_LIMIT).to_string()),
            ("aggregate", self.config.aggregate().to_string()),
        ];
        if let Some(api_key) = &self.config.api_key {
            params.push(("api_key", api_key.expose_secret().to_string()));
        }

        tracing::debug!(symbol = %symbol, limit = limit, "histominute 요청");

        let response = self
            .client
            .get(self.config.endpoint().clone())
            .query(&params)
            .send()
            .await?;
        let body = read_body(response).await?;

        parse_histominute(&body)
    }
}

/// histominute 응답 본문을 정규화된 결과로 변환합니다.
fn parse_histominute(body: &str) -> SourceResult<FetchResult> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    let status = value.get("Response").and_then(|v| v.as_str()).unwrap_or("");
    if status.eq_ignore_ascii_case("error") {
        tracing::error!(payload = body, "벤더가 요청을 거부함");
        return Err(SourceError::BadApiRequest {
            payload: body.to_string(),
        });
    }

    let rows: Vec<HistoRow> = match value.get("Data") {
        Some(data @ serde_json::Value::Array(_)) => serde_json::from_value(data.clone())?,
        Some(serde_json::Value::Object(obj)) if obj.is_empty() => Vec::new(),
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(other) => {
            return Err(SourceError::ParseError(format!(
                "unexpected Data shape: {}",
                other
            )))
        }
    };

    if rows.is_empty() {
        return Ok(FetchResult::Empty);
    }

    let mut normalized = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(row) = row.into_row()? {
            normalized.push(row);
        }
    }

    let series = TimeSeries::from_unordered(owned_columns(CRYPTO_COLUMNS), normalized)?;
    Ok(FetchResult::from_series(series))
}

#[async_trait]
impl DataSource for CryptoIntradaySource {
    fn name(&self) -> &'static str {
        "crypto"
    }

    fn columns(&self) -> &'static [&'static str] {
        CRYPTO_COLUMNS
    }

    fn lookback(&self) -> LookbackLimit {
        LookbackLimit::Bars {
            count: MAX_LIMIT,
            bar: self.config.bar(),
        }
    }

    async fn fetch(&self, symbol: &Symbol, window: &FetchWindow) -> SourceResult<FetchResult> {
        match *window {
            FetchWindow::FullBackfill => self.request(symbol, MAX_LIMIT).await,
            FetchWindow::Incremental { start, end } => {
                let now = truncate_to_millis(Utc::now());
                if start >= now {
                    return Ok(FetchResult::Empty);
                }

                let earliest = self.lookback().earliest(now);
                if start < earliest {
                    tracing::warn!(
                        symbol = %symbol,
                        "조회 시작 시각이 최대 {}행 범위를 벗어남, 가능한 범위만 조회",
                        MAX_LIMIT
                    );
                }

                let limit = incremental_limit(start, now, self.config.aggregate());
                match self.request(symbol, limit).await? {
                    FetchResult::Series(series) => {
                        Ok(FetchResult::from_series(series.retain_window(start, end)))
                    }
                    FetchResult::Empty => Ok(FetchResult::Empty),
                }
            }
        }
    }
}
