//! 주식 가격 이력 소스 (price-history REST API).
//!
//! `GET {base_url}/{SYMBOL}/pricehistory` 엔드포인트에서 분봉 또는 일봉
//! 캔들을 조회합니다. 응답 캔들의 `datetime`은 밀리초 epoch입니다.
//!
//! 응답 형식:
//! - 정상: `{"candles":[...], "symbol":"AAPL", "empty":false}`
//! - 데이터 없음: `{"candles":[], "empty":true}`
//! - 요청 거부: `{"error":"..."}` (HTTP 200 또는 4xx)

use crate::error::{SourceError, SourceResult};
use crate::http::{build_client, read_body};
use crate::traits::{owned_columns, DataSource, FetchResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intraday_core::{
    format_timestamp, from_epoch_millis, to_epoch_millis, truncate_to_millis, FetchWindow,
    LookbackLimit, Symbol, TimeSeries, TimeSeriesRow,
};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// 주식 소스 컬럼.
pub const EQUITY_COLUMNS: &[&str] = &["open", "high", "low", "close", "volume"];

/// 기본 API 주소.
pub const DEFAULT_EQUITY_BASE_URL: &str = "https://api.tdameritrade.com/v1/marketdata";

/// 분봉 최대 조회 일수 (달력 기준).
pub const DEFAULT_MINUTE_LOOKBACK_DAYS: u32 = 30;

/// 일봉 최대 조회 일수 (약 20년).
pub const DEFAULT_DAILY_LOOKBACK_DAYS: u32 = 20 * 365;

/// 설정 가능한 최대 조회 일수 (약 100년).
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

// ============================================================================
// 조회 주기
// ============================================================================

/// 캔들 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EquityFrequency {
    /// 1분봉
    #[default]
    Minute,
    /// 일봉
    Daily,
}

impl EquityFrequency {
    /// `frequencyType` 파라미터 값.
    pub fn frequency_type(&self) -> &'static str {
        match self {
            EquityFrequency::Minute => "minute",
            EquityFrequency::Daily => "daily",
        }
    }

    /// 시작/종료일과 함께 보내야 하는 `periodType` 값.
    pub fn period_type(&self) -> Option<&'static str> {
        match self {
            EquityFrequency::Minute => None,
            EquityFrequency::Daily => Some("month"),
        }
    }

    /// 기본 최대 조회 일수.
    pub fn default_lookback_days(&self) -> u32 {
        match self {
            EquityFrequency::Minute => DEFAULT_MINUTE_LOOKBACK_DAYS,
            EquityFrequency::Daily => DEFAULT_DAILY_LOOKBACK_DAYS,
        }
    }
}

// ============================================================================
// 설정
// ============================================================================

/// 주식 소스 설정.
///
/// [`EquityConfig::builder`]로만 생성되며 생성 후에는 변경할 수 없습니다.
#[derive(Debug)]
pub struct EquityConfig {
    base_url: Url,
    api_key: SecretString,
    frequency: EquityFrequency,
    need_extended_hours: bool,
    max_lookback_days: u32,
    timeout: Duration,
}

impl EquityConfig {
    /// 설정 빌더를 생성합니다.
    pub fn builder(api_key: impl Into<String>) -> EquityConfigBuilder {
        EquityConfigBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_EQUITY_BASE_URL.to_string(),
            frequency: EquityFrequency::default(),
            need_extended_hours: true,
            max_lookback_days: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn frequency(&self) -> EquityFrequency {
        self.frequency
    }

    pub fn need_extended_hours(&self) -> bool {
        self.need_extended_hours
    }

    pub fn max_lookback_days(&self) -> u32 {
        self.max_lookback_days
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// [`EquityConfig`] 빌더.
#[derive(Debug, Clone)]
pub struct EquityConfigBuilder {
    api_key: String,
    base_url: String,
    frequency: EquityFrequency,
    need_extended_hours: bool,
    max_lookback_days: Option<u32>,
    timeout: Duration,
}

impl EquityConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn frequency(mut self, frequency: EquityFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn need_extended_hours(mut self, enabled: bool) -> Self {
        self.need_extended_hours = enabled;
        self
    }

    /// 최대 조회 일수 (미설정 시 주기별 기본값).
    pub fn max_lookback_days(mut self, days: u32) -> Self {
        self.max_lookback_days = Some(days);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 모든 필드를 한 번에 검증하고 설정을 생성합니다.
    pub fn build(self) -> SourceResult<EquityConfig> {
        let mut problems = Vec::new();

        if self.api_key.trim().is_empty() {
            problems.push("API key is empty".to_string());
        }
        let base_url = match Url::parse(self.base_url.trim_end_matches('/')) {
            Ok(url) => Some(url),
            Err(e) => {
                problems.push(format!("invalid base URL {:?}: {}", self.base_url, e));
                None
            }
        };
        let max_lookback_days = self
            .max_lookback_days
            .unwrap_or_else(|| self.frequency.default_lookback_days());
        if !(1..=MAX_LOOKBACK_DAYS).contains(&max_lookback_days) {
            problems.push(format!(
                "max lookback days must be within 1..={}: {}",
                MAX_LOOKBACK_DAYS, max_lookback_days
            ));
        }
        if self.timeout.is_zero() {
            problems.push("timeout must be positive".to_string());
        }

        match base_url {
            Some(base_url) if problems.is_empty() => Ok(EquityConfig {
                base_url,
                api_key: SecretString::new(self.api_key.into()),
                frequency: self.frequency,
                need_extended_hours: self.need_extended_hours,
                max_lookback_days,
                timeout: self.timeout,
            }),
            _ => Err(SourceError::InvalidRequest(problems.join("; "))),
        }
    }
}

// ============================================================================
// 요청 파라미터
// ============================================================================

/// 검증된 price-history 요청 파라미터.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceHistoryRequest {
    symbol: Symbol,
    frequency_type: &'static str,
    frequency: u32,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    period_type: Option<&'static str>,
    period: Option<u32>,
    need_extended_hours: bool,
}

impl PriceHistoryRequest {
    /// 요청 빌더를 생성합니다.
    pub fn builder(symbol: Symbol) -> PriceHistoryRequestBuilder {
        PriceHistoryRequestBuilder {
            symbol,
            frequency_type: EquityFrequency::Minute.frequency_type(),
            frequency: 1,
            start: None,
            end: None,
            period_type: None,
            period: None,
            need_extended_hours: false,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// 설정된 값만 담은 쿼리 파라미터 (API 키 제외).
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("frequencyType", self.frequency_type.to_string()),
            ("frequency", self.frequency.to_string()),
            ("needExtendedHoursData", self.need_extended_hours.to_string()),
        ];

        if let Some(start) = self.start {
            params.push(("startDate", to_epoch_millis(&start).to_string()));
        }
        if let Some(end) = self.end {
            params.push(("endDate", to_epoch_millis(&end).to_string()));
        }
        if let Some(period_type) = self.period_type {
            params.push(("periodType", period_type.to_string()));
        }
        if let Some(period) = self.period {
            params.push(("period", period.to_string()));
        }

        params
    }
}

/// [`PriceHistoryRequest`] 빌더.
#[derive(Debug, Clone)]
pub struct PriceHistoryRequestBuilder {
    symbol: Symbol,
    frequency_type: &'static str,
    frequency: u32,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    period_type: Option<&'static str>,
    period: Option<u32>,
    need_extended_hours: bool,
}

impl PriceHistoryRequestBuilder {
    /// 주기 설정 (`frequencyType`, 필요 시 `periodType`).
    pub fn frequency(mut self, frequency: EquityFrequency, every: u32) -> Self {
        self.frequency_type = frequency.frequency_type();
        self.frequency = every;
        self.period_type = frequency.period_type();
        self
    }

    pub fn window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn period(mut self, period_type: &'static str, period: u32) -> Self {
        self.period_type = Some(period_type);
        self.period = Some(period);
        self
    }

    pub fn need_extended_hours(mut self, enabled: bool) -> Self {
        self.need_extended_hours = enabled;
        self
    }

    /// 모든 필드를 한 번에 검증하고 요청을 생성합니다.
    pub fn build(self) -> SourceResult<PriceHistoryRequest> {
        let mut problems = Vec::new();

        if self.frequency == 0 {
            problems.push("frequency must be at least 1".to_string());
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                problems.push(format!(
                    "start ({}) is not before end ({})",
                    format_timestamp(&start),
                    format_timestamp(&end)
                ));
            }
        }
        if self.period.is_some() && self.period_type.is_none() {
            problems.push("period requires periodType".to_string());
        }
        if self.start.is_none() && self.end.is_none() && self.period.is_none() {
            problems.push("either startDate/endDate or period is required".to_string());
        }

        if !problems.is_empty() {
            return Err(SourceError::InvalidRequest(problems.join("; ")));
        }

        Ok(PriceHistoryRequest {
            symbol: self.symbol,
            frequency_type: self.frequency_type,
            frequency: self.frequency,
            start: self.start,
            end: self.end,
            period_type: self.period_type,
            period: self.period,
            need_extended_hours: self.need_extended_hours,
        })
    }
}

// ============================================================================
// 응답 구조
// ============================================================================

#[derive(Debug, Deserialize)]
struct PriceHistoryResponse {
    #[serde(default)]
    candles: Vec<Candle>,
    #[serde(default)]
    empty: bool,
}

#[derive(Debug, Deserialize)]
struct Candle {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    datetime: i64,
}

impl Candle {
    /// 모든 값이 있는 캔들만 행으로 변환합니다.
    fn into_row(self) -> SourceResult<Option<TimeSeriesRow>> {
        let values = match (self.open, self.high, self.low, self.close, self.volume) {
            (Some(o), Some(h), Some(l), Some(c), Some(v)) => vec![o, h, l, c, v],
            _ => return Ok(None),
        };
        let timestamp = from_epoch_millis(self.datetime)?;
        Ok(Some(TimeSeriesRow::new(timestamp, values)))
    }
}

// ============================================================================
// 데이터 소스
// ============================================================================

/// 주식 분봉/일봉 데이터 소스.
pub struct EquityIntradaySource {
    config: EquityConfig,
    client: Client,
}

impl EquityIntradaySource {
    /// 새 주식 데이터 소스 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `SourceError::NetworkError`를 반환합니다.
    pub fn new(config: EquityConfig) -> SourceResult<Self> {
        let client = build_client(config.timeout())?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EquityConfig {
        &self.config
    }

    /// 조회 구간을 벤더 한도에 맞춰 요청으로 변환합니다.
    ///
    /// 요청 가능한 구간이 남지 않으면 `None`.
    pub fn plan_request(
        &self,
        symbol: &Symbol,
        window: &FetchWindow,
        now: DateTime<Utc>,
    ) -> SourceResult<Option<PriceHistoryRequest>> {
        let earliest = self.lookback().earliest(now);
        let (start, end) = match *window {
            FetchWindow::FullBackfill => (earliest, now),
            FetchWindow::Incremental { start, end } => (start.max(earliest), end.min(now)),
        };

        if start >= end {
            return Ok(None);
        }

        PriceHistoryRequest::builder(symbol.clone())
            .frequency(self.config.frequency(), 1)
            .window(start, end)
            .need_extended_hours(self.config.need_extended_hours())
            .build()
            .map(Some)
    }

    /// `{base_url}/{SYMBOL}/pricehistory` 주소를 만듭니다.
    ///
    /// 심볼은 경로 세그먼트 하나로 인코딩되므로 `?`, `#`, `%`, 공백이 있어도
    /// 다른 엔드포인트를 가리키지 않습니다.
    pub fn endpoint_for(&self, symbol: &Symbol) -> SourceResult<Url> {
        let mut url = self.config.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| {
                SourceError::InvalidRequest(format!(
                    "base URL cannot carry a path: {}",
                    self.config.base_url()
                ))
            })?
            .pop_if_empty()
            .push(symbol.as_str())
            .push("pricehistory");
        Ok(url)
    }

    /// 요청을 실행하고 응답을 정규화합니다.
    pub async fn execute(&self, request: &PriceHistoryRequest) -> SourceResult<FetchResult> {
        let url = self.endpoint_for(request.symbol())?;

        let mut params = vec![("apikey", self.config.api_key.expose_secret().to_string())];
        params.extend(request.query_params());

        tracing::debug!(
            symbol = %request.symbol(),
            start = ?request.start().map(|t| format_timestamp(&t)),
            end = ?request.end().map(|t| format_timestamp(&t)),
            "price-history 요청"
        );

        let response = self.client.get(url).query(&params).send().await?;
        let body = read_body(response).await?;

        parse_price_history(&body)
    }
}

/// price-history 응답 본문을 정규화된 결과로 변환합니다.
fn parse_price_history(body: &str) -> SourceResult<FetchResult> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if value.get("error").is_some() {
        tracing::error!(payload = body, "벤더가 요청을 거부함");
        return Err(SourceError::BadApiRequest {
            payload: body.to_string(),
        });
    }

    let response: PriceHistoryResponse = serde_json::from_value(value)?;
    if response.empty || response.candles.is_empty() {
        return Ok(FetchResult::Empty);
    }

    let mut rows = Vec::with_capacity(response.candles.len());
    for candle in response.candles {
        if let Some(row) = candle.into_row()? {
            rows.push(row);
        }
    }

    let series = TimeSeries::from_unordered(owned_columns(EQUITY_COLUMNS), rows)?;
    Ok(FetchResult::from_series(series))
}

#[async_trait]
impl DataSource for EquityIntradaySource {
    fn name(&self) -> &'static str {
        match self.config.frequency() {
            EquityFrequency::Minute => "equity",
            EquityFrequency::Daily => "equity-daily",
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        EQUITY_COLUMNS
    }

    fn lookback(&self) -> LookbackLimit {
        LookbackLimit::Days(self.config.max_lookback_days())
    }

    async fn fetch(&self, symbol: &Symbol, window: &FetchWindow) -> SourceResult<FetchResult> {
        let now = truncate_to_millis(Utc::now());

        let Some(request) = self.plan_request(symbol, window, now)? else {
            tracing::debug!(symbol = %symbol, "요청 가능한 구간 없음");
            return Ok(FetchResult::Empty);
        };

        let result = self.execute(&request).await?;

        match (result, window) {
            (FetchResult::Series(series), FetchWindow::Incremental { .. }) => {
                let (Some(start), Some(end)) = (request.start(), request.end()) else {
                    return Ok(FetchResult::Series(series));
                };
                Ok(FetchResult::from_series(series.retain_window(start, end)))
            }
            (result, _) => Ok(result),
        }
    }
}
