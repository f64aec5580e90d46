//! 환경변수 기반 설정 모듈.

use crate::error::{CollectorError, Result};
use intraday_source::{
    CryptoConfig, CryptoIntradaySource, DataSource, EquityConfig, EquityFrequency,
    EquityIntradaySource, SourceKind,
};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug)]
pub struct CollectorConfig {
    /// 실행 파일 경로 기본값
    pub paths: UpdatePaths,
    /// 사용할 데이터 소스
    pub source: SourceKind,
    /// 요청 간격 설정
    pub pacing: PacingConfig,
    /// 주식 소스 설정
    pub equity: EquitySettings,
    /// 암호화폐 소스 설정
    pub crypto: CryptoSettings,
    /// HTTP 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
}

/// 한 번의 실행에 필요한 세 경로
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePaths {
    /// 심볼 목록 파일
    pub symbol_file: PathBuf,
    /// 심볼별 CSV 디렉터리
    pub data_dir: PathBuf,
    /// 실행 로그 파일
    pub log_file: PathBuf,
}

impl Default for UpdatePaths {
    fn default() -> Self {
        Self {
            symbol_file: PathBuf::from("symbols.txt"),
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("update.log"),
        }
    }
}

/// 요청 간격 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// 연속 요청 사이 최소 간격
    pub min_interval: Duration,
    /// 간격당 동시에 보낼 요청 수 (1이면 순차 실행)
    pub batch_size: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            batch_size: 1,
        }
    }
}

impl PacingConfig {
    pub fn is_sequential(&self) -> bool {
        self.batch_size <= 1
    }
}

/// 주식 소스 설정
#[derive(Debug)]
pub struct EquitySettings {
    /// API 키 (주식 소스 사용 시 필수)
    pub api_key: Option<SecretString>,
    /// 기본 URL (미설정 시 소스 기본값)
    pub base_url: Option<String>,
    /// 최대 조회 일수 (미설정 시 주기별 기본값)
    pub max_lookback_days: Option<u32>,
    /// 장외 시간 데이터 포함 여부
    pub extended_hours: bool,
}

/// 암호화폐 소스 설정
#[derive(Debug)]
pub struct CryptoSettings {
    /// 엔드포인트 (미설정 시 소스 기본값)
    pub endpoint: Option<String>,
    /// 비교 통화
    pub comparison_symbol: String,
    /// 봉 묶음 단위 (분)
    pub aggregate: u32,
    /// API 키 (선택)
    pub api_key: Option<SecretString>,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 주어진 조회 함수로 설정을 만듭니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = UpdatePaths::default();

        let source = match env.get("DATA_SOURCE") {
            Some(value) => value
                .parse::<SourceKind>()
                .map_err(|e| CollectorError::Config(format!("DATA_SOURCE: {}", e)))?,
            None => SourceKind::Equity,
        };

        Ok(Self {
            paths: UpdatePaths {
                symbol_file: env.get("SYMBOL_FILE_PATH").map_or(defaults.symbol_file, PathBuf::from),
                data_dir: env.get("DATA_DIR_PATH").map_or(defaults.data_dir, PathBuf::from),
                log_file: env.get("LOG_FILE_PATH").map_or(defaults.log_file, PathBuf::from),
            },
            source,
            pacing: PacingConfig {
                min_interval: Duration::from_millis(env.parse("UPDATE_MIN_INTERVAL_MS", 500)),
                batch_size: env.parse("UPDATE_BATCH_SIZE", 1u32).max(1),
            },
            equity: EquitySettings {
                api_key: env.secret("EQUITY_API_KEY"),
                base_url: env.get("EQUITY_BASE_URL"),
                max_lookback_days: env.get("EQUITY_MAX_LOOKBACK_DAYS").and_then(|v| v.parse().ok()),
                extended_hours: env.bool("EQUITY_EXTENDED_HOURS", true),
            },
            crypto: CryptoSettings {
                endpoint: env.get("CRYPTO_ENDPOINT"),
                comparison_symbol: env
                    .get("CRYPTO_COMPARISON_SYMBOL")
                    .unwrap_or_else(|| "USD".to_string()),
                aggregate: env.parse("CRYPTO_AGGREGATE", 1),
                api_key: env.secret("CRYPTO_API_KEY"),
            },
            http_timeout_secs: env.parse("HTTP_TIMEOUT_SECS", 30),
        })
    }

    /// HTTP 타임아웃을 Duration으로 반환
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// 설정된 데이터 소스를 생성합니다.
    pub fn build_source(&self) -> Result<Arc<dyn DataSource>> {
        let source: Arc<dyn DataSource> = match self.source {
            SourceKind::Equity => Arc::new(self.equity_source(EquityFrequency::Minute)?),
            SourceKind::EquityDaily => Arc::new(self.equity_source(EquityFrequency::Daily)?),
            SourceKind::Crypto => {
                let mut builder = CryptoConfig::builder()
                    .comparison_symbol(self.crypto.comparison_symbol.clone())
                    .aggregate(self.crypto.aggregate)
                    .api_key(
                        self.crypto
                            .api_key
                            .as_ref()
                            .map(|key| key.expose_secret().to_string()),
                    )
                    .timeout(self.http_timeout());
                if let Some(endpoint) = &self.crypto.endpoint {
                    builder = builder.endpoint(endpoint.clone());
                }
                Arc::new(CryptoIntradaySource::new(builder.build()?)?)
            }
        };

        tracing::debug!(source = source.name(), "데이터 소스 생성");
        Ok(source)
    }

    fn equity_source(&self, frequency: EquityFrequency) -> Result<EquityIntradaySource> {
        let api_key = self.equity.api_key.as_ref().ok_or_else(|| {
            CollectorError::Config(format!(
                "EQUITY_API_KEY is not set (DATA_SOURCE={})",
                self.source
            ))
        })?;

        let mut builder = EquityConfig::builder(api_key.expose_secret())
            .frequency(frequency)
            .need_extended_hours(self.equity.extended_hours)
            .timeout(self.http_timeout());
        if let Some(base_url) = &self.equity.base_url {
            builder = builder.base_url(base_url.clone());
        }
        if let Some(days) = self.equity.max_lookback_days {
            builder = builder.max_lookback_days(days);
        }

        Ok(EquityIntradaySource::new(builder.build()?)?)
    }
}

/// 환경변수 조회 도우미
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 값이 비어 있지 않을 때만 반환
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// 값을 파싱 (실패 시 기본값 사용)
    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %value, "설정값 파싱 실패, 기본값 사용");
                default
            }),
            None => default,
        }
    }

    /// bool 값 파싱
    fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(default)
    }

    fn secret(&self, key: &str) -> Option<SecretString> {
        self.get(key).map(|v| SecretString::new(v.into()))
    }
}
