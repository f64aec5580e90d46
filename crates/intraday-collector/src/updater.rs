//! 갱신 실행기.
//!
//! 심볼마다 다음 상태 중 하나로 끝납니다:
//!
//! 1. 저장된 마지막 시각 조회
//! 2. 없으면 백필 조회 후 파일 생성 → `CREATED`
//! 3. 있으면 증분 조회 후 추가 → `APPENDED`
//! 4. 새 데이터가 없으면 → `NO CHANGE`
//! 5. 어느 단계든 실패하면 → `ERROR` (다음 심볼은 계속 처리)

use crate::config::{PacingConfig, UpdatePaths};
use crate::error::{Result, UpdateError};
use crate::run_log::{self, RunLog};
use crate::stats::UpdateStats;
use crate::universe::load_universe;
use chrono::Utc;
use futures::FutureExt;
use intraday_core::{resolve, FetchWindow, Resolution, Symbol, UpdateOutcome};
use intraday_source::{
    pull_concurrent_until, DataSource, FetchResult, RateLimitConfig, RateLimiter,
};
use intraday_store::CsvStore;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// 한 번의 실행을 담당하는 갱신기
pub struct Updater {
    source: Arc<dyn DataSource>,
    store: CsvStore,
    run_log: Arc<RunLog>,
}

impl Updater {
    pub fn new(source: Arc<dyn DataSource>, store: CsvStore, run_log: Arc<RunLog>) -> Self {
        Self {
            source,
            store,
            run_log,
        }
    }

    /// 심볼 하나를 갱신하고 결과를 실행 로그에 남깁니다.
    ///
    /// 에러와 패닉은 모두 `UpdateOutcome::Error`로 바뀌며 호출자에게 전파되지 않습니다.
    pub async fn update_symbol(&self, symbol: &Symbol) -> UpdateOutcome {
        let span = tracing::info_span!("update", symbol = %symbol, source = self.source.name());

        let outcome = async {
            match AssertUnwindSafe(self.try_update(symbol)).catch_unwind().await {
                Ok(Ok(outcome)) => {
                    tracing::info!(outcome = %outcome, "갱신 완료");
                    outcome
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, retryable = e.is_retryable(), "갱신 실패");
                    UpdateOutcome::Error {
                        cause: e.to_string(),
                    }
                }
                Err(panic) => {
                    let e = UpdateError::Panicked(panic_message(panic.as_ref()));
                    tracing::error!(error = %e, "갱신 중 패닉");
                    UpdateOutcome::Error {
                        cause: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await;

        self.run_log.record(&outcome.log_message(symbol));
        outcome
    }

    async fn try_update(&self, symbol: &Symbol) -> std::result::Result<UpdateOutcome, UpdateError> {
        let key = symbol.clone();
        let last = store_task(&self.store, move |store| store.last_timestamp(&key)).await?;

        let window = match resolve(last, Utc::now(), &self.source.lookback()) {
            Resolution::Fetch(window) => window,
            Resolution::UpToDate => {
                tracing::debug!("새 데이터 없음, 조회 생략");
                return Ok(UpdateOutcome::NoChange);
            }
        };
        tracing::debug!(window = %window, "조회 시작");

        let series = match self.source.fetch(symbol, &window).await? {
            FetchResult::Series(series) if !series.is_empty() => series,
            _ => return Ok(UpdateOutcome::NoChange),
        };

        let key = symbol.clone();
        let outcome = match window {
            FetchWindow::FullBackfill => UpdateOutcome::Created {
                rows: store_task(&self.store, move |store| store.initialize(&key, &series)).await?,
            },
            FetchWindow::Incremental { .. } => UpdateOutcome::Appended {
                rows: store_task(&self.store, move |store| store.append(&key, &series)).await?,
            },
        };
        Ok(outcome)
    }

    /// 심볼 목록 전체를 갱신합니다.
    ///
    /// 취소되면 새 심볼을 시작하지 않고, 진행 중인 심볼은 끝까지 처리합니다.
    pub async fn run(
        self: &Arc<Self>,
        symbols: &[Symbol],
        pacing: &PacingConfig,
        cancel: &CancellationToken,
    ) -> UpdateStats {
        let mut stats = UpdateStats::new(symbols.len());

        if pacing.is_sequential() {
            let limiter = RateLimiter::new(RateLimitConfig::min_interval(pacing.min_interval));

            for (idx, symbol) in symbols.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = limiter.acquire() => {}
                }

                tracing::debug!(
                    symbol = %symbol,
                    progress = format!("{}/{}", idx + 1, symbols.len()),
                    "갱신 시작"
                );
                let outcome = self.update_symbol(symbol).await;
                stats.record(&outcome);
            }
        } else {
            let limiter = RateLimiter::new(RateLimitConfig::new(
                pacing.batch_size,
                pacing.min_interval,
            ));

            let outcomes = pull_concurrent_until(
                symbols,
                |symbol: Symbol, updater: Arc<Updater>| async move {
                    updater.update_symbol(&symbol).await
                },
                Arc::clone(self),
                &limiter,
                cancel,
            )
            .await;

            for outcome in outcomes.values() {
                stats.record(outcome);
            }
        }

        stats.cancelled = stats.processed() < symbols.len();
        stats
    }
}

/// 한 번의 갱신 실행.
///
/// 실행 로그를 가장 먼저 열고, 심볼 목록과 데이터 디렉터리를 준비한 뒤
/// 심볼별로 갱신합니다. 준비 단계 실패만 에러로 반환되고, 심볼별 실패는
/// 통계와 실행 로그에만 반영됩니다.
pub async fn run_update(
    paths: &UpdatePaths,
    source: Arc<dyn DataSource>,
    pacing: &PacingConfig,
    cancel: CancellationToken,
) -> Result<UpdateStats> {
    let start = Instant::now();

    let log = Arc::new(RunLog::open(&paths.log_file)?);
    log.record(run_log::STARTED);

    let (symbols, store) = match prepare(paths) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!(error = %e, "갱신 준비 실패");
            log.record(&run_log::aborted(&e));
            return Err(e);
        }
    };

    tracing::info!(
        symbols = symbols.len(),
        source = source.name(),
        data_dir = %store.data_dir().display(),
        batch_size = pacing.batch_size,
        min_interval_ms = pacing.min_interval.as_millis() as u64,
        "갱신 시작"
    );

    let updater = Arc::new(Updater::new(source, store, Arc::clone(&log)));
    let mut stats = updater.run(&symbols, pacing, &cancel).await;
    stats.elapsed = start.elapsed();

    if stats.cancelled {
        tracing::warn!(
            processed = stats.processed(),
            total = stats.total,
            "취소되어 갱신 중단"
        );
        log.record(run_log::CANCELLED);
    } else {
        log.record(run_log::FINISHED);
    }

    Ok(stats)
}

fn prepare(paths: &UpdatePaths) -> Result<(Vec<Symbol>, CsvStore)> {
    let symbols = load_universe(&paths.symbol_file)?;
    let store = CsvStore::open(&paths.data_dir)?;
    Ok((symbols, store))
}

/// 저장소 작업을 blocking thread pool에서 실행합니다.
///
/// 파일 I/O와 `sync_data`가 런타임 worker thread를 막지 않도록 합니다.
/// 작업 중 패닉은 호출자에게 그대로 다시 발생시킵니다.
async fn store_task<T, F>(store: &CsvStore, op: F) -> std::result::Result<T, UpdateError>
where
    F: FnOnce(&CsvStore) -> intraday_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    let span = tracing::Span::current();

    match tokio::task::spawn_blocking(move || span.in_scope(|| op(&store))).await {
        Ok(result) => Ok(result?),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(UpdateError::Join(e)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
