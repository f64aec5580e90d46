//! 갱신 실행 통합 테스트.
//!
//! 실제 벤더 대신 스크립트로 응답하는 데이터 소스를 사용하여
//! 백필/증분/변경 없음/순서 위반/빈 줄/취소 시나리오를 검증합니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use intraday_collector::{run_update, CollectorError, PacingConfig, UpdatePaths};
use intraday_core::{FetchMode, FetchWindow, LookbackLimit, Symbol, TimeSeries, TimeSeriesRow};
use intraday_source::{DataSource, FetchResult, SourceError, SourceResult};
use intraday_store::CsvStore;

const COLUMNS: &[&str] = &["open", "close"];

fn t(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap() + ChronoDuration::minutes(minute)
}

fn columns() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn series(minutes: &[i64]) -> TimeSeries {
    let rows = minutes
        .iter()
        .map(|&m| TimeSeriesRow::new(t(m), vec![m as f64, m as f64 * 2.0]))
        .collect();
    TimeSeries::from_unordered(columns(), rows).unwrap()
}

/// 한 번의 조회에 대한 응답
enum Reply {
    /// 구간과 무관하게 그대로 반환
    Rows(Vec<i64>),
    Empty,
    Fail(&'static str),
    /// HTTP 타임아웃
    TimedOut,
    Panic,
}

/// 스크립트 기반 가짜 데이터 소스.
///
/// 심볼별 스크립트가 남아 있으면 그 응답을, 없으면 보유 이력 중
/// 요청 구간에 속한 행을 반환합니다 (실제 벤더처럼).
#[derive(Default)]
struct FakeSource {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    history: Mutex<HashMap<String, Vec<i64>>>,
    calls: Mutex<Vec<(String, FetchMode)>>,
    cancel_on: Mutex<Option<(String, CancellationToken)>>,
}

impl FakeSource {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn reply(&self, symbol: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back(reply);
    }

    fn set_history(&self, symbol: &str, minutes: &[i64]) {
        self.history
            .lock()
            .unwrap()
            .insert(symbol.to_string(), minutes.to_vec());
    }

    fn cancel_when_fetching(&self, symbol: &str, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((symbol.to_string(), token));
    }

    fn calls(&self) -> Vec<(String, FetchMode)> {
        self.calls.lock().unwrap().clone()
    }

    fn fetched_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.calls().into_iter().map(|(s, _)| s).collect();
        symbols.sort();
        symbols
    }
}

#[async_trait]
impl DataSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn lookback(&self) -> LookbackLimit {
        LookbackLimit::Days(36_500)
    }

    async fn fetch(&self, symbol: &Symbol, window: &FetchWindow) -> SourceResult<FetchResult> {
        let key = symbol.to_string();
        self.calls.lock().unwrap().push((key.clone(), window.mode()));

        if let Some((target, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if *target == key {
                token.cancel();
            }
        }

        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(Reply::Rows(minutes)) => Ok(FetchResult::from_series(series(&minutes))),
            Some(Reply::Empty) => Ok(FetchResult::Empty),
            Some(Reply::Fail(payload)) => Err(SourceError::BadApiRequest {
                payload: payload.to_string(),
            }),
            Some(Reply::TimedOut) => Err(SourceError::Timeout(
                "operation timed out after 30s".to_string(),
            )),
            Some(Reply::Panic) => panic!("vendor exploded"),
            None => {
                let history = self.history.lock().unwrap().get(&key).cloned();
                let Some(minutes) = history else {
                    return Ok(FetchResult::Empty);
                };
                let full = series(&minutes);
                let filtered = match window {
                    FetchWindow::FullBackfill => full,
                    FetchWindow::Incremental { start, end } => full.retain_window(*start, *end),
                };
                Ok(FetchResult::from_series(filtered))
            }
        }
    }
}

/// 임시 디렉터리에 심볼 파일/데이터 디렉터리/로그 파일을 준비
struct Harness {
    _dir: TempDir,
    paths: UpdatePaths,
}

impl Harness {
    fn new(universe: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let paths = UpdatePaths {
            symbol_file: dir.path().join("symbols.txt"),
            data_dir: dir.path().join("data"),
            log_file: dir.path().join("update.log"),
        };
        std::fs::write(&paths.symbol_file, universe).unwrap();
        Self { _dir: dir, paths }
    }

    fn store(&self) -> CsvStore {
        CsvStore::open(&self.paths.data_dir).unwrap()
    }

    fn artifact(&self, symbol: &str) -> PathBuf {
        self.paths.data_dir.join(format!("{symbol}.csv"))
    }

    fn read_artifact(&self, symbol: &str) -> Vec<u8> {
        std::fs::read(self.artifact(symbol)).unwrap()
    }

    fn load(&self, symbol: &str) -> TimeSeries {
        self.store().load(&Symbol::new(symbol).unwrap()).unwrap()
    }

    /// 실행 로그 메시지 (타임스탬프 제외)
    fn log_messages(&self) -> Vec<String> {
        std::fs::read_to_string(&self.paths.log_file)
            .unwrap()
            .lines()
            .map(|line| line[24..].to_string())
            .collect()
    }

    async fn run(&self, source: &Arc<FakeSource>) -> intraday_collector::UpdateStats {
        self.run_with(source, sequential(), CancellationToken::new())
            .await
            .unwrap()
    }

    async fn run_with(
        &self,
        source: &Arc<FakeSource>,
        pacing: PacingConfig,
        cancel: CancellationToken,
    ) -> intraday_collector::Result<intraday_collector::UpdateStats> {
        let source: Arc<dyn DataSource> = source.clone();
        run_update(&self.paths, source, &pacing, cancel).await
    }
}

fn sequential() -> PacingConfig {
    PacingConfig {
        min_interval: Duration::ZERO,
        batch_size: 1,
    }
}

fn concurrent(batch_size: u32) -> PacingConfig {
    PacingConfig {
        min_interval: Duration::from_millis(10),
        batch_size,
    }
}

#[tokio::test]
async fn scenario_a_new_symbol_is_created_from_backfill() {
    let harness = Harness::new("AAA\n");
    let source = FakeSource::new();
    source.reply("AAA", Reply::Rows(vec![1, 2, 3]));

    let stats = harness.run(&source).await;

    assert_eq!(stats.created, 1);
    assert_eq!(stats.rows_written, 3);
    assert!(!stats.cancelled);
    assert_eq!(harness.load("AAA"), series(&[1, 2, 3]));
    assert!(String::from_utf8(harness.read_artifact("AAA"))
        .unwrap()
        .starts_with("datetime,open,close\n"));
    assert_eq!(source.calls(), vec![("AAA".to_string(), FetchMode::FullBackfill)]);
    assert_eq!(
        harness.log_messages(),
        vec!["STARTED UPDATE.", "CREATED: AAA (3 LINES).", "FINISHED UPDATE."]
    );
}

#[tokio::test]
async fn scenario_b_existing_symbol_is_appended() {
    let harness = Harness::new("AAA\n");
    let source = FakeSource::new();
    source.reply("AAA", Reply::Rows(vec![1, 2, 3]));
    source.reply("AAA", Reply::Rows(vec![5, 4]));

    harness.run(&source).await;
    let stats = harness.run(&source).await;

    assert_eq!(stats.appended, 1);
    assert_eq!(stats.rows_written, 2);
    assert_eq!(harness.load("AAA"), series(&[1, 2, 3, 4, 5]));
    assert_eq!(source.calls()[1], ("AAA".to_string(), FetchMode::Incremental));
    assert!(harness
        .log_messages()
        .contains(&"APPENDED 2 LINES TO AAA.".to_string()));
}

#[tokio::test]
async fn scenario_c_empty_result_leaves_artifact_unchanged() {
    let harness = Harness::new("AAA\n");
    let source = FakeSource::new();
    source.reply("AAA", Reply::Rows(vec![1, 2, 3]));
    source.reply("AAA", Reply::Empty);

    harness.run(&source).await;
    let before = harness.read_artifact("AAA");
    let stats = harness.run(&source).await;

    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.rows_written, 0);
    assert_eq!(harness.read_artifact("AAA"), before);
    assert_eq!(harness.load("AAA").len(), 3);
    assert!(harness
        .log_messages()
        .contains(&"NO CHANGE: AAA.".to_string()));
}

#[tokio::test]
async fn scenario_d_overlapping_row_is_rejected() {
    let harness = Harness::new("AAA\n");
    let source = FakeSource::new();
    source.reply("AAA", Reply::Rows(vec![1, 2, 3]));
    source.reply("AAA", Reply::Rows(vec![2]));

    harness.run(&source).await;
    let before = harness.read_artifact("AAA");
    let stats = harness.run(&source).await;

    assert_eq!(stats.errors, 1);
    assert_eq!(harness.read_artifact("AAA"), before);

    let messages = harness.log_messages();
    let error_line = messages
        .iter()
        .find(|m| m.starts_with("ERROR ON AAA: "))
        .expect("error line");
    assert!(error_line.contains("2024-03-01 14:32:00"));
    assert_eq!(messages.last().unwrap(), "FINISHED UPDATE.");
}

#[tokio::test]
async fn scenario_e_empty_line_truncates_universe() {
    let harness = Harness::new("AAA\nBBB\n\nCCC\n");
    let source = FakeSource::new();
    for symbol in ["AAA", "BBB", "CCC"] {
        source.set_history(symbol, &[1, 2]);
    }

    let stats = harness.run(&source).await;

    assert_eq!(stats.total, 2);
    assert_eq!(stats.created, 2);
    assert_eq!(source.fetched_symbols(), vec!["AAA", "BBB"]);
    assert!(!harness.artifact("CCC").exists());
}

#[tokio::test]
async fn second_run_without_new_data_is_idempotent() {
    let harness = Harness::new("AAA\nBBB\n");
    let source = FakeSource::new();
    source.set_history("AAA", &[1, 2, 3]);
    source.set_history("BBB", &[10, 20]);

    let first = harness.run(&source).await;
    assert_eq!(first.created, 2);
    let before_a = harness.read_artifact("AAA");
    let before_b = harness.read_artifact("BBB");

    let second = harness.run(&source).await;

    assert_eq!(second.unchanged, 2);
    assert_eq!(second.rows_written, 0);
    assert_eq!(harness.read_artifact("AAA"), before_a);
    assert_eq!(harness.read_artifact("BBB"), before_b);
}

#[tokio::test]
async fn backfill_only_for_symbols_without_artifact() {
    let harness = Harness::new("AAA\nBBB\n");
    harness
        .store()
        .initialize(&Symbol::new("AAA").unwrap(), &series(&[1, 2]))
        .unwrap();

    let source = FakeSource::new();
    source.set_history("AAA", &[1, 2, 3, 4]);
    source.set_history("BBB", &[1, 2]);

    let stats = harness.run(&source).await;
    assert_eq!(stats.appended, 1);
    assert_eq!(stats.created, 1);
    assert_eq!(
        source.calls(),
        vec![
            ("AAA".to_string(), FetchMode::Incremental),
            ("BBB".to_string(), FetchMode::FullBackfill),
        ]
    );
    assert_eq!(harness.load("AAA"), series(&[1, 2, 3, 4]));

    harness.run(&source).await;
    assert!(source.calls()[2..]
        .iter()
        .all(|(_, mode)| *mode == FetchMode::Incremental));
}

#[tokio::test]
async fn failing_symbol_does_not_stop_the_run() {
    let harness = Harness::new("AAA\nBBB\nCCC\n");
    let source = FakeSource::new();
    source.reply("AAA", Reply::Fail("{\"error\":\"invalid symbol\"}"));
    source.reply("BBB", Reply::Panic);
    source.set_history("CCC", &[1, 2, 3]);

    let stats = harness.run(&source).await;

    assert_eq!(stats.errors, 2);
    assert_eq!(stats.created, 1);
    assert!(!harness.artifact("AAA").exists());
    assert!(!harness.artifact("BBB").exists());
    assert_eq!(harness.load("CCC").len(), 3);

    let messages = harness.log_messages();
    assert!(messages
        .iter()
        .any(|m| m.starts_with("ERROR ON AAA: ") && m.contains("invalid symbol")));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("ERROR ON BBB: ") && m.contains("vendor exploded")));
    assert_eq!(messages.last().unwrap(), "FINISHED UPDATE.");
}

#[tokio::test]
async fn timed_out_fetch_is_an_error_and_the_run_continues() {
    let harness = Harness::new("AAA\nBBB\n");
    let source = FakeSource::new();
    source.reply("AAA", Reply::TimedOut);
    source.set_history("BBB", &[1, 2]);

    let stats = harness.run(&source).await;

    assert_eq!(stats.errors, 1);
    assert_eq!(stats.created, 1);
    assert!(!stats.cancelled);
    assert!(!harness.artifact("AAA").exists());
    assert_eq!(harness.load("BBB").len(), 2);

    let messages = harness.log_messages();
    assert!(messages
        .iter()
        .any(|m| m.starts_with("ERROR ON AAA: Request timeout")));
    assert!(messages.contains(&"CREATED: BBB (2 LINES).".to_string()));
    assert_eq!(messages.last().unwrap(), "FINISHED UPDATE.");
}

#[tokio::test]
async fn concurrent_mode_produces_same_artifacts() {
    let universe = "AAA\nBBB\nCCC\nDDD\nEEE\n";
    let seq_harness = Harness::new(universe);
    let con_harness = Harness::new(universe);

    let make_source = || {
        let source = FakeSource::new();
        for (i, symbol) in ["AAA", "BBB", "CCC", "DDD", "EEE"].iter().enumerate() {
            let minutes: Vec<i64> = (0..=(i as i64 + 1)).collect();
            source.set_history(symbol, &minutes);
        }
        source.reply("CCC", Reply::Fail("rejected"));
        source
    };

    let seq = seq_harness.run(&make_source()).await;
    let con = con_harness
        .run_with(&make_source(), concurrent(2), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(seq.created, con.created);
    assert_eq!(seq.errors, con.errors);
    assert_eq!(seq.rows_written, con.rows_written);
    for symbol in ["AAA", "BBB", "DDD", "EEE"] {
        assert_eq!(
            seq_harness.read_artifact(symbol),
            con_harness.read_artifact(symbol)
        );
    }
}

#[tokio::test]
async fn cancellation_finishes_current_symbol_then_stops() {
    let harness = Harness::new("AAA\nBBB\nCCC\n");
    let cancel = CancellationToken::new();
    let source = FakeSource::new();
    for symbol in ["AAA", "BBB", "CCC"] {
        source.set_history(symbol, &[1, 2]);
    }
    source.cancel_when_fetching("BBB", cancel.clone());

    let stats = harness
        .run_with(&source, sequential(), cancel)
        .await
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.created, 2);
    // 취소 신호 중에 처리하던 심볼의 쓰기는 완료됨
    assert_eq!(harness.load("BBB").len(), 2);
    assert!(!harness.artifact("CCC").exists());
    assert_eq!(harness.log_messages().last().unwrap(), "CANCELLED UPDATE.");
}

#[tokio::test]
async fn cancellation_stops_concurrent_dispatch() {
    let harness = Harness::new("AAA\nBBB\nCCC\nDDD\n");
    let cancel = CancellationToken::new();
    let source = FakeSource::new();
    for symbol in ["AAA", "BBB", "CCC", "DDD"] {
        source.set_history(symbol, &[1]);
    }
    source.cancel_when_fetching("AAA", cancel.clone());

    let stats = harness
        .run_with(&source, concurrent(2), cancel)
        .await
        .unwrap();

    assert!(stats.cancelled);
    assert!(stats.processed() < 4);
    assert!(!harness.artifact("DDD").exists());
}

#[tokio::test]
async fn cancelled_before_start_processes_nothing() {
    let harness = Harness::new("AAA\n");
    let source = FakeSource::new();
    source.set_history("AAA", &[1]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = harness
        .run_with(&source, sequential(), cancel)
        .await
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.processed(), 0);
    assert!(source.calls().is_empty());
    assert_eq!(
        harness.log_messages(),
        vec!["STARTED UPDATE.", "CANCELLED UPDATE."]
    );
}

#[tokio::test]
async fn missing_universe_aborts_the_run() {
    let harness = Harness::new("AAA\n");
    std::fs::remove_file(&harness.paths.symbol_file).unwrap();

    let err = harness
        .run_with(&FakeSource::new(), sequential(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CollectorError::Universe { .. }));
    let messages = harness.log_messages();
    assert_eq!(messages[0], "STARTED UPDATE.");
    assert!(messages[1].starts_with("ABORTED UPDATE: "));
}

#[tokio::test]
async fn unusable_data_dir_aborts_the_run() {
    let harness = Harness::new("AAA\n");
    std::fs::write(&harness.paths.data_dir, "not a directory").unwrap();

    let err = harness
        .run_with(&FakeSource::new(), sequential(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CollectorError::Store(_)));
}

#[tokio::test(start_paused = true)]
async fn sequential_mode_paces_symbols() {
    let harness = Harness::new("AAA\nBBB\nCCC\n");
    let source = FakeSource::new();
    let pacing = PacingConfig {
        min_interval: Duration::from_millis(500),
        batch_size: 1,
    };

    let start = tokio::time::Instant::now();
    let stats = harness
        .run_with(&source, pacing, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.unchanged, 3);
    assert!(tokio::time::Instant::now() - start >= Duration::from_secs(1));
}
