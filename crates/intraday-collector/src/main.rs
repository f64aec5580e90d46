//! Intraday collector CLI.

use anyhow::Context;
use clap::Parser;
use intraday_collector::{run_update, Cli, CollectorConfig};
use intraday_core::{init_logging, LogConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env를 먼저 읽어야 LOG_FORMAT/RUST_LOG가 반영됨
    let mut config = CollectorConfig::from_env().context("설정 로드 실패")?;

    init_logging(LogConfig::new(cli.log_level.as_str()).with_env_format())
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {e}"))?;

    let cwd = std::env::current_dir().context("현재 디렉터리 확인 실패")?;
    cli.apply(&mut config, &cwd);
    tracing::debug!(
        symbol_file = %config.paths.symbol_file.display(),
        data_dir = %config.paths.data_dir.display(),
        log_file = %config.paths.log_file.display(),
        source = %config.source,
        "설정 로드 완료"
    );

    let source = config.build_source().context("데이터 소스 생성 실패")?;

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("종료 신호 수신, 진행 중인 심볼을 마친 뒤 중단합니다");
            signal.cancel();
        }
    });

    let stats = run_update(&config.paths, source, &config.pacing, cancel)
        .await
        .context("갱신 실행 실패")?;
    stats.log_summary();

    Ok(())
}
