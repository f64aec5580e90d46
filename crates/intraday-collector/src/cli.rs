//! 명령행 인자.
//!
//! 세 경로는 위치 인자 또는 키워드 인자(`-s`, `-d`, `-l`) 중 한 가지 형식으로만
//! 줄 수 있습니다. 두 형식을 섞으면 사용법 에러가 됩니다.

use crate::config::{CollectorConfig, UpdatePaths};
use clap::Parser;
use intraday_source::SourceKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const KEYWORD_PATHS: [&str; 3] = ["symbols", "data_dir", "log_file"];

#[derive(Debug, Parser)]
#[command(name = "intraday-collector")]
#[command(about = "Incremental intraday price-history updater", long_about = None)]
#[command(version)]
pub struct Cli {
    /// 심볼 목록 파일
    #[arg(value_name = "SYMBOL_FILE", conflicts_with_all = KEYWORD_PATHS)]
    pub symbol_file: Option<PathBuf>,

    /// 심볼별 CSV 디렉터리
    #[arg(value_name = "DATA_DIR", conflicts_with_all = KEYWORD_PATHS)]
    pub data_dir_arg: Option<PathBuf>,

    /// 실행 로그 파일
    #[arg(value_name = "LOG_FILE", conflicts_with_all = KEYWORD_PATHS)]
    pub log_file_arg: Option<PathBuf>,

    /// 심볼 목록 파일 (키워드 형식)
    #[arg(short = 's', long = "symbols", value_name = "PATH")]
    pub symbols: Option<PathBuf>,

    /// 심볼별 CSV 디렉터리 (키워드 형식)
    #[arg(short = 'd', long = "data-dir", value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// 실행 로그 파일 (키워드 형식)
    #[arg(short = 'l', long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// 데이터 소스 (equity, equity-daily, crypto)
    #[arg(long)]
    pub source: Option<SourceKind>,

    /// 간격당 동시 요청 수 (1이면 순차 실행)
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// 연속 요청 사이 최소 간격 (밀리초)
    #[arg(long)]
    pub min_interval_ms: Option<u64>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// 인자로 준 경로를 설정 기본값 위에 덮고, 상대 경로는 `cwd` 기준으로 바꿉니다.
    pub fn resolve_paths(&self, defaults: &UpdatePaths, cwd: &Path) -> UpdatePaths {
        let pick = |positional: &Option<PathBuf>, keyword: &Option<PathBuf>, default: &PathBuf| {
            let path = positional.as_ref().or(keyword.as_ref()).unwrap_or(default);
            cwd.join(path)
        };

        UpdatePaths {
            symbol_file: pick(&self.symbol_file, &self.symbols, &defaults.symbol_file),
            data_dir: pick(&self.data_dir_arg, &self.data_dir, &defaults.data_dir),
            log_file: pick(&self.log_file_arg, &self.log_file, &defaults.log_file),
        }
    }

    /// 명령행 옵션을 설정에 반영합니다.
    pub fn apply(&self, config: &mut CollectorConfig, cwd: &Path) {
        config.paths = self.resolve_paths(&config.paths, cwd);

        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(batch_size) = self.batch_size {
            config.pacing.batch_size = batch_size.max(1);
        }
        if let Some(ms) = self.min_interval_ms {
            config.pacing.min_interval = Duration::from_millis(ms);
        }
    }
}
