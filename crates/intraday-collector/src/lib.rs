//! 심볼 목록의 가격 시계열 증분 갱신기.
//!
//! 이 crate는 데이터 소스와 저장소를 묶어 한 번의 갱신 실행을 수행합니다:
//! - 심볼 목록 파일 로드
//! - 심볼별 백필/증분 갱신 (실패 격리, 요청 간격 조절)
//! - 실행 로그 파일 기록
//! - 환경변수 설정 및 CLI

pub mod cli;
pub mod config;
pub mod error;
pub mod run_log;
pub mod stats;
pub mod universe;
pub mod updater;

pub use cli::Cli;
pub use config::{CollectorConfig, PacingConfig, UpdatePaths};
pub use error::{CollectorError, Result, UpdateError};
pub use run_log::RunLog;
pub use stats::UpdateStats;
pub use universe::load_universe;
pub use updater::{run_update, Updater};
