//! 에러 타입 정의.
//!
//! - [`CollectorError`]: 실행 전체를 중단시키는 준비 단계 실패
//! - [`UpdateError`]: 한 심볼의 갱신 실패 (로그로만 남고 실행은 계속됨)

use intraday_source::SourceError;
use intraday_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 실행 로그 파일을 열 수 없음
    #[error("Run log error ({}): {source}", .path.display())]
    RunLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 심볼 목록 파일 에러
    #[error("Symbol universe error ({}): {reason}", .path.display())]
    Universe { path: PathBuf, reason: String },

    /// 저장소 준비 에러
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 데이터 소스 생성 에러
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// 심볼 하나의 갱신 에러
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// 저장소 작업 태스크가 완료되지 못함 (런타임 종료)
    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// 갱신 중 패닉 발생
    #[error("panicked: {0}")]
    Panicked(String),
}

impl UpdateError {
    /// 다음 실행에서 다시 시도하면 성공할 수 있는지 여부.
    ///
    /// 벤더 일시 장애만 해당하며 저장소 에러와 패닉은 항상 `false`입니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpdateError::Source(e) => e.is_retryable(),
            UpdateError::Store(_) | UpdateError::Join(_) | UpdateError::Panicked(_) => false,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
