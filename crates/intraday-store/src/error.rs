//! 저장소 오류 타입.

use chrono::{DateTime, Utc};
use intraday_core::Symbol;
use std::path::PathBuf;
use thiserror::Error;

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 데이터 디렉터리를 만들거나 사용할 수 없음
    #[error("Data directory unusable ({}): {reason}", .path.display())]
    DataDir { path: PathBuf, reason: String },

    /// 이미 파일이 있는데 초기 생성을 시도함
    #[error("Artifact already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// 추가할 파일이 없음
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// 저장된 마지막 타임스탬프 이하의 행을 추가하려 함
    #[error("Ordering violation: stored last {last}, appending {offending}")]
    OrderingViolation {
        last: DateTime<Utc>,
        offending: DateTime<Utc>,
    },

    /// 파일 헤더와 시계열 컬럼이 다름
    #[error("Schema mismatch ({}): file {actual:?}, series {expected:?}", .path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// 빈 시계열로 파일을 만들려 함
    #[error("Cannot initialize from an empty series: {0}")]
    EmptySeries(Symbol),

    /// 파일 내용을 해석할 수 없음
    #[error("Corrupt artifact ({}): {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// 입출력 오류
    #[error("I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// 저장소 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, StoreError>;
