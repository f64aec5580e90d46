//! 실행 로그 파일.
//!
//! 한 줄에 한 이벤트: `<타임스탬프> <메시지>`. 추가 전용이며,
//! tracing 진단 로그와는 별개입니다.

use crate::error::{CollectorError, Result};
use chrono::Utc;
use intraday_core::format_timestamp;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const STARTED: &str = "STARTED UPDATE.";
pub const FINISHED: &str = "FINISHED UPDATE.";
pub const CANCELLED: &str = "CANCELLED UPDATE.";

/// 준비 단계 실패 메시지.
pub fn aborted(cause: &impl std::fmt::Display) -> String {
    let flat = cause.to_string().split_whitespace().collect::<Vec<_>>().join(" ");
    format!("ABORTED UPDATE: {}", flat)
}

/// 추가 전용 실행 로그.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// 로그 파일을 엽니다 (없으면 생성).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| CollectorError::RunLog {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 한 줄을 기록합니다.
    pub fn write(&self, message: &str) -> io::Result<()> {
        let line = format!("{} {}\n", format_timestamp(&Utc::now()), message);
        // 다른 작업이 패닉으로 잠금을 오염시켜도 로그는 계속 남김
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()
    }

    /// 한 줄을 기록하고, 실패하면 진단 로그만 남깁니다.
    pub fn record(&self, message: &str) {
        if let Err(e) = self.write(message) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                message,
                "실행 로그 기록 실패"
            );
        }
    }
}
