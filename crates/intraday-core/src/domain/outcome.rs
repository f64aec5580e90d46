//! 심볼별 갱신 결과.

use crate::types::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 한 심볼에 대한 갱신 결과 (종료 상태).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateOutcome {
    /// 새 저장 파일 생성
    Created { rows: usize },
    /// 기존 저장 파일에 행 추가
    Appended { rows: usize },
    /// 새 데이터 없음
    NoChange,
    /// 이 심볼의 갱신 실패 (실행은 계속)
    Error { cause: String },
}

impl UpdateOutcome {
    /// 기록된 행 수.
    pub fn rows_written(&self) -> usize {
        match self {
            UpdateOutcome::Created { rows } | UpdateOutcome::Appended { rows } => *rows,
            UpdateOutcome::NoChange | UpdateOutcome::Error { .. } => 0,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, UpdateOutcome::Error { .. })
    }

    /// 상태 이름.
    pub fn state(&self) -> &'static str {
        match self {
            UpdateOutcome::Created { .. } => "CREATED",
            UpdateOutcome::Appended { .. } => "APPENDED",
            UpdateOutcome::NoChange => "NO_CHANGE",
            UpdateOutcome::Error { .. } => "ERROR",
        }
    }

    /// 실행 로그 한 줄에 들어갈 메시지.
    ///
    /// 에러 원인의 줄바꿈은 공백으로 바꿔 한 이벤트가 한 줄이 되도록 합니다.
    pub fn log_message(&self, symbol: &Symbol) -> String {
        match self {
            UpdateOutcome::Created { rows } => format!("CREATED: {} ({} LINES).", symbol, rows),
            UpdateOutcome::Appended { rows } => {
                format!("APPENDED {} LINES TO {}.", rows, symbol)
            }
            UpdateOutcome::NoChange => format!("NO CHANGE: {}.", symbol),
            UpdateOutcome::Error { cause } => {
                let flat = cause.split_whitespace().collect::<Vec<_>>().join(" ");
                format!("ERROR ON {}: {}", symbol, flat)
            }
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Created { rows } | UpdateOutcome::Appended { rows } => {
                write!(f, "{}({})", self.state(), rows)
            }
            UpdateOutcome::NoChange => write!(f, "{}", self.state()),
            UpdateOutcome::Error { cause } => write!(f, "{}({})", self.state(), cause),
        }
    }
}
