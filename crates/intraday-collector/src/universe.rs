//! 심볼 목록 파일 로드.
//!
//! 한 줄에 심볼 하나, 헤더 없음. 빈 줄(공백만 있는 줄 포함)을 만나면
//! 그 뒤는 읽지 않습니다.

use crate::error::{CollectorError, Result};
use intraday_core::Symbol;
use std::collections::HashSet;
use std::path::Path;

/// 심볼 목록 파일을 읽습니다.
///
/// 중복 심볼은 첫 번째만 남깁니다 (같은 파일에 두 번 쓰지 않도록).
pub fn load_universe(path: &Path) -> Result<Vec<Symbol>> {
    let content = std::fs::read_to_string(path).map_err(|e| CollectorError::Universe {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let symbols = parse_universe(&content).map_err(|reason| CollectorError::Universe {
        path: path.to_path_buf(),
        reason,
    })?;

    if symbols.is_empty() {
        tracing::warn!(path = %path.display(), "심볼 목록이 비어 있음");
    } else {
        tracing::info!(path = %path.display(), count = symbols.len(), "심볼 목록 로드");
    }
    Ok(symbols)
}

fn parse_universe(content: &str) -> std::result::Result<Vec<Symbol>, String> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            tracing::debug!(line = idx + 1, "빈 줄에서 목록 읽기 종료");
            break;
        }

        let symbol = Symbol::new(trimmed).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        } else {
            tracing::warn!(symbol = %symbol, line = idx + 1, "중복 심볼 무시");
        }
    }

    Ok(symbols)
}
