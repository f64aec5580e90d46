//! 심볼 정의.
//!
//! 심볼은 종목 코드(티커) 또는 코인 코드를 나타내는 불투명한 식별자입니다.
//! 심볼별 저장 파일명(`{SYMBOL}.csv`)으로 그대로 사용되므로
//! 경로 구분자나 특수 경로(`.`, `..`)는 허용하지 않습니다.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 수집 대상 심볼.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// 새 심볼을 생성합니다.
    ///
    /// 빈 문자열, 공백만 있는 문자열, 파일명으로 쓸 수 없는 문자열은 거부합니다.
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();

        let invalid = value.trim().is_empty()
            || value == "."
            || value == ".."
            || value.contains(['/', '\\', '\0']);

        if invalid {
            return Err(CoreError::InvalidSymbol(value));
        }

        Ok(Self(value))
    }

    /// 심볼 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_creation() {
        let symbol = Symbol::new("AAPL").unwrap();
        assert_eq!(symbol.as_str(), "AAPL");
        assert_eq!(symbol.to_string(), "AAPL");
    }

    #[test]
    fn test_symbol_rejects_empty_and_paths() {
        assert!(Symbol::new("").is_err());
        assert!(Symbol::new("   ").is_err());
        assert!(Symbol::new("..").is_err());
        assert!(Symbol::new("a/b").is_err());
        assert!(Symbol::new("a\\b").is_err());
    }

    #[test]
    fn test_symbol_ordering() {
        let mut symbols: Vec<Symbol> = ["MSFT", "AAPL", "BTC"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        symbols.sort();
        assert_eq!(symbols[0].as_str(), "AAPL");
        assert_eq!(symbols[2].as_str(), "MSFT");
    }
}
