//! 심볼별 가격 시계열 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 심볼당 CSV 파일 하나 (`{data_dir}/{SYMBOL}.csv`)
//! - 전체 파일을 읽지 않는 마지막 타임스탬프 조회
//! - 덮어쓰기 없는 초기 생성, 순서 검증 후 추가만 하는 append
//! - 중단된 쓰기로 남은 불완전한 마지막 줄 복구

pub mod csv_store;
pub mod error;
mod tail;

pub use csv_store::{header_line, CsvStore, TIMESTAMP_COLUMN};
pub use error::{Result, StoreError};
