//! CSV 파일 기반 심볼별 저장소.
//!
//! # 파일 형식
//!
//! ```text
//! datetime,open,high,low,close,volume
//! 2024-03-01 14:30:00.000,182.1,182.4,181.9,182.3,120400
//! ```
//!
//! 첫 컬럼은 표준 형식 타임스탬프이고, 본문은 타임스탬프 기준 엄격 증가합니다.
//! 파일은 처음 생성된 뒤에는 뒤에 덧붙이기만 하며 다시 쓰지 않습니다.

use crate::error::{Result, StoreError};
use crate::tail::{scan_tail, Tail};
use chrono::{DateTime, Utc};
use intraday_core::{format_timestamp, parse_timestamp, Symbol, TimeSeries, TimeSeriesRow};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 헤더의 타임스탬프 컬럼 이름.
pub const TIMESTAMP_COLUMN: &str = "datetime";

/// 컬럼 목록으로 헤더 줄을 만듭니다 (줄바꿈 제외).
pub fn header_line(columns: &[String]) -> String {
    std::iter::once(TIMESTAMP_COLUMN)
        .chain(columns.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_row(row: &TimeSeriesRow) -> String {
    let mut line = format_timestamp(&row.timestamp);
    for value in &row.values {
        line.push(',');
        line.push_str(&value.to_string());
    }
    line.push('\n');
    line
}

fn parse_row(line: &str) -> std::result::Result<TimeSeriesRow, String> {
    let mut fields = line.split(',');
    let timestamp = fields
        .next()
        .ok_or_else(|| "empty line".to_string())
        .and_then(|s| parse_timestamp(s).map_err(|e| e.to_string()))?;

    let values = fields
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number {field:?}: {e}"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(TimeSeriesRow::new(timestamp, values))
}

/// 심볼별 CSV 저장소.
#[derive(Debug, Clone)]
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    /// 데이터 디렉터리를 열고, 없으면 생성합니다.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let unusable = |reason: String| StoreError::DataDir {
            path: data_dir.clone(),
            reason,
        };

        fs::create_dir_all(&data_dir).map_err(|e| unusable(e.to_string()))?;
        let metadata = fs::metadata(&data_dir).map_err(|e| unusable(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(unusable("not a directory".to_string()));
        }
        if metadata.permissions().readonly() {
            return Err(unusable("not writable".to_string()));
        }

        debug!(data_dir = %data_dir.display(), "데이터 디렉터리 열림");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 심볼의 파일 경로.
    pub fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv"))
    }

    fn tmp_path_for(&self, symbol: &Symbol) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv.tmp"))
    }

    /// 심볼의 파일이 있는지 확인합니다.
    pub fn exists(&self, symbol: &Symbol) -> bool {
        self.path_for(symbol).is_file()
    }

    /// 저장된 마지막 타임스탬프. 파일이 없으면 `None`.
    ///
    /// 파일 끝만 읽으므로 파일 크기와 무관하게 빠릅니다.
    pub fn last_timestamp(&self, symbol: &Symbol) -> Result<Option<DateTime<Utc>>> {
        let path = self.path_for(symbol);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path)(e)),
        };

        let tail = scan_tail(&mut file).map_err(StoreError::io(&path))?;
        let tail = tail.ok_or_else(|| StoreError::corrupt(&path, "no complete line"))?;
        last_row_timestamp(&path, &tail).map(Some)
    }

    /// 헤더와 전체 행으로 새 파일을 만듭니다.
    ///
    /// 임시 파일에 먼저 쓰고 동기화한 뒤 이름을 바꾸므로, 중간에 중단되어도
    /// 반쯤 쓰인 파일이 보이지 않습니다.
    pub fn initialize(&self, symbol: &Symbol, series: &TimeSeries) -> Result<usize> {
        if series.is_empty() {
            return Err(StoreError::EmptySeries(symbol.clone()));
        }

        let path = self.path_for(symbol);
        if path.exists() {
            return Err(StoreError::AlreadyExists(path));
        }

        let tmp_path = self.tmp_path_for(symbol);
        if let Err(e) = write_new_file(&tmp_path, series) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::io(&tmp_path)(e));
        }
        fs::rename(&tmp_path, &path).map_err(StoreError::io(&path))?;

        info!(
            symbol = %symbol,
            rows = series.len(),
            path = %path.display(),
            "파일 생성"
        );
        Ok(series.len())
    }

    /// 기존 파일 끝에 행을 덧붙입니다.
    ///
    /// 모든 행은 저장된 마지막 타임스탬프보다 커야 하며, 하나라도 아니면
    /// 아무것도 쓰지 않고 `OrderingViolation`을 반환합니다.
    pub fn append(&self, symbol: &Symbol, series: &TimeSeries) -> Result<usize> {
        let path = self.path_for(symbol);
        let mut file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path))
            }
            Err(e) => return Err(StoreError::io(&path)(e)),
        };

        if series.is_empty() {
            return Ok(0);
        }

        let expected = header_line(series.columns());
        let actual = read_header(&mut file).map_err(StoreError::io(&path))?;
        if actual != expected {
            return Err(StoreError::SchemaMismatch {
                path,
                expected,
                actual,
            });
        }

        let tail = scan_tail(&mut file)
            .map_err(StoreError::io(&path))?
            .ok_or_else(|| StoreError::corrupt(&path, "no complete line"))?;
        let last = last_row_timestamp(&path, &tail)?;

        // 시계열은 엄격 증가하므로 첫 행만 보면 충분
        if let Some(first) = series.first_timestamp() {
            if first <= last {
                return Err(StoreError::OrderingViolation {
                    last,
                    offending: first,
                });
            }
        }

        let file_len = file.metadata().map_err(StoreError::io(&path))?.len();
        if tail.complete_len < file_len {
            warn!(
                symbol = %symbol,
                discarded_bytes = file_len - tail.complete_len,
                "불완전한 마지막 줄 제거"
            );
            file.set_len(tail.complete_len)
                .map_err(StoreError::io(&path))?;
        }

        let content: String = series.rows().iter().map(format_row).collect();
        write_at_end(&mut file, content.as_bytes()).map_err(StoreError::io(&path))?;

        debug!(symbol = %symbol, rows = series.len(), %last, "행 추가");
        Ok(series.len())
    }

    /// 파일 전체를 시계열로 읽습니다.
    ///
    /// 줄바꿈으로 끝나지 않는 마지막 조각은 무시합니다.
    pub fn load(&self, symbol: &Symbol) -> Result<TimeSeries> {
        let path = self.path_for(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path))
            }
            Err(e) => return Err(StoreError::io(&path)(e)),
        };

        let complete = content.rfind('\n').map_or("", |i| &content[..=i]);
        let mut lines = complete.lines();

        let header = lines
            .next()
            .ok_or_else(|| StoreError::corrupt(&path, "missing header"))?;
        let mut fields = header.split(',');
        if fields.next() != Some(TIMESTAMP_COLUMN) {
            return Err(StoreError::corrupt(
                &path,
                format!("header does not start with {TIMESTAMP_COLUMN}: {header:?}"),
            ));
        }
        let columns: Vec<String> = fields.map(str::to_string).collect();

        let rows = lines
            .enumerate()
            .map(|(i, line)| {
                parse_row(line)
                    .map_err(|reason| StoreError::corrupt(&path, format!("line {}: {reason}", i + 2)))
            })
            .collect::<Result<Vec<_>>>()?;

        TimeSeries::new(columns, rows).map_err(|e| StoreError::corrupt(&path, e.to_string()))
    }
}

fn write_new_file(path: &Path, series: &TimeSeries) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", header_line(series.columns()))?;
    for row in series.rows() {
        writer.write_all(format_row(row).as_bytes())?;
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn write_at_end(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::End(0))?;
    file.write_all(bytes)?;
    file.sync_data()
}

fn read_header(file: &mut File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut line = String::new();
    BufReader::new(&mut *file).read_line(&mut line)?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

fn last_row_timestamp(path: &Path, tail: &Tail) -> Result<DateTime<Utc>> {
    if tail.is_first_line() {
        return Err(StoreError::corrupt(path, "header without data rows"));
    }

    let field = tail.line.split(',').next().unwrap_or_default();
    parse_timestamp(field).map_err(|e| StoreError::corrupt(path, e.to_string()))
}
