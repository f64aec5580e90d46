//! 파일 끝에서부터 마지막 완전한 줄 찾기.
//!
//! 파일을 뒤에서부터 4 KiB 단위로 읽어 마지막 줄바꿈으로 끝나는 줄을 찾습니다.
//! 줄바꿈 없이 끝나는 마지막 조각은 중단된 쓰기의 잔여물로 보고 무시합니다.

use std::io::{self, Read, Seek, SeekFrom};

/// 역방향 읽기 단위.
pub(crate) const CHUNK_SIZE: u64 = 4096;

/// 마지막 완전한 줄.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tail {
    /// 줄 내용 (줄바꿈, `\r` 제외)
    pub line: String,
    /// 줄 시작 위치. 0이면 파일의 첫 줄 (헤더).
    pub line_start: u64,
    /// 마지막 줄바꿈 바로 뒤 위치
    pub complete_len: u64,
}

impl Tail {
    fn new(bytes: &[u8], line_start: u64, complete_len: u64) -> Self {
        let line = String::from_utf8_lossy(bytes);
        Self {
            line: line.trim_end_matches('\r').to_string(),
            line_start,
            complete_len,
        }
    }

    /// 첫 줄(헤더)인지 여부.
    pub fn is_first_line(&self) -> bool {
        self.line_start == 0
    }
}

/// 마지막 완전한 줄을 찾습니다. 줄바꿈이 하나도 없으면 `None`.
pub(crate) fn scan_tail<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Tail>> {
    let len = reader.seek(SeekFrom::End(0))?;

    // buf는 항상 파일의 [pos, len) 구간
    let mut pos = len;
    let mut buf: Vec<u8> = Vec::new();
    let mut last_newline: Option<u64> = None;

    while pos > 0 {
        let n = CHUNK_SIZE.min(pos);
        pos -= n;

        reader.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0u8; n as usize];
        reader.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&buf);
        buf = chunk;

        if last_newline.is_none() {
            last_newline = buf
                .iter()
                .rposition(|&b| b == b'\n')
                .map(|i| pos + i as u64);
        }

        if let Some(newline) = last_newline {
            let end = (newline - pos) as usize;
            if let Some(prev) = buf[..end].iter().rposition(|&b| b == b'\n') {
                let start = pos + prev as u64 + 1;
                return Ok(Some(Tail::new(&buf[prev + 1..end], start, newline + 1)));
            }
        }
    }

    // 파일 시작까지 읽음: buf가 파일 전체
    Ok(last_newline.map(|newline| Tail::new(&buf[..newline as usize], 0, newline + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(content: &str) -> Option<Tail> {
        scan_tail(&mut Cursor::new(content.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_scan_tail_finds_last_line() {
        let tail = scan("h\na\nbc\n").unwrap();
        assert_eq!(tail.line, "bc");
        assert_eq!(tail.line_start, 4);
        assert_eq!(tail.complete_len, 7);
        assert!(!tail.is_first_line());
    }

    #[test]
    fn test_scan_tail_ignores_torn_fragment() {
        let tail = scan("h\na\nbc\n2024-01-0").unwrap();
        assert_eq!(tail.line, "bc");
        assert_eq!(tail.complete_len, 7);
    }

    #[test]
    fn test_scan_tail_header_only() {
        let tail = scan("datetime,open\n").unwrap();
        assert_eq!(tail.line, "datetime,open");
        assert!(tail.is_first_line());
    }

    #[test]
    fn test_scan_tail_without_newline() {
        assert!(scan("").is_none());
        assert!(scan("datetime,open").is_none());
    }

    #[test]
    fn test_scan_tail_strips_carriage_return() {
        let tail = scan("h\r\nrow\r\n").unwrap();
        assert_eq!(tail.line, "row");
    }

    #[test]
    fn test_scan_tail_across_chunks() {
        let long = "x".repeat(CHUNK_SIZE as usize * 2 + 17);
        let content = format!("header\n{}\n{}\nlast\n", "a".repeat(10), long);
        let tail = scan(&content).unwrap();
        assert_eq!(tail.line, "last");

        // 마지막 줄 자체가 여러 청크에 걸친 경우
        let content = format!("header\n{}\n", long);
        let tail = scan(&content).unwrap();
        assert_eq!(tail.line, long);
        assert_eq!(tail.line_start, 7);
        assert_eq!(tail.complete_len, content.len() as u64);
    }

    #[test]
    fn test_scan_tail_torn_fragment_longer_than_chunk() {
        let torn = "y".repeat(CHUNK_SIZE as usize + 5);
        let content = format!("header\nrow\n{}", torn);
        let tail = scan(&content).unwrap();
        assert_eq!(tail.line, "row");
        assert_eq!(tail.complete_len, 11);
    }
}
