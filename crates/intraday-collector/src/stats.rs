//! 갱신 실행 통계.

use intraday_core::UpdateOutcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 번의 갱신 실행 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStats {
    /// 심볼 목록 크기
    pub total: usize,
    /// 새 파일 생성
    pub created: usize,
    /// 기존 파일에 행 추가
    pub appended: usize,
    /// 변경 없음
    pub unchanged: usize,
    /// 에러
    pub errors: usize,
    /// 기록된 총 행 수
    pub rows_written: usize,
    /// 중간에 취소되었는지 여부
    pub cancelled: bool,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl UpdateStats {
    /// 새 통계 객체 생성
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// 심볼 하나의 결과를 반영합니다.
    pub fn record(&mut self, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Created { .. } => self.created += 1,
            UpdateOutcome::Appended { .. } => self.appended += 1,
            UpdateOutcome::NoChange => self.unchanged += 1,
            UpdateOutcome::Error { .. } => self.errors += 1,
        }
        self.rows_written += outcome.rows_written();
    }

    /// 처리된 심볼 수
    pub fn processed(&self) -> usize {
        self.created + self.appended + self.unchanged + self.errors
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            processed = self.processed(),
            created = self.created,
            appended = self.appended,
            unchanged = self.unchanged,
            errors = self.errors,
            rows_written = self.rows_written,
            cancelled = self.cancelled,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "갱신 완료"
        );
    }
}
