//! 요청 속도 제한기.
//!
//! 고정 구간(window) 토큰 버킷: 한 구간(`interval`) 동안 최대 `capacity`개의
//! 허가를 내주고, 소진되면 구간이 끝날 때까지 대기합니다.
//!
//! - `capacity = 1`이면 연속 호출 사이 최소 간격을 보장하는 페이서가 됩니다.
//! - `capacity = N`이면 N개씩 묶어 보내고 다음 묶음 전에 한 구간을 기다립니다.
//!
//! `tokio::time::Instant` 기반이므로 일시정지된 시계에서 테스트할 수 있습니다.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rate Limiter 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// 구간당 최대 허가 수
    pub capacity: u32,
    /// 구간 길이
    pub interval: Duration,
}

impl RateLimitConfig {
    /// 새 설정 생성 (`capacity`는 최소 1).
    pub fn new(capacity: u32, interval: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            interval,
        }
    }

    /// 연속 호출 사이 최소 간격만 보장하는 설정.
    pub fn min_interval(interval: Duration) -> Self {
        Self::new(1, interval)
    }
}

/// 현재 구간 상태.
#[derive(Debug, Default)]
struct Window {
    /// 구간 시작 시각 (첫 허가 시점)
    started: Option<Instant>,
    /// 이번 구간에 내준 허가 수
    used: u32,
}

/// 공유 Rate Limiter.
///
/// 대기 중에도 잠금을 유지하므로 허가는 요청 순서대로 발급됩니다.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// 새 Rate Limiter 생성.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: RateLimitConfig::new(config.capacity, config.interval),
            window: Mutex::new(Window::default()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// 허가를 받을 때까지 대기합니다.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;

        loop {
            let now = Instant::now();
            match window.started {
                Some(started) if now < started + self.config.interval => {
                    if window.used < self.config.capacity {
                        window.used += 1;
                        return;
                    }
                    tokio::time::sleep_until(started + self.config.interval).await;
                }
                _ => {
                    window.started = Some(now);
                    window.used = 1;
                    return;
                }
            }
        }
    }
}
