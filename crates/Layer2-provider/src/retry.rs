//! HTTP 전송 재시도 (exponential backoff + jitter)

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry 설정
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 최대 재시도 횟수 (첫 시도 제외)
    pub max_retries: u32,

    /// 첫 재시도 전 대기 (밀리초)
    pub initial_delay_ms: u64,

    pub backoff_multiplier: f64,

    /// 대기 상한 (밀리초)
    pub max_delay_ms: u64,

    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// attempt는 0부터 시작
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);

        let delay = if self.jitter {
            // 0.8 ~ 1.2
            capped * (0.8 + jitter_fraction() * 0.4)
        } else {
            capped
        };

        Duration::from_millis(delay as u64)
    }
}

/// 0.0 ~ 1.0, 시계 nanos 기반
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// 재시도 판단 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClassification {
    Retry,
    NoRetry,
    /// 서버가 대기 시간을 알려준 경우 그 값을 사용
    RateLimited { retry_after_ms: Option<u64> },
}

/// 재시도 분류가 가능한 에러
pub trait RetryableError {
    fn classify(&self) -> RetryClassification;
}

/// 비동기 작업을 재시도 정책에 따라 실행
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let classification = err.classify();
        if classification == RetryClassification::NoRetry {
            debug!("{}: not retrying after attempt {}: {}", operation_name, attempt + 1, err);
            return Err(err);
        }

        if attempt >= config.max_retries {
            warn!(
                "{}: giving up after {} retries: {}",
                operation_name, config.max_retries, err
            );
            return Err(err);
        }

        let delay = match classification {
            RetryClassification::RateLimited {
                retry_after_ms: Some(ms),
            } => Duration::from_millis(ms),
            _ => config.delay_for_attempt(attempt),
        };

        warn!(
            "{}: attempt {} failed, retrying in {:?}: {}",
            operation_name,
            attempt + 1,
            delay,
            err
        );
        sleep(delay).await;
        attempt += 1;
    }
}
