//! Stateful run 상태와 polling
//!
//! 서버 측 run은 `queued`/`in_progress`/`cancelling` 동안 고정 간격으로 polling하고,
//! 그 외 상태에 도달하면 멈춥니다. 모르는 상태 문자열은 `Unknown`으로 받아 실패로 처리합니다.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Run 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Unknown(String),
}

impl RunStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown(s) => s,
        }
    }

    /// 계속 polling해야 하는 상태
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RunStatus::parse(&s))
    }
}

/// pending이 아닌 상태가 나올 때까지 `fetch`를 반복
///
/// `fetch`는 run 스냅샷을 돌려주고, `status_of`로 상태를 꺼냅니다.
pub async fn poll_until_settled<T, E, F, Fut, S>(
    interval: Duration,
    mut fetch: F,
    status_of: S,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: Fn(&T) -> &RunStatus,
{
    loop {
        let snapshot = fetch().await?;
        let status = status_of(&snapshot);
        debug!("run status: {}", status);
        if !status.is_pending() {
            return Ok(snapshot);
        }
        tokio::time::sleep(interval).await;
    }
}
