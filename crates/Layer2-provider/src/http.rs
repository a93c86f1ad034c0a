//! 공용 HTTP helper

use crate::error::ProviderError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// 타임아웃이 설정된 client, 빌드 실패 시 기본 client
pub(crate) fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        })
}

/// 2xx가 아니면 body를 읽어 `classify`로 에러 변환
pub(crate) async fn ensure_success(
    response: Response,
    classify: fn(u16, &str) -> ProviderError,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify(status.as_u16(), &body))
}

/// 응답 body를 JSON으로 파싱
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let body = response.text().await.map_err(ProviderError::from_reqwest)?;
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::InvalidResponse(format!("{} (body: {})", e, truncate(&body, 200)))
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
