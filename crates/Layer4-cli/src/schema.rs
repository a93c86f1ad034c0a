//! Schema file loading

use anyhow::Context;
use std::path::Path;

/// 모델에 보낼 schema 텍스트
///
/// `raw_text`면 파일 그대로, 아니면 JSON으로 검증 후 pretty-print
pub async fn load_schema(path: &Path, raw_text: bool) -> anyhow::Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read schema file {}", path.display()))?;

    if raw_text {
        return Ok(text);
    }

    let value: serde_json::Value = serde_json::from_str(&text).with_context(|| {
        format!(
            "{} is not valid JSON (use --text to send it as plain text)",
            path.display()
        )
    })?;
    Ok(serde_json::to_string_pretty(&value)?)
}
