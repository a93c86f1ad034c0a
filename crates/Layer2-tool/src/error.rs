//! Tool layer errors

use std::path::PathBuf;
use thiserror::Error;

/// Tool call payload를 파일 목록으로 바꾸지 못함 (해당 call만 실패)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("expected an array of files, got {0}")]
    NotAnArray(&'static str),
}

/// 파일 하나를 쓰지 못함 (loop는 로그만 남기고 계속)
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("refusing to write {path}: {reason}")]
    UnsafePath { path: String, reason: &'static str },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// JSON 값 종류 이름 (에러 메시지용)
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
