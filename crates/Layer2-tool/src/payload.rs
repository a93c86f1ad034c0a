//! Tool call payload → 파일 목록
//!
//! 모델 출력은 세 가지 형태로 옵니다:
//! - 파일 객체 배열 (`[{folder, filename, content}]` 또는 `[{filepath, content}]`)
//! - 그 배열을 담은 JSON 문자열 (code fence로 감싸져 있을 수 있음)
//! - `{ "files": ... }` wrapper 또는 파일 객체 하나 (single-file tool)
//!
//! 필수 필드가 빠진 항목은 경고 후 버리고, 최종적으로 배열이 아니면 에러입니다.

use crate::error::{kind_of, PayloadError};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const FILES_KEY: &str = "files";

/// 아직 검증 전인 payload
#[derive(Debug, Clone, PartialEq)]
pub enum FileListPayload {
    /// 이미 JSON 배열로 온 항목들
    Structured(Vec<Value>),
    /// 파싱이 필요한 문자열
    RawText(String),
}

impl FileListPayload {
    /// tool input 분류
    pub fn from_tool_input(input: Value) -> Result<Self, PayloadError> {
        match input {
            Value::String(text) => Ok(Self::RawText(text)),
            other => Self::from_json(other),
        }
    }

    /// 문자열이 아닌 JSON 값 분류 (RawText 재진입용)
    fn from_json(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Array(items) => Ok(Self::Structured(items)),
            Value::Object(mut obj) => match obj.remove(FILES_KEY) {
                Some(Value::Array(items)) => Ok(Self::Structured(items)),
                Some(Value::String(text)) => Ok(Self::RawText(text)),
                Some(other) => Err(PayloadError::NotAnArray(kind_of(&other))),
                None if is_file_object(&obj) => Ok(Self::Structured(vec![Value::Object(obj)])),
                None => Err(PayloadError::NotAnArray("an object without files")),
            },
            other => Err(PayloadError::NotAnArray(kind_of(&other))),
        }
    }

    /// 검증 후 파일 목록
    pub fn into_files(self) -> Result<Vec<FileDescriptor>, PayloadError> {
        let items = match self {
            Self::Structured(items) => items,
            Self::RawText(text) => {
                // 파일 내용 안에 fence가 있을 수 있으므로 원문 파싱을 먼저 시도
                let value: Value = match serde_json::from_str(text.trim()) {
                    Ok(value) => value,
                    Err(_) => serde_json::from_str(strip_code_fences(&text))
                        .map_err(|e| PayloadError::InvalidJson(e.to_string()))?,
                };
                match Self::from_json(value)? {
                    Self::Structured(items) => items,
                    // 문자열 안의 문자열은 받지 않음
                    Self::RawText(_) => return Err(PayloadError::NotAnArray("a nested string")),
                }
            }
        };

        let total = items.len();
        let files: Vec<FileDescriptor> = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match FileDescriptor::from_entry(item) {
                Ok(file) => Some(file),
                Err(reason) => {
                    warn!("Dropping file entry #{}: {}", index, reason);
                    None
                }
            })
            .collect();

        debug!("parsed {} of {} file entries", files.len(), total);
        Ok(files)
    }
}

/// tool input 하나를 파일 목록으로
pub fn parse_file_list(input: Value) -> Result<Vec<FileDescriptor>, PayloadError> {
    FileListPayload::from_tool_input(input)?.into_files()
}

fn is_file_object(obj: &Map<String, Value>) -> bool {
    obj.contains_key("content") && (obj.contains_key("filepath") || obj.contains_key("filename"))
}

/// ``` / ```json fence 제거. fence가 없으면 trim만 함
pub fn strip_code_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };
    let after_open = &text[open + 3..];
    // 언어 태그가 있는 첫 줄은 건너뜀
    let body = match after_open.find('\n') {
        Some(nl) => &after_open[nl + 1..],
        None => after_open,
    };
    match body.rfind("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// 정규화된 파일 하나
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    /// 프로젝트 루트 기준 폴더 ("" = 루트)
    pub folder: String,
    pub filename: String,
    /// 문자열이 아니면 JSON 텍스트로 기록됨
    pub content: Value,
}

impl FileDescriptor {
    pub fn new(folder: impl Into<String>, filename: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            folder: folder.into(),
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// `filepath`를 마지막 '/' 기준으로 나눔
    pub fn from_filepath(filepath: &str, content: Value) -> Self {
        match filepath.rfind('/') {
            Some(idx) => Self::new(&filepath[..idx], &filepath[idx + 1..], content),
            None => Self::new("", filepath, content),
        }
    }

    fn from_entry(entry: Value) -> Result<Self, &'static str> {
        let Value::Object(mut obj) = entry else {
            return Err("entry is not an object");
        };

        let content = match obj.remove("content") {
            None | Some(Value::Null) => return Err("missing content"),
            Some(content) => content,
        };

        if let Some(filepath) = non_empty_str(&obj, "filepath") {
            let file = Self::from_filepath(filepath, content);
            // "backend/" 처럼 디렉토리만 가리키는 경로
            if file.filename.trim().is_empty() {
                return Err("missing filepath or filename");
            }
            return Ok(file);
        }
        match non_empty_str(&obj, "filename") {
            Some(filename) => {
                let folder = non_empty_str(&obj, "folder").unwrap_or_default();
                Ok(Self::new(folder, filename, content))
            }
            None => Err("missing filepath or filename"),
        }
    }

    /// folder/filename
    pub fn relative_path(&self) -> String {
        let folder = self.folder.trim_end_matches('/');
        if folder.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", folder, self.filename)
        }
    }

    /// 실제로 기록할 텍스트
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
