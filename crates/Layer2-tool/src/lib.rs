//! # semiform-tool
//!
//! "create files" tool의 실행부:
//! - payload: 모델 출력(배열/문자열/wrapper)을 `FileDescriptor` 목록으로 정규화
//! - materializer: 프로젝트 루트 아래에 안전하게 파일 기록

pub mod error;
pub mod materializer;
pub mod payload;

pub use error::{MaterializeError, PayloadError};
pub use materializer::Materializer;
pub use payload::{parse_file_list, strip_code_fences, FileDescriptor, FileListPayload};
