//! Storage module for Semiform
//!
//! - `json`: JSON - 프로바이더 설정 파일 저장/로드

mod json;

pub use json::JsonStore;
