//! Registry - Provider 등록/설정
//!
//! - `provider/` - LLM Provider 종류, 기본값, 설정 파일 (자체 load/save)

pub mod provider;

pub use provider::{CallShape, ProviderSettings, ProviderType, SettingsFile, PROVIDERS_FILE};
