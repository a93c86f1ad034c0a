//! # semiform-foundation
//!
//! Foundation layer for Semiform:
//! - Error: 공통 에러 타입 (`Error`, `Result`)
//! - Phase: 생성 단계 (backend → frontend)
//! - Registry: Provider 종류와 설정 (기본 모델, max tokens, 환경변수)
//! - Storage: JsonStore (글로벌/프로젝트 설정 파일)
//! - Strings: 공용 상수 (notes 파일명, 환경변수 이름)

pub mod error;
pub mod phase;
pub mod registry;
pub mod storage;
pub mod strings;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Phase
// ============================================================================
pub use phase::Phase;

// ============================================================================
// Registry (Provider 설정)
// ============================================================================
pub use registry::{
    CallShape, ProviderSettings, ProviderType, SettingsFile, PROVIDERS_FILE,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;

// ============================================================================
// Strings
// ============================================================================
pub use strings::{
    ENV_ASSISTANT_ID, NOTES_FILE, PROVIDER_ANTHROPIC, PROVIDER_DEEPSEEK, PROVIDER_GROQ,
    PROVIDER_OLLAMA, PROVIDER_OPENAI, PROVIDER_OPENAI_ASSISTANT,
};
