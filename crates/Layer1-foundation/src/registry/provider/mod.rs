//! Provider 설정

mod provider;
mod provider_type;

pub use provider::{ProviderSettings, SettingsFile, PROVIDERS_FILE};
pub use provider_type::{CallShape, ProviderType};
