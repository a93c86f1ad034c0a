use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::provider_type::ProviderType;

/// 설정 파일명
pub const PROVIDERS_FILE: &str = "providers.json";

/// Run 상태 polling 기본 간격 (밀리초)
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// 개별 프로바이더 설정
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// 프로바이더 타입
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// API 키 (없으면 환경변수에서 읽음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (자체 호스팅 endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// 모델 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// 최대 출력 토큰
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// 타임아웃 (초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Run 상태 polling 간격 (밀리초, stateful provider 전용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl ProviderSettings {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            model: None,
            max_tokens: None,
            timeout_secs: None,
            poll_interval_ms: None,
        }
    }

    /// Missing credentials are not a startup error; the provider call fails instead.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(0) = self.max_tokens {
            return Err(format!("{}: max_tokens must be positive", self.provider_type));
        }
        Ok(())
    }

    // effective 값들
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider_type.default_base_url())
    }

    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider_type.default_model())
    }

    /// 명시값 → 모델별 알려진 값 → 프로바이더 기본값 순서
    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens
            .or_else(|| {
                self.provider_type
                    .known_max_tokens(self.effective_model())
            })
            .unwrap_or_else(|| self.provider_type.default_max_tokens())
    }

    pub fn effective_timeout(&self) -> u64 {
        self.timeout_secs
            .unwrap_or_else(|| self.provider_type.default_timeout())
    }

    pub fn effective_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }

    /// 설정값 → 환경변수 순서로 API 키를 찾음
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.is_empty())
            })
    }

    // 빌더
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn poll_interval(mut self, millis: u64) -> Self {
        self.poll_interval_ms = Some(millis);
        self
    }

    /// 다른 설정의 명시값으로 덮어씀 (other가 우선)
    fn overlay(&mut self, other: ProviderSettings) {
        self.provider_type = other.provider_type;
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.max_tokens.is_some() {
            self.max_tokens = other.max_tokens;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.poll_interval_ms.is_some() {
            self.poll_interval_ms = other.poll_interval_ms;
        }
    }
}

/// providers.json 내용
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SettingsFile {
    /// 기본 프로바이더
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ProviderType>,

    /// 프로바이더별 설정 (key = provider id)
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

impl SettingsFile {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정 (<config_dir>/semiform/providers.json)
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<SettingsFile>(PROVIDERS_FILE)? {
                debug!("Loaded {}", global.file_path(PROVIDERS_FILE).display());
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정 (.semiform/providers.json)
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) = project.load_optional::<SettingsFile>(PROVIDERS_FILE)? {
                debug!("Loaded {}", project.file_path(PROVIDERS_FILE).display());
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 특정 저장소에서만 로드
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Ok(store
            .load_optional::<SettingsFile>(PROVIDERS_FILE)?
            .unwrap_or_default())
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    pub fn add(&mut self, settings: ProviderSettings) {
        if self.default.is_none() {
            self.default = Some(settings.provider_type);
        }
        self.providers
            .insert(settings.provider_type.id().to_string(), settings);
    }

    pub fn get(&self, provider_type: ProviderType) -> Option<&ProviderSettings> {
        self.providers.get(provider_type.id())
    }

    pub fn set_default(&mut self, provider_type: ProviderType) {
        self.default = Some(provider_type);
    }

    /// 설정된 값이 있으면 그것을, 없으면 기본 설정을 반환
    pub fn settings_for(&self, provider_type: ProviderType) -> ProviderSettings {
        self.get(provider_type)
            .cloned()
            .map(|mut s| {
                s.provider_type = provider_type;
                s
            })
            .unwrap_or_else(|| ProviderSettings::new(provider_type))
    }

    /// 기본 프로바이더 설정 (없으면 Anthropic)
    pub fn default_settings(&self) -> ProviderSettings {
        self.settings_for(self.default.unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 다른 설정과 병합 (other가 우선, 필드 단위)
    pub fn merge(&mut self, other: SettingsFile) {
        if other.default.is_some() {
            self.default = other.default;
        }
        for (name, settings) in other.providers {
            match self.providers.get_mut(&name) {
                Some(existing) => existing.overlay(settings),
                None => {
                    self.providers.insert(name, settings);
                }
            }
        }
    }
}
