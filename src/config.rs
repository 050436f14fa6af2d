//! Layered service configuration.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. built-in defaults,
//! 2. an optional YAML file named by `QURANSCOPE_CONFIG`,
//! 3. environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `OPENAI_API_KEY` | `openai_api_key` (required) |
//! | `OPENAI_BASE_URL` | `openai_base_url` |
//! | `QURANSCOPE_MODEL` | `model` |
//! | `QURANSCOPE_BIND` | `bind` |
//! | `FRONTEND_URL` | `frontend_url` |
//! | `QURANSCOPE_CACHE_TTL_SECS` | `cache_ttl_secs` |
//! | `QURANSCOPE_SWEEP_INTERVAL_SECS` | `sweep_interval_secs` |
//! | `AI_HTTP_TIMEOUT_SECS` | `http_timeout_secs` |
//!
//! Numeric variables that fail to parse are ignored.

use crate::error::{Error, ErrorContext};
use crate::generation::GenerationParams;
use crate::replay::ReplayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "QURANSCOPE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub bind: String,
    /// Allowed CORS origin; any origin when unset.
    pub frontend_url: Option<String>,
    pub http_timeout_secs: u64,
    pub stream_buffer: usize,
    pub fallback_chunk_chars: usize,
    pub fallback_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        let replay = ReplayConfig::default();
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: params.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            cache_ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
            sweep_interval_secs: crate::cache::DEFAULT_SWEEP_INTERVAL.as_secs(),
            bind: "0.0.0.0:8000".to_string(),
            frontend_url: None,
            http_timeout_secs: 120,
            stream_buffer: replay.live_buffer,
            fallback_chunk_chars: replay.fallback_chunk_chars,
            fallback_delay_ms: replay.fallback_delay.as_millis() as u64,
        }
    }
}

impl ServiceConfig {
    /// Parse a YAML document; missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Defaults overridden by the process environment, then validated.
    pub fn from_env() -> crate::Result<Self> {
        let config = Self::default().with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Full layering: defaults, the `QURANSCOPE_CONFIG` file if set, then
    /// the environment.
    pub fn load() -> crate::Result<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        let config = base.with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config file");
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read config file: {e}"),
                ErrorContext::new()
                    .with_field_path(CONFIG_PATH_ENV)
                    .with_details(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Apply environment-style overrides from `var`.
    pub fn with_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = text("OPENAI_BASE_URL") {
            self.openai_base_url = v;
        }
        if let Some(v) = text("QURANSCOPE_MODEL") {
            self.model = v;
        }
        if let Some(v) = text("QURANSCOPE_BIND") {
            self.bind = v;
        }
        if let Some(v) = text("FRONTEND_URL") {
            self.frontend_url = Some(v);
        }
        let number = |name: &str| text(name).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(v) = number("QURANSCOPE_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = number("QURANSCOPE_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = v;
        }
        if let Some(v) = number("AI_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v;
        }
        self
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api_key().is_none() {
            return Err(invalid(
                "OPENAI_API_KEY",
                "missing provider API key",
                "set OPENAI_API_KEY in the environment or .env",
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(invalid(
                "sweep_interval_secs",
                "sweep interval must be positive",
                "got 0",
            ));
        }
        if self.stream_buffer == 0 {
            return Err(invalid("stream_buffer", "stream buffer must be positive", "got 0"));
        }
        if self.fallback_chunk_chars == 0 {
            return Err(invalid(
                "fallback_chunk_chars",
                "fallback chunk size must be positive",
                "got 0",
            ));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            fallback_chunk_chars: self.fallback_chunk_chars,
            fallback_delay: Duration::from_millis(self.fallback_delay_ms),
            live_buffer: self.stream_buffer,
        }
    }
}

fn invalid(field: &str, message: &str, details: &str) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("config_loader"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_service_constants() {
        let c = ServiceConfig::default();
        assert_eq!(c.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.max_tokens, 400);
        assert_eq!(c.cache_ttl(), Duration::from_secs(43_200));
        assert_eq!(c.sweep_interval(), Duration::from_secs(600));
        assert_eq!(c.bind, "0.0.0.0:8000");
        assert_eq!(c.http_timeout(), Duration::from_secs(120));
        assert_eq!(c.replay_config(), ReplayConfig::default());
        assert!(c.frontend_url.is_none());
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let c = ServiceConfig::from_yaml_str(
            "model: gpt-4o-mini\ncache_ttl_secs: 60\nfrontend_url: https://example.org\n",
        )
        .unwrap();
        assert_eq!(c.model, "gpt-4o-mini");
        assert_eq!(c.cache_ttl_secs, 60);
        assert_eq!(c.frontend_url.as_deref(), Some("https://example.org"));
        assert_eq!(c.max_tokens, 400);
        assert_eq!(c.fallback_chunk_chars, 48);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = ServiceConfig::from_yaml_str("max_tokens: [1, 2]").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn env_overrides_win() {
        let c = ServiceConfig::from_yaml_str("model: from-file\n")
            .unwrap()
            .with_overrides(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("QURANSCOPE_MODEL", "from-env"),
                ("QURANSCOPE_BIND", "127.0.0.1:9000"),
                ("QURANSCOPE_CACHE_TTL_SECS", "30"),
                ("AI_HTTP_TIMEOUT_SECS", "5"),
            ]));
        assert_eq!(c.api_key(), Some("sk-test"));
        assert_eq!(c.model, "from-env");
        assert_eq!(c.bind, "127.0.0.1:9000");
        assert_eq!(c.cache_ttl(), Duration::from_secs(30));
        assert_eq!(c.http_timeout(), Duration::from_secs(5));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn invalid_numeric_env_is_ignored() {
        let c = ServiceConfig::default().with_overrides(env(&[
            ("QURANSCOPE_CACHE_TTL_SECS", "twelve hours"),
            ("QURANSCOPE_SWEEP_INTERVAL_SECS", "-1"),
        ]));
        assert_eq!(c.cache_ttl_secs, 43_200);
        assert_eq!(c.sweep_interval_secs, 600);
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let c = ServiceConfig::default().with_overrides(env(&[("OPENAI_API_KEY", "  ")]));
        let err = c.validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|ctx| ctx.field_path.as_deref()),
            Some("OPENAI_API_KEY")
        );
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let mut c = ServiceConfig::default().with_overrides(env(&[("OPENAI_API_KEY", "k")]));
        c.sweep_interval_secs = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn api_key_is_not_serialized() {
        let c = ServiceConfig::default().with_overrides(env(&[("OPENAI_API_KEY", "secret")]));
        let yaml = serde_yaml::to_string(&c).unwrap();
        assert!(!yaml.contains("secret"));
    }
}
