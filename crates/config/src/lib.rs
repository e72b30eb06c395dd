//! Configuration loading, validation, and management for Asika.
//!
//! Loads configuration from `$ASIKA_CONFIG` or `~/.asika/config.toml`, then
//! applies environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.asika/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Timeout for model calls, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge corpus and retrieval
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Conversation transcript window
    #[serde(default)]
    pub history: HistoryConfig,

    /// Registration marker protocol and external schema
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// External workflow dispatch
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Document and image field extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Cost accounting
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "openai/gpt-oss-20b".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_provider_timeout() -> u64 {
    60
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("knowledge", &self.knowledge)
            .field("history", &self.history)
            .field("registration", &self.registration)
            .field("dispatch", &self.dispatch)
            .field("extraction", &self.extraction)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_max_upload_bytes() -> usize {
    15 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// How the knowledge context is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeMode {
    /// Concatenate every document in the corpus directory up to a budget.
    Static,
    /// Embed the corpus and retrieve the top passages per question.
    Retrieval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_mode")]
    pub mode: KnowledgeMode,

    /// Directory holding the plain-text corpus
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Character budget for the static context block
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Passages returned per retrieval
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Target passage size when chunking the corpus for retrieval
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Provider used for embeddings (defaults to `default_provider`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_knowledge_mode() -> KnowledgeMode {
    KnowledgeMode::Static
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_max_context_chars() -> usize {
    25_000
}
fn default_top_k() -> usize {
    4
}
fn default_chunk_chars() -> usize {
    1_200
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            mode: default_knowledge_mode(),
            corpus_dir: default_corpus_dir(),
            max_context_chars: default_max_context_chars(),
            top_k: default_top_k(),
            chunk_chars: default_chunk_chars(),
            embedding_provider: None,
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of most recent messages rendered into the transcript
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    12
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

/// One field of the external workflow schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Canonical key sent to the external workflow
    pub name: String,

    /// Keys accepted from the model, first match wins. Empty means `[name]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Type hint given to the model ("string", "YYYY-MM-DD", ...)
    #[serde(default = "default_field_type")]
    pub hint: String,
}

fn default_field_type() -> String {
    "string".into()
}

impl FieldSpec {
    pub fn new(name: &str, aliases: &[&str], hint: &str) -> Self {
        Self {
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            hint: hint.into(),
        }
    }

    /// The keys to look up, in priority order.
    pub fn lookup_keys(&self) -> Vec<&str> {
        if self.aliases.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.aliases.iter().map(String::as_str).collect()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Leading marker token the model writes before the JSON payload
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Optional trailing marker token
    #[serde(default = "default_trailing_sentinel")]
    pub trailing_sentinel: String,

    /// External workflow schema, in output order
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldSpec>,

    /// Fields that must be non-null before dispatch
    #[serde(default = "default_required_fields")]
    pub required: Vec<String>,
}

fn default_sentinel() -> String {
    "~~~REGISTER_PATIENT_JSON:".into()
}
fn default_trailing_sentinel() -> String {
    "~~~".into()
}

fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("firstName", &["firstName", "first_name"], "string"),
        FieldSpec::new("lastName", &["lastName", "last_name"], "string"),
        FieldSpec::new(
            "dateOfBirth",
            &["dob", "dateOfBirth", "date_of_birth"],
            "YYYY-MM-DD",
        ),
        FieldSpec::new("gender", &[], "string"),
        FieldSpec::new("country", &[], "string"),
        FieldSpec::new("phone", &["phone", "phoneNumber"], "string"),
        FieldSpec::new("cause", &["cause", "reason"], "string"),
        FieldSpec::new(
            "additionalInfo",
            &["additionalInfo", "additional_info"],
            "string",
        ),
        FieldSpec::new("hospitalId", &["hospitalId", "hospital_id"], "string"),
        FieldSpec::new("paymentMode", &["paymentMode", "payment_mode"], "string"),
        FieldSpec::new(
            "referringPhysician",
            &["referringPhysician", "referring_physician", "doctorName"],
            "string",
        ),
    ]
}

fn default_required_fields() -> Vec<String> {
    ["firstName", "lastName", "dateOfBirth", "gender", "phone", "cause"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            trailing_sentinel: default_trailing_sentinel(),
            fields: default_fields(),
            required: default_required_fields(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// External workflow endpoint. Unset means dispatch is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_dispatch_timeout")]
    pub timeout_secs: u64,

    /// Suppress re-delivery of an identical record within this window.
    /// 0 disables suppression.
    #[serde(default)]
    pub dedup_window_secs: u64,
}

fn default_dispatch_timeout() -> u64 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_dispatch_timeout(),
            dedup_window_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Model used to structure extracted document text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Vision model used for ID image extraction
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Length of the raw-text preview returned with uploads
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".into()
}
fn default_preview_chars() -> usize {
    1_000
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            vision_model: default_vision_model(),
            preview_chars: default_preview_chars(),
        }
    }
}

/// Cost accounting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Custom model pricing overrides (model name → pricing)
    #[serde(default)]
    pub custom_pricing: HashMap<String, PricingOverrideConfig>,
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
}

impl AppConfig {
    /// Load configuration from `$ASIKA_CONFIG` or the default path, then
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("ASIKA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Recognized: `ASIKA_API_KEY`, `GROQ_API_KEY`, `ASIKA_MODEL`,
    /// `GROQ_MODEL`, `OUTPUT_DIR`, `MAX_CONTEXT_CHARS`, `ALLOWED_ORIGINS`,
    /// `HOST`, `PORT`, `ASIKA_DISPATCH_URL`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = lookup("ASIKA_API_KEY").or_else(|| lookup("GROQ_API_KEY"));
        }

        if let Some(model) = lookup("ASIKA_MODEL").or_else(|| lookup("GROQ_MODEL")) {
            self.default_model = model;
        }

        if let Some(dir) = lookup("OUTPUT_DIR") {
            self.knowledge.corpus_dir = PathBuf::from(dir);
        }

        if let Some(chars) = lookup("MAX_CONTEXT_CHARS") {
            self.knowledge.max_context_chars = parse_env("MAX_CONTEXT_CHARS", &chars)?;
        }

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.gateway.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(host) = lookup("HOST") {
            self.gateway.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = parse_env("PORT", &port)?;
        }

        if let Some(url) = lookup("ASIKA_DISPATCH_URL") {
            let url = url.trim().to_string();
            self.dispatch.url = (!url.is_empty()).then_some(url);
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".asika")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.registration.sentinel.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "registration.sentinel must not be empty".into(),
            ));
        }

        if self.registration.fields.is_empty() {
            return Err(ConfigError::ValidationError(
                "registration.fields must declare at least one field".into(),
            ));
        }

        for required in &self.registration.required {
            if !self.registration.fields.iter().any(|f| &f.name == required) {
                return Err(ConfigError::ValidationError(format!(
                    "required field '{required}' is not declared in registration.fields"
                )));
            }
        }

        if self.provider_timeout_secs == 0 || self.dispatch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        if self.knowledge.mode == KnowledgeMode::Retrieval && self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be > 0 in retrieval mode".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Model used for document structuring.
    pub fn extraction_model(&self) -> &str {
        self.extraction
            .model
            .as_deref()
            .unwrap_or(&self.default_model)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has an invalid value: {value}")))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            provider_timeout_secs: default_provider_timeout(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            knowledge: KnowledgeConfig::default(),
            history: HistoryConfig::default(),
            registration: RegistrationConfig::default(),
            dispatch: DispatchConfig::default(),
            extraction: ExtractionConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, "groq");
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.knowledge.max_context_chars, 25_000);
        assert!(config.dispatch.url.is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_model, config.default_model);
        assert_eq!(parsed.registration.fields, config.registration.fields);
        assert_eq!(parsed.registration.required, config.registration.required);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn required_field_must_be_declared() {
        let mut config = AppConfig::default();
        config.registration.required.push("insuranceNumber".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("insuranceNumber"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "groq");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "llama-3.3-70b-versatile"

[dispatch]
url = "https://automation.example.org/webhook/register"
timeout_secs = 5

[registration]
required = ["firstName", "hospitalId"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "llama-3.3-70b-versatile");
        assert_eq!(config.dispatch.timeout_secs, 5);
        assert_eq!(config.registration.required, vec!["firstName", "hospitalId"]);
        // Schema falls back to the default field set
        assert!(config.registration.fields.iter().any(|f| f.name == "hospitalId"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env_from(&[
                ("GROQ_API_KEY", "gsk-test"),
                ("GROQ_MODEL", "llama-3.1-8b-instant"),
                ("OUTPUT_DIR", "/srv/corpus"),
                ("MAX_CONTEXT_CHARS", "500"),
                ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
                ("PORT", "8080"),
                ("ASIKA_DISPATCH_URL", "http://localhost:5678/webhook"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.default_model, "llama-3.1-8b-instant");
        assert_eq!(config.knowledge.corpus_dir, PathBuf::from("/srv/corpus"));
        assert_eq!(config.knowledge.max_context_chars, 500);
        assert_eq!(
            config.gateway.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(
            config.dispatch.url.as_deref(),
            Some("http://localhost:5678/webhook")
        );
    }

    #[test]
    fn asika_key_takes_priority_over_groq_key() {
        let mut config = AppConfig::default();
        config
            .apply_env(env_from(&[("ASIKA_API_KEY", "a"), ("GROQ_API_KEY", "g")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("a"));
    }

    #[test]
    fn invalid_numeric_env_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env_from(&[("MAX_CONTEXT_CHARS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("MAX_CONTEXT_CHARS"));
    }

    #[test]
    fn blank_dispatch_url_disables_dispatch() {
        let mut config = AppConfig::default();
        config.dispatch.url = Some("http://x".into());
        config
            .apply_env(env_from(&[("ASIKA_DISPATCH_URL", "  ")]))
            .unwrap();
        assert!(config.dispatch.url.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn field_spec_lookup_keys() {
        let dob = FieldSpec::new("dateOfBirth", &["dob", "dateOfBirth"], "YYYY-MM-DD");
        assert_eq!(dob.lookup_keys(), vec!["dob", "dateOfBirth"]);
        let gender = FieldSpec::new("gender", &[], "string");
        assert_eq!(gender.lookup_keys(), vec!["gender"]);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("groq"));
        assert!(toml_str.contains("REGISTER_PATIENT_JSON"));
    }
}
