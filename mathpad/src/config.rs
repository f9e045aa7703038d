use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default evaluation service address.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8787/evaluate";

/// Front-end configuration that extends the base `Config` from core.
///
/// This configuration includes:
/// - All options from `mathpad_core::Config` (flattened via serde)
/// - The evaluation service endpoint
/// - The request timeout for that service
///
/// # Example
///
/// ```rust
/// use mathpad::MathpadConfig;
///
/// let config = MathpadConfig::from_toml_str("timeout_ms = 250\n").unwrap();
/// assert_eq!(config.timeout_ms, 250);
/// assert_eq!(config.base().error_clear_delay_ms, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MathpadConfig {
    /// URL the evaluator POSTs expressions to
    pub endpoint: String,

    /// Evaluator request timeout (ms)
    pub timeout_ms: u64,

    /// Core options (error delay, display mode, result format)
    #[serde(flatten)]
    pub base: mathpad_core::Config,
}

impl Default for MathpadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 500,
            base: mathpad_core::Config::default(),
        }
    }
}

impl MathpadConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Convert into the base config for use with `CalcEngine`.
    pub fn into_base(self) -> mathpad_core::Config {
        self.base
    }

    /// Get a reference to the base config
    pub fn base(&self) -> &mathpad_core::Config {
        &self.base
    }

    /// Get a mutable reference to the base config
    pub fn base_mut(&mut self) -> &mut mathpad_core::Config {
        &mut self.base
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Set the endpoint. Empty strings are ignored.
    pub fn set_endpoint(&mut self, endpoint: &str) {
        if !endpoint.is_empty() {
            self.endpoint = endpoint.to_string();
        }
    }
}
