//! Application configuration for the categorizer.
//!
//! User config lives at `~/.categorizer/categorizer.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClassificationError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "categorizer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".categorizer";

// ---------------------------------------------------------------------------
// Config structs (matching categorizer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Website scraping settings.
    #[serde(default)]
    pub scraping: ScrapingConfig,

    /// Generation service settings.
    #[serde(default)]
    pub genai: GenAiConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Rows classified concurrently in batch mode.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Page fetches allowed in flight for one row.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Search results aggregated when the website yields nothing.
    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// Word cap applied to each page summary.
    #[serde(default = "default_max_summary_words")]
    pub max_summary_words: usize,

    /// Input column holding a pre-existing category to compare against.
    #[serde(default = "default_current_category_column")]
    pub current_category_column: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: default_batch_concurrency(),
            fetch_concurrency: default_fetch_concurrency(),
            search_results: default_search_results(),
            max_summary_words: default_max_summary_words(),
            current_category_column: default_current_category_column(),
        }
    }
}

fn default_batch_concurrency() -> usize {
    10
}
fn default_fetch_concurrency() -> usize {
    20
}
fn default_search_results() -> usize {
    5
}
fn default_max_summary_words() -> usize {
    50_000
}
fn default_current_category_column() -> String {
    "CS Sales LOB".into()
}

/// `[scraping]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Timeout for the homepage fetch used by page discovery.
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,

    /// Timeout for each page content fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Visible text kept per page, in characters.
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,

    /// HTML search endpoint used as the content fallback.
    #[serde(default = "default_search_url")]
    pub search_url: String,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_secs: default_discovery_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_page_chars: default_max_page_chars(),
            search_url: default_search_url(),
        }
    }
}

fn default_discovery_timeout() -> u64 {
    10
}
fn default_fetch_timeout() -> u64 {
    15
}
fn default_max_page_chars() -> usize {
    100_000
}
fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}

/// `[genai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    /// Base URL of the inference service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent in the serving mode.
    #[serde(default)]
    pub model_id: String,

    /// Compartment the request is billed to.
    #[serde(default)]
    pub compartment_id: String,

    /// Name of the env var holding an optional bearer token (never the token itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default)]
    pub top_p: f32,

    #[serde(default)]
    pub top_k: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound on one whole streamed exchange.
    #[serde(default = "default_genai_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model_id: String::new(),
            compartment_id: String::new(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            frequency_penalty: 0.0,
            top_p: 0.0,
            top_k: 0,
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_genai_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://inference.generativeai.us-chicago-1.oci.oraclecloud.com".into()
}
fn default_api_key_env() -> String {
    "CATEGORIZER_API_KEY".into()
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_genai_timeout() -> u64 {
    240
}

impl AppConfig {
    /// Apply `CATEGORIZER_*` overrides using the given variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CATEGORIZER_MODEL_ID") {
            self.genai.model_id = v;
        }
        if let Some(v) = lookup("CATEGORIZER_COMPARTMENT_ID") {
            self.genai.compartment_id = v;
        }
        if let Some(v) = lookup("CATEGORIZER_ENDPOINT") {
            self.genai.endpoint = v;
        }
        if let Some(v) = lookup("CATEGORIZER_MAX_TOKENS") {
            self.genai.max_tokens = v.parse().map_err(|_| {
                ClassificationError::config(format!("CATEGORIZER_MAX_TOKENS is not a number: {v}"))
            })?;
        }
        Ok(())
    }

    /// Check that the generation service is configured well enough to call.
    pub fn validate_genai(&self) -> Result<()> {
        if self.genai.model_id.trim().is_empty() {
            return Err(ClassificationError::config(
                "no model configured. Set genai.model_id in the config file \
                 or the CATEGORIZER_MODEL_ID environment variable",
            ));
        }
        if self.genai.compartment_id.trim().is_empty() {
            return Err(ClassificationError::config(
                "no compartment configured. Set genai.compartment_id in the config file \
                 or the CATEGORIZER_COMPARTMENT_ID environment variable",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scraping configuration for discovery, fetching, and search.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub discovery_timeout: Duration,
    pub fetch_timeout: Duration,
    pub max_page_chars: usize,
    pub fetch_concurrency: usize,
    pub search_url: String,
    pub search_results: usize,
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            discovery_timeout: Duration::from_secs(config.scraping.discovery_timeout_secs),
            fetch_timeout: Duration::from_secs(config.scraping.fetch_timeout_secs),
            max_page_chars: config.scraping.max_page_chars,
            fetch_concurrency: config.defaults.fetch_concurrency.max(1),
            search_url: config.scraping.search_url.clone(),
            search_results: config.defaults.search_results,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime generation-service configuration with the bearer token resolved.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model_id: String,
    pub compartment_id: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl From<&AppConfig> for GenerationConfig {
    fn from(config: &AppConfig) -> Self {
        let genai = &config.genai;
        let api_key = std::env::var(&genai.api_key_env)
            .ok()
            .filter(|v| !v.is_empty());

        Self {
            endpoint: genai.endpoint.trim_end_matches('/').to_string(),
            model_id: genai.model_id.clone(),
            compartment_id: genai.compartment_id.clone(),
            api_key,
            max_tokens: genai.max_tokens,
            temperature: genai.temperature,
            frequency_penalty: genai.frequency_penalty,
            top_p: genai.top_p,
            top_k: genai.top_k,
            connect_timeout: Duration::from_secs(genai.connect_timeout_secs),
            timeout: Duration::from_secs(genai.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.categorizer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ClassificationError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.categorizer/categorizer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk with environment overrides applied.
/// Returns defaults (plus overrides) if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ClassificationError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ClassificationError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ClassificationError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config)
        .map_err(|e| ClassificationError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ClassificationError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("batch_concurrency"));
        assert!(toml_str.contains("CATEGORIZER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.batch_concurrency, 10);
        assert_eq!(parsed.scraping.fetch_timeout_secs, 15);
        assert_eq!(parsed.genai.max_tokens, 4000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[genai]
model_id = "cohere.command-r-plus"
compartment_id = "compartment-1"

[defaults]
batch_concurrency = 4
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.batch_concurrency, 4);
        assert_eq!(config.defaults.fetch_concurrency, 20);
        assert_eq!(config.genai.top_k, 0);
        assert!(config.validate_genai().is_ok());
    }

    #[test]
    fn scrape_config_from_app_config() {
        let app = AppConfig::default();
        let scrape = ScrapeConfig::from(&app);
        assert_eq!(scrape.discovery_timeout, Duration::from_secs(10));
        assert_eq!(scrape.fetch_timeout, Duration::from_secs(15));
        assert_eq!(scrape.max_page_chars, 100_000);
        assert_eq!(scrape.search_results, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|name| match name {
                "CATEGORIZER_MODEL_ID" => Some("model-x".into()),
                "CATEGORIZER_MAX_TOKENS" => Some("1200".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.genai.model_id, "model-x");
        assert_eq!(config.genai.max_tokens, 1200);
        assert!(config.genai.compartment_id.is_empty());
    }

    #[test]
    fn env_override_rejects_bad_number() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|name| {
            (name == "CATEGORIZER_MAX_TOKENS").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn missing_model_fails_validation() {
        let config = AppConfig::default();
        let err = config.validate_genai().unwrap_err();
        assert!(err.to_string().contains("no model configured"));
    }
}
