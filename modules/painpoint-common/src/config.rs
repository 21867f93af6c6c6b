use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::PainpointError;

/// Application configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Artifacts
    pub data_dir: PathBuf,
    /// Request directories kept under `data_dir`; 0 keeps all of them.
    pub data_retention_runs: usize,

    // Acquisition
    pub max_sources: u32,
    pub reviews_per_source: usize,
    pub store_country: String,
    pub source_timeout: Duration,

    // Filtering
    pub negativity_threshold: f64,

    // Synthesis
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_structured_output: bool,
    pub llm_temperature: f32,
    pub llm_top_p: f32,
    pub llm_max_tokens: u32,
    pub generation_timeout: Duration,

    // Test mode
    pub fixture_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            data_dir: PathBuf::from("data"),
            data_retention_runs: 100,
            max_sources: 3,
            reviews_per_source: 200,
            store_country: "us".to_string(),
            source_timeout: Duration::from_secs(30),
            negativity_threshold: -0.5,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "Qwen/Qwen3-8B".to_string(),
            llm_structured_output: true,
            llm_temperature: 0.7,
            llm_top_p: 0.8,
            llm_max_tokens: 2048,
            generation_timeout: Duration::from_secs(300),
            fixture_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    /// Malformed values are an error rather than silently defaulted.
    pub fn from_env() -> Result<Self, PainpointError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parsed_env("API_PORT", defaults.api_port)?,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            data_retention_runs: parsed_env("DATA_RETENTION_RUNS", defaults.data_retention_runs)?,
            max_sources: parsed_env("MAX_SOURCES", defaults.max_sources)?,
            reviews_per_source: parsed_env("REVIEWS_PER_SOURCE", defaults.reviews_per_source)?,
            store_country: env::var("STORE_COUNTRY").unwrap_or(defaults.store_country),
            source_timeout: Duration::from_secs(parsed_env(
                "SOURCE_TIMEOUT_SECS",
                defaults.source_timeout.as_secs(),
            )?),
            negativity_threshold: parsed_env(
                "NEGATIVITY_THRESHOLD",
                defaults.negativity_threshold,
            )?,
            llm_base_url: env::var("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_api_key: env::var("LLM_API_KEY")
                .or_else(|_| env::var("OPENAI_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty()),
            llm_model: env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_structured_output: parsed_env(
                "LLM_STRUCTURED_OUTPUT",
                defaults.llm_structured_output,
            )?,
            llm_temperature: parsed_env("LLM_TEMPERATURE", defaults.llm_temperature)?,
            llm_top_p: parsed_env("LLM_TOP_P", defaults.llm_top_p)?,
            llm_max_tokens: parsed_env("LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            generation_timeout: Duration::from_secs(parsed_env(
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            fixture_path: env::var("FIXTURE_PATH").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PainpointError> {
        if !(-1.0..=1.0).contains(&self.negativity_threshold) {
            return Err(PainpointError::Config(format!(
                "NEGATIVITY_THRESHOLD must be within [-1, 1], got {}",
                self.negativity_threshold
            )));
        }
        if self.max_sources == 0 {
            return Err(PainpointError::Config(
                "MAX_SOURCES must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Log configuration with secrets redacted.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(4).collect();
            format!("{head}...")
        }

        tracing::info!(
            data_dir = %self.data_dir.display(),
            data_retention_runs = self.data_retention_runs,
            max_sources = self.max_sources,
            reviews_per_source = self.reviews_per_source,
            store_country = %self.store_country,
            negativity_threshold = self.negativity_threshold,
            llm_base_url = %self.llm_base_url,
            llm_model = %self.llm_model,
            llm_api_key = %self.llm_api_key.as_deref().map(preview).unwrap_or_else(|| "(none)".to_string()),
            structured_output = self.llm_structured_output,
            "Loaded configuration"
        );
    }
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, PainpointError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            PainpointError::Config(format!("{key} has invalid value '{raw}': {e}"))
        }),
        _ => Ok(default),
    }
}
