use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ollama: OllamaConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_dimension: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub min_score: f64,
    pub top_n: usize,
    pub similar_customer_limit: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub ollama_base_url: Option<String>,
    pub ollama_model: Option<String>,
    pub min_score: Option<f64>,
    pub top_n: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopsense.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            ollama: OllamaConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "qwen2.5:0.5b".to_string(),
                embedding_dimension: 384,
                timeout_secs: 30,
                max_retries: 3,
                retry_delay_secs: 2,
            },
            recommendation: RecommendationConfig {
                min_score: 0.3,
                top_n: 5,
                similar_customer_limit: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopsense.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(ollama) = patch.ollama {
            if let Some(base_url) = ollama.base_url {
                self.ollama.base_url = base_url;
            }
            if let Some(model) = ollama.model {
                self.ollama.model = model;
            }
            if let Some(embedding_dimension) = ollama.embedding_dimension {
                self.ollama.embedding_dimension = embedding_dimension;
            }
            if let Some(timeout_secs) = ollama.timeout_secs {
                self.ollama.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = ollama.max_retries {
                self.ollama.max_retries = max_retries;
            }
            if let Some(retry_delay_secs) = ollama.retry_delay_secs {
                self.ollama.retry_delay_secs = retry_delay_secs;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(min_score) = recommendation.min_score {
                self.recommendation.min_score = min_score;
            }
            if let Some(top_n) = recommendation.top_n {
                self.recommendation.top_n = top_n;
            }
            if let Some(similar_customer_limit) = recommendation.similar_customer_limit {
                self.recommendation.similar_customer_limit = similar_customer_limit;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPSENSE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHOPSENSE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHOPSENSE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPSENSE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPSENSE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPSENSE_OLLAMA_BASE_URL") {
            self.ollama.base_url = value;
        }
        if let Some(value) = read_env("SHOPSENSE_OLLAMA_MODEL") {
            self.ollama.model = value;
        }
        if let Some(value) = read_env("SHOPSENSE_OLLAMA_EMBEDDING_DIMENSION") {
            self.ollama.embedding_dimension =
                parse_usize("SHOPSENSE_OLLAMA_EMBEDDING_DIMENSION", &value)?;
        }
        if let Some(value) = read_env("SHOPSENSE_OLLAMA_TIMEOUT_SECS") {
            self.ollama.timeout_secs = parse_u64("SHOPSENSE_OLLAMA_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SHOPSENSE_OLLAMA_MAX_RETRIES") {
            self.ollama.max_retries = parse_u32("SHOPSENSE_OLLAMA_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("SHOPSENSE_OLLAMA_RETRY_DELAY_SECS") {
            self.ollama.retry_delay_secs = parse_u64("SHOPSENSE_OLLAMA_RETRY_DELAY_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPSENSE_RECOMMENDATION_MIN_SCORE") {
            self.recommendation.min_score = parse_f64("SHOPSENSE_RECOMMENDATION_MIN_SCORE", &value)?;
        }
        if let Some(value) = read_env("SHOPSENSE_RECOMMENDATION_TOP_N") {
            self.recommendation.top_n = parse_usize("SHOPSENSE_RECOMMENDATION_TOP_N", &value)?;
        }
        if let Some(value) = read_env("SHOPSENSE_RECOMMENDATION_SIMILAR_CUSTOMER_LIMIT") {
            self.recommendation.similar_customer_limit =
                parse_usize("SHOPSENSE_RECOMMENDATION_SIMILAR_CUSTOMER_LIMIT", &value)?;
        }

        let log_level =
            read_env("SHOPSENSE_LOGGING_LEVEL").or_else(|| read_env("SHOPSENSE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPSENSE_LOGGING_FORMAT").or_else(|| read_env("SHOPSENSE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.ollama_base_url {
            self.ollama.base_url = base_url;
        }
        if let Some(model) = overrides.ollama_model {
            self.ollama.model = model;
        }
        if let Some(min_score) = overrides.min_score {
            self.recommendation.min_score = min_score;
        }
        if let Some(top_n) = overrides.top_n {
            self.recommendation.top_n = top_n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_ollama(&self.ollama)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopsense.toml"), PathBuf::from("config/shopsense.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_ollama(ollama: &OllamaConfig) -> Result<(), ConfigError> {
    let base_url = ollama.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "ollama.base_url must start with http:// or https://".to_string(),
        ));
    }

    if ollama.model.trim().is_empty() {
        return Err(ConfigError::Validation("ollama.model must not be empty".to_string()));
    }

    if ollama.embedding_dimension == 0 {
        return Err(ConfigError::Validation(
            "ollama.embedding_dimension must be greater than zero".to_string(),
        ));
    }

    if ollama.timeout_secs == 0 || ollama.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "ollama.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if ollama.max_retries == 0 {
        return Err(ConfigError::Validation(
            "ollama.max_retries must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if !recommendation.min_score.is_finite()
        || recommendation.min_score < 0.0
        || recommendation.min_score > 1.0
    {
        return Err(ConfigError::Validation(
            "recommendation.min_score must be in range 0.0..=1.0".to_string(),
        ));
    }

    if recommendation.top_n == 0 {
        return Err(ConfigError::Validation(
            "recommendation.top_n must be greater than zero".to_string(),
        ));
    }

    if recommendation.similar_customer_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendation.similar_customer_limit must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    ollama: Option<OllamaPatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaPatch {
    base_url: Option<String>,
    model: Option<String>,
    embedding_dimension: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    min_score: Option<f64>,
    top_n: Option<usize>,
    similar_customer_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
