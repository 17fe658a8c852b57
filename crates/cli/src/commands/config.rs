use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use shopsense_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "SHOPSENSE_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "SHOPSENSE_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "SHOPSENSE_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "ollama.base_url",
        &config.ollama.base_url,
        source("ollama.base_url", "SHOPSENSE_OLLAMA_BASE_URL"),
    ));
    lines.push(render_line(
        "ollama.model",
        &config.ollama.model,
        source("ollama.model", "SHOPSENSE_OLLAMA_MODEL"),
    ));
    lines.push(render_line(
        "ollama.embedding_dimension",
        &config.ollama.embedding_dimension.to_string(),
        source("ollama.embedding_dimension", "SHOPSENSE_OLLAMA_EMBEDDING_DIMENSION"),
    ));
    lines.push(render_line(
        "ollama.timeout_secs",
        &config.ollama.timeout_secs.to_string(),
        source("ollama.timeout_secs", "SHOPSENSE_OLLAMA_TIMEOUT_SECS"),
    ));
    lines.push(render_line(
        "ollama.max_retries",
        &config.ollama.max_retries.to_string(),
        source("ollama.max_retries", "SHOPSENSE_OLLAMA_MAX_RETRIES"),
    ));
    lines.push(render_line(
        "ollama.retry_delay_secs",
        &config.ollama.retry_delay_secs.to_string(),
        source("ollama.retry_delay_secs", "SHOPSENSE_OLLAMA_RETRY_DELAY_SECS"),
    ));

    lines.push(render_line(
        "recommendation.min_score",
        &config.recommendation.min_score.to_string(),
        source("recommendation.min_score", "SHOPSENSE_RECOMMENDATION_MIN_SCORE"),
    ));
    lines.push(render_line(
        "recommendation.top_n",
        &config.recommendation.top_n.to_string(),
        source("recommendation.top_n", "SHOPSENSE_RECOMMENDATION_TOP_N"),
    ));
    lines.push(render_line(
        "recommendation.similar_customer_limit",
        &config.recommendation.similar_customer_limit.to_string(),
        source(
            "recommendation.similar_customer_limit",
            "SHOPSENSE_RECOMMENDATION_SIMILAR_CUSTOMER_LIMIT",
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "SHOPSENSE_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "SHOPSENSE_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("shopsense.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/shopsense.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
