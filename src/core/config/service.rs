use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::types::BotConfig;
use super::validation::validate_config;
use crate::core::errors::BotError;

const REDACT_PLACEHOLDER: &str = "****";

/// Environment variables checked for the LLM credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "OPENAI_API_KEY"];

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "private_key",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "fallback_max_tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("GARDEN_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    pub fn load_config(&self) -> Result<Value, BotError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let merged = deep_merge(&public_config, &secrets_config);
        validate_config(&merged)?;
        Ok(merged)
    }

    /// Load, validate and type the configuration, resolving relative file
    /// paths against the project root.
    pub fn load_bot_config(&self) -> Result<BotConfig, BotError> {
        let raw = self.load_config()?;
        tracing::debug!(
            "Effective configuration: {}",
            redact_sensitive_values(&raw)
        );

        let mut config: BotConfig = serde_json::from_value(raw)
            .map_err(|err| BotError::InvalidConfig(err.to_string()))?;

        config.knowledge.corpus_path = self.paths.resolve(&config.knowledge.corpus_path);
        config.knowledge.db_path = Some(match config.knowledge.db_path.take() {
            Some(path) => self.paths.resolve(&path),
            None => self.paths.db_path.clone(),
        });
        config.responder.intent_prompt = self.paths.resolve(&config.responder.intent_prompt);
        config.responder.intent_list = self.paths.resolve(&config.responder.intent_list);
        for steps in config.responder.chains.values_mut() {
            for step in steps.iter_mut() {
                step.template = self.paths.resolve(&step.template);
            }
        }

        Ok(config)
    }

    /// Resolve the LLM credential. Missing credentials are reported here,
    /// at startup, instead of on the first request.
    pub fn api_key(&self, config: &BotConfig) -> Result<String, BotError> {
        resolve_api_key(
            API_KEY_VARS.iter().filter_map(|name| env::var(name).ok()),
            config.llm.api_key.as_deref(),
        )
    }
}

fn resolve_api_key<I>(env_values: I, configured: Option<&str>) -> Result<String, BotError>
where
    I: IntoIterator<Item = String>,
{
    env_values
        .into_iter()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| {
            configured
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| {
            BotError::ConfigMissing(format!(
                "LLM API key not found; set {} or llm.api_key in secrets.yaml",
                API_KEY_VARS.join(" or ")
            ))
        })
}

fn load_yaml_file(path: &Path) -> Result<Value, BotError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|err| {
        BotError::InvalidConfig(format!("failed to read {}: {}", path.display(), err))
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|err| {
        BotError::InvalidConfig(format!("failed to parse {}: {}", path.display(), err))
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(BotError::InvalidConfig(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, item) in map {
                if is_sensitive_key(key) && !item.is_object() && !item.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(item));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    if SENSITIVE_WHITELIST.contains(&lowered.as_str()) {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}
