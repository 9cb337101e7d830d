use serde_json::{Map, Value};

use super::defaults::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::core::errors::BotError;

pub fn validate_config(config: &Value) -> Result<(), BotError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 600)?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_optional_string_field(agent, "agent.system_prompt", "system_prompt")?;
        validate_f64_field(agent, "agent.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(agent, "agent.max_tokens", "max_tokens", 1, 32_768)?;
        validate_u64_field(agent, "agent.top_k", "top_k", 1, 100)?;
    }

    if let Some(knowledge) = expect_optional_object(root, "knowledge")? {
        validate_optional_string_field(knowledge, "knowledge.corpus_path", "corpus_path")?;
        validate_optional_string_field(knowledge, "knowledge.db_path", "db_path")?;
        validate_optional_string_field(knowledge, "knowledge.separator", "separator")?;
        validate_u64_field(knowledge, "knowledge.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            knowledge,
            "knowledge.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;

        let chunk_size = knowledge
            .get("chunk_size")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_CHUNK_SIZE as u64);
        let overlap = knowledge
            .get("chunk_overlap")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_CHUNK_OVERLAP as u64);
        if overlap >= chunk_size {
            return Err(BotError::InvalidConfig(format!(
                "'knowledge.chunk_overlap' ({}) must be smaller than 'knowledge.chunk_size' ({})",
                overlap, chunk_size
            )));
        }

        if let Some(collection) = knowledge.get("collection") {
            let Some(name) = collection.as_str() else {
                return Err(config_type_error("knowledge.collection", "string"));
            };
            if name.trim().is_empty() {
                return Err(BotError::InvalidConfig(
                    "'knowledge.collection' cannot be empty".to_string(),
                ));
            }
        }
    }

    if let Some(responder) = expect_optional_object(root, "responder")? {
        validate_f64_field(responder, "responder.temperature", "temperature", 0.0, 2.0)?;
        validate_f64_field(
            responder,
            "responder.fallback_temperature",
            "fallback_temperature",
            0.0,
            2.0,
        )?;
        validate_u64_field(responder, "responder.max_tokens", "max_tokens", 1, 32_768)?;
        validate_u64_field(
            responder,
            "responder.fallback_max_tokens",
            "fallback_max_tokens",
            1,
            32_768,
        )?;
        validate_optional_string_field(responder, "responder.intent_prompt", "intent_prompt")?;
        validate_optional_string_field(responder, "responder.intent_list", "intent_list")?;

        if let Some(chains) = expect_optional_object(responder, "chains")? {
            for (intent, steps) in chains {
                validate_chain(&format!("responder.chains.{}", intent), steps)?;
            }
        }
    }

    if let Some(webhook) = expect_optional_object(root, "webhook")? {
        validate_u64_field(
            webhook,
            "webhook.callback_delay_ms",
            "callback_delay_ms",
            0,
            60_000,
        )?;
        validate_u64_field(webhook, "webhook.timeout_secs", "timeout_secs", 1, 600)?;
        validate_bool_field(webhook, "webhook.accept_invalid_certs", "accept_invalid_certs")?;
    }

    Ok(())
}

fn validate_chain(path: &str, steps: &Value) -> Result<(), BotError> {
    let Some(items) = steps.as_array() else {
        return Err(config_type_error(path, "array of chain steps"));
    };
    if items.is_empty() {
        return Err(BotError::InvalidConfig(format!(
            "Invalid config at '{}': a chain needs at least one step",
            path
        )));
    }
    for (index, item) in items.iter().enumerate() {
        let step_path = format!("{}[{}]", path, index);
        let Some(step) = item.as_object() else {
            return Err(config_type_error(&step_path, "object"));
        };
        validate_required_string_field(step, &format!("{}.template", step_path), "template")?;
        validate_required_string_field(step, &format!("{}.output_key", step_path), "output_key")?;
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, BotError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), BotError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), BotError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(BotError::InvalidConfig(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), BotError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(BotError::InvalidConfig(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), BotError> {
    let value = section.get(key).ok_or_else(|| {
        BotError::InvalidConfig(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(BotError::InvalidConfig(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), BotError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() && !value.is_null() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> BotError {
    BotError::InvalidConfig(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
