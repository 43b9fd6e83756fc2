use propsearch_common::config::{LlmRoleConfig, RetryConfig};

use super::loader::{ConfigError, EngineConfig};

/// Validate the complete configuration.
///
/// Collects every problem into a single error so a bad deploy shows all of
/// them at once.
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_upstream(config, &mut errors);
    validate_search(config, &mut errors);
    validate_llm(config, &mut errors);
    validate_retry(&config.system.retry.llm_api, "llm_api", &mut errors);
    validate_tool_schemas(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

fn validate_upstream(config: &EngineConfig, errors: &mut Vec<String>) {
    let u = &config.system.upstream;

    if !(u.base_url.starts_with("http://") || u.base_url.starts_with("https://")) {
        errors.push("upstream.base_url must be an http(s) URL".into());
    }
    if u.timeout_seconds == 0 {
        errors.push("upstream.timeout_seconds must be > 0".into());
    }
    if u.company.trim().is_empty() {
        errors.push("upstream.company must not be empty".into());
    }
}

fn validate_search(config: &EngineConfig, errors: &mut Vec<String>) {
    let s = &config.system.search;

    if s.default_page_size == 0 {
        errors.push("search.default_page_size must be > 0".into());
    }
    if s.output_fields.is_empty() {
        errors.push("search.output_fields must not be empty".into());
    }
    if s.allowed_mls.is_empty() {
        errors.push("search.allowed_mls must not be empty".into());
    }
}

fn validate_llm(config: &EngineConfig, errors: &mut Vec<String>) {
    let Some(role) = &config.system.llm.extraction else {
        return;
    };
    validate_role(role, "extraction", errors);
}

fn validate_role(role: &LlmRoleConfig, name: &str, errors: &mut Vec<String>) {
    if !matches!(role.provider.as_str(), "anthropic" | "openai") {
        errors.push(format!(
            "llm.{}.provider must be \"anthropic\" or \"openai\"",
            name
        ));
    }
    if role.model.is_empty() {
        errors.push(format!("llm.{}.model must not be empty", name));
    }
    if role.max_tokens == 0 {
        errors.push(format!("llm.{}.max_tokens must be > 0", name));
    }
    if role.timeout_seconds == 0 {
        errors.push(format!("llm.{}.timeout_seconds must be > 0", name));
    }
    if let Some(temp) = role.temperature {
        if !(0.0..=2.0).contains(&temp) {
            errors.push(format!(
                "llm.{}.temperature must be between 0.0 and 2.0",
                name
            ));
        }
    }
}

fn validate_retry(rc: &RetryConfig, name: &str, errors: &mut Vec<String>) {
    if rc.max_attempts == 0 {
        errors.push(format!("retry.{}.max_attempts must be > 0", name));
    }
    if rc.max_backoff_ms < rc.initial_backoff_ms {
        errors.push(format!(
            "retry.{}.max_backoff_ms must be >= initial_backoff_ms",
            name
        ));
    }
    if rc.backoff_multiplier < 1.0 {
        errors.push(format!("retry.{}.backoff_multiplier must be >= 1.0", name));
    }
}

fn validate_tool_schemas(config: &EngineConfig, errors: &mut Vec<String>) {
    for (key, schema) in &config.tool_schemas {
        for field in ["name", "description", "input_schema"] {
            if schema.get(field).is_none() {
                errors.push(format!("tools/{}.json missing '{}' field", key, field));
            }
        }
    }
}
