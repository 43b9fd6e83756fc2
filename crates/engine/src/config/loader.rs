use std::collections::HashMap;
use std::path::{Path, PathBuf};

use propsearch_common::config::SystemConfig;
use serde_json::Value;

use super::validation;

/// Complete configuration loaded from the config directory.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Parsed system.toml (with the openapi.json server URL applied, if any).
    pub system: SystemConfig,
    /// Tool schemas keyed by tool file stem (e.g. "search_properties").
    pub tool_schemas: HashMap<String, Value>,
    /// Prompt templates keyed by filename stem (e.g. "extract_criteria").
    pub prompts: HashMap<String, String>,
}

impl EngineConfig {
    /// Configuration with built-in defaults and no schemas or prompts.
    pub fn from_system(system: SystemConfig) -> Self {
        Self {
            system,
            tool_schemas: HashMap::new(),
            prompts: HashMap::new(),
        }
    }

    pub fn prompt(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }
}

/// Load all configuration from the given config directory.
///
/// Fails loudly on anything misconfigured; binaries refuse to start on error.
pub fn load_config(config_dir: &Path) -> Result<EngineConfig, ConfigError> {
    tracing::info!(config_dir = %config_dir.display(), "Loading configuration");

    // 1. system.toml (required)
    let mut system = load_system_config(&config_dir.join("system.toml"))?;

    // 2. openapi.json (optional) pins the listing API server URL.
    let openapi_path = config_dir.join("openapi.json");
    if openapi_path.exists() {
        let base_url = load_openapi_server_url(&openapi_path)?;
        tracing::info!(base_url = %base_url, "Using listing API server from openapi.json");
        system.upstream.base_url = base_url;
    }

    // 3. Tool schemas from config/tools/*.json
    let tool_schemas = load_tool_schemas(&config_dir.join("tools"))?;

    // 4. Prompt templates from config/prompts/*.md
    let prompts = load_prompts(&config_dir.join("prompts"))?;

    let config = EngineConfig {
        system,
        tool_schemas,
        prompts,
    };

    // 5. Validate everything
    validation::validate(&config)?;

    tracing::info!(
        tool_schemas = config.tool_schemas.len(),
        prompts = config.prompts.len(),
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    let content = read(path)?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn load_openapi_server_url(path: &Path) -> Result<String, ConfigError> {
    let doc = read_json(path)?;

    doc.get("servers")
        .and_then(|s| s.get(0))
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
        .map(|url| url.trim_end_matches('/').to_string())
        .ok_or_else(|| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: "missing servers[0].url".into(),
        })
}

fn load_tool_schemas(tools_dir: &Path) -> Result<HashMap<String, Value>, ConfigError> {
    let mut schemas = HashMap::new();

    if !tools_dir.exists() {
        tracing::warn!(
            path = %tools_dir.display(),
            "Tools directory does not exist, no tool schemas loaded"
        );
        return Ok(schemas);
    }

    for path in list_dir(tools_dir)? {
        if path.extension().is_some_and(|ext| ext == "json") {
            let tool_name = file_stem(&path);
            let schema = read_json(&path)?;
            tracing::debug!(tool = %tool_name, "Loaded tool schema");
            schemas.insert(tool_name, schema);
        }
    }

    Ok(schemas)
}

fn load_prompts(prompts_dir: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut prompts = HashMap::new();

    if !prompts_dir.exists() {
        tracing::warn!(
            path = %prompts_dir.display(),
            "Prompts directory does not exist, no prompts loaded"
        );
        return Ok(prompts);
    }

    for path in list_dir(prompts_dir)? {
        if path
            .extension()
            .is_some_and(|ext| ext == "md" || ext == "txt")
        {
            let name = file_stem(&path);
            let content = read(&path)?;
            tracing::debug!(prompt = %name, "Loaded prompt template");
            prompts.insert(name, content);
        }
    }

    Ok(prompts)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::FileRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::FileRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_json(path: &Path) -> Result<Value, ConfigError> {
    serde_json::from_str(&read(path)?).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}
