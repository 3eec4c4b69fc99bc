// SPDX-License-Identifier: MIT

//! Reads a `WorkerConfig` from a TOML or JSON file on disk, and the
//! `.dev.vars` dotenv overlay (spec §6's "Secrets" section).

use crate::error::{ConfigError, ConfigResult};
use crate::schema::WorkerConfig;
use std::collections::HashMap;
use std::path::Path;

pub fn load_config(path: &Path) -> ConfigResult<WorkerConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(toml::from_str(&text)?),
        Some("json") => Ok(serde_json::from_str(&text)?),
        other => Err(ConfigError::UnsupportedExtension(other.map(str::to_string))),
    }
}

/// Parses a dotenv-format `.dev.vars` file without touching the process
/// environment — these values only ever flow into `WorkerConfig::vars`.
pub fn load_dev_vars(path: &Path) -> ConfigResult<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    dotenv::from_path_iter(path)
        .map_err(|e| ConfigError::DevVars(e.to_string()))?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| ConfigError::DevVars(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_a_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrangler.toml");
        std::fs::write(
            &path,
            r#"
            name = "my-worker"
            main = "src/index.js"

            [[kv_namespaces]]
            binding = "CACHE"
            id = "abc123"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.name, "my-worker");
        assert_eq!(config.kv_namespaces[0].binding, "CACHE");
    }

    #[test]
    fn loads_a_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"name": "my-worker", "main": "src/index.js"}"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.name, "my-worker");
    }

    #[test]
    fn rejects_an_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "name: my-worker").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::UnsupportedExtension(_))));
    }

    #[test]
    fn missing_dev_vars_file_yields_an_empty_map() {
        let dir = tempdir().unwrap();
        let vars = load_dev_vars(&dir.path().join(".dev.vars")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn parses_dev_vars_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".dev.vars");
        std::fs::write(&path, "API_KEY=secret\nDEBUG=true\n").unwrap();
        let vars = load_dev_vars(&path).unwrap();
        assert_eq!(vars.get("API_KEY"), Some(&"secret".to_string()));
        assert_eq!(vars.get("DEBUG"), Some(&"true".to_string()));
    }
}
