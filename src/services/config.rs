use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::model::config::PipelineConfig;

pub const CONFIG_FILE: &str = "eat.json";

const ENV_API_KEYS: [&str; 2] = ["DEEPL_API_KEY", "DEEPL_API_KEY_EAT_API"];
const ENV_OUTPUT_DIR: &str = "EAT_OUTPUT_DIR";

/// Reads the config file and applies environment overrides.
///
/// An explicitly given path must exist; without one, `eat.json` in the
/// working directory is used if present and the defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let mut cfg = match path {
        Some(p) => read(p)?,
        None if Path::new(CONFIG_FILE).is_file() => read(Path::new(CONFIG_FILE))?,
        None => {
            debug!("no {CONFIG_FILE}, using defaults");
            PipelineConfig::default()
        }
    };

    apply_env(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

fn read(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&data).map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Environment wins over the file. Empty variables count as unset.
pub fn apply_env(cfg: &mut PipelineConfig, var: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = ENV_API_KEYS.iter().find_map(|k| var(k)) {
        cfg.deepl_api_key = Some(key);
    }
    if let Some(dir) = var(ENV_OUTPUT_DIR) {
        cfg.output_dir = PathBuf::from(dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"output_dir":"public","deepl_api_key":"from-file"}"#).unwrap();

        let mut cfg = read(&path).unwrap();
        let env: HashMap<&str, &str> = [("DEEPL_API_KEY_EAT_API", "from-env"), ("EAT_OUTPUT_DIR", "")].into();
        apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.deepl_api_key.as_deref(), Some("from-env"));
        // empty variable does not clear the file's value
        assert_eq!(cfg.output_dir, PathBuf::from("public"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/eat.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_json_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"workers":"many"}"#).unwrap();
        let err = read(&path).unwrap_err();
        assert!(err.to_string().contains("eat.json"));
    }
}
