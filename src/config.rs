use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::models;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// On-disk preferences, `<config_dir>/consult-chat/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Values the rest of the program runs with, after flags, env and file
/// have been merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub model_index: usize,
    pub log_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Flag/env values win over the file, the file wins over built-ins.
    pub fn resolve(
        &self,
        base_url: Option<String>,
        model: Option<String>,
        log_file: Option<PathBuf>,
    ) -> Result<Settings> {
        let base_url = base_url
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model_index = match model {
            Some(id) => models::find(&id).ok_or_else(|| {
                anyhow!("unknown model '{}' (expected one of: {})", id, models::ids().join(", "))
            })?,
            None => match self.default_model.as_deref() {
                Some(id) => models::find(id).unwrap_or_else(|| {
                    warn!(model = id, "default_model in config is not a known model; using the first one");
                    0
                }),
                None => 0,
            },
        };

        let log_file = match log_file.or_else(|| self.log_file.clone()) {
            Some(path) => path,
            None => Self::default_log_path(),
        };

        Ok(Settings {
            base_url,
            model_index,
            log_file,
        })
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("consult-chat").join("config.json"))
    }

    fn default_log_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("consult-chat")
            .join("consult.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());

        let settings = config.resolve(None, None, None).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.model_index, 0);
        assert!(settings.log_file.ends_with("consult-chat/consult.log"));
    }

    #[test]
    fn file_values_are_used_when_no_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"base_url":"http://rag.internal:9000","default_model":"sonar-pro","log_file":"/tmp/c.log"}"#,
        )
        .unwrap();

        let settings = Config::load_from(&path).unwrap().resolve(None, None, None).unwrap();
        assert_eq!(settings.base_url, "http://rag.internal:9000");
        assert_eq!(models::MODELS[settings.model_index].id, "sonar-pro");
        assert_eq!(settings.log_file, PathBuf::from("/tmp/c.log"));
    }

    #[test]
    fn flags_override_file() {
        let config = Config {
            base_url: Some("http://from-file".into()),
            default_model: Some("sonar-pro".into()),
            log_file: None,
        };
        let settings = config
            .resolve(
                Some("http://from-flag".into()),
                Some("r1-1776".into()),
                Some(PathBuf::from("x.log")),
            )
            .unwrap();
        assert_eq!(settings.base_url, "http://from-flag");
        assert_eq!(models::MODELS[settings.model_index].id, "r1-1776");
        assert_eq!(settings.log_file, PathBuf::from("x.log"));
    }

    #[test]
    fn unknown_model_flag_is_an_error_but_unknown_file_model_falls_back() {
        assert!(Config::default()
            .resolve(None, Some("gpt-9".into()), None)
            .is_err());

        let config = Config {
            default_model: Some("retired-model".into()),
            ..Config::default()
        };
        assert_eq!(config.resolve(None, None, None).unwrap().model_index, 0);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }
}
