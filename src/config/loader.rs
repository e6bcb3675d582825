use super::input::PlatformInput;
use crate::error::{ComposerError, ErrorCode, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "SM_COMPOSER_";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ComposerError::config_with_code(
                ErrorCode::CONFIG_UNSUPPORTED_FORMAT,
                format!(
                    "Unsupported configuration extension {:?}; expected .yaml, .yml, .json or .toml",
                    other.unwrap_or("")
                ),
                Some(path.to_path_buf()),
            )),
        }
    }

    pub fn parse(self, content: &str) -> Result<PlatformInput> {
        let input = match self {
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
        };
        Ok(input)
    }
}

/// Loads a [`PlatformInput`] from disk and applies environment overrides
pub struct ConfigLoader {
    path: PathBuf,
    apply_env: bool,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            apply_env: true,
        }
    }

    /// Skip `SM_COMPOSER_*` overrides
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<PlatformInput> {
        let format = ConfigFormat::from_path(&self.path)?;

        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(ComposerError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                "Configuration file not found",
                Some(self.path.clone()),
            ));
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ComposerError::from(e).with_path(&self.path))?;
        let mut input = format.parse(&content).map_err(|e| e.with_path(&self.path))?;
        debug!("Parsed {:?} configuration from {}", format, self.path.display());

        if self.apply_env {
            apply_env_overrides(&mut input, std::env::vars())?;
        }

        info!(
            "Loaded configuration for {}-{}",
            input.project_name, input.environment
        );
        Ok(input)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ComposerError::config_with_code(
            ErrorCode::CONFIG_INVALID_OVERRIDE,
            format!("{} must be a boolean, got '{}'", key, value),
            None,
        )),
    }
}

/// Overlay `SM_COMPOSER_*` variables onto `input`; unknown keys are ignored
pub fn apply_env_overrides<I>(input: &mut PlatformInput, vars: I) -> Result<()>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        match name {
            "ENVIRONMENT" => input.environment = value,
            "REGION" => input.region = value,
            "ACCOUNT_ID" => input.account_id = Some(value),
            "SCHEDULE_ENABLED" => input.schedule_enabled = parse_bool(&key, &value)?,
            "SCHEDULE_EXPRESSION" => input.schedule_expression = Some(value),
            _ => {
                debug!("Ignoring unknown override {}", key);
                continue;
            }
        }
        debug!("Applied override {}", key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("platform.yaml");
        std::fs::write(&path, "project_name: ml-platform\nenvironment: staging\n").unwrap();

        let input = ConfigLoader::new(&path).without_env().load().await.unwrap();
        assert_eq!(input.project_name, "ml-platform");
        assert_eq!(input.environment, "staging");
    }

    #[tokio::test]
    async fn test_load_toml_and_json() {
        let dir = TempDir::new().unwrap();
        let toml_path = dir.path().join("platform.toml");
        std::fs::write(
            &toml_path,
            "project_name = \"ml-platform\"\nenvironment = \"prod\"\nenable_training_pipeline = true\n",
        )
        .unwrap();
        let input = ConfigLoader::new(&toml_path).without_env().load().await.unwrap();
        assert!(input.enable_training_pipeline);

        let json_path = dir.path().join("platform.json");
        std::fs::write(
            &json_path,
            r#"{"project_name": "ml-platform", "environment": "dev", "subnet_ids": ["subnet-1"]}"#,
        )
        .unwrap();
        let input = ConfigLoader::new(&json_path).without_env().load().await.unwrap();
        assert_eq!(input.subnet_ids, vec!["subnet-1".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::new(dir.path().join("absent.yaml"))
            .load()
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_yaml_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "project_name: [unterminated\n").unwrap();
        let err = ConfigLoader::new(&path).without_env().load().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_YAML);
        assert!(err.user_message().contains("broken.yaml"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigFormat::from_path(Path::new("platform.ini")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_UNSUPPORTED_FORMAT);
    }

    #[test]
    fn test_env_overrides() {
        let mut input = PlatformInput::new("ml-platform", "staging");
        apply_env_overrides(
            &mut input,
            vars(&[
                ("SM_COMPOSER_ENVIRONMENT", "prod"),
                ("SM_COMPOSER_SCHEDULE_ENABLED", "true"),
                ("SM_COMPOSER_UNKNOWN", "x"),
                ("HOME", "/root"),
            ]),
        )
        .unwrap();
        assert_eq!(input.environment, "prod");
        assert!(input.schedule_enabled);
    }

    #[test]
    fn test_env_override_bad_bool() {
        let mut input = PlatformInput::new("ml-platform", "staging");
        let err = apply_env_overrides(
            &mut input,
            vars(&[("SM_COMPOSER_SCHEDULE_ENABLED", "maybe")]),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_OVERRIDE);
    }
}
