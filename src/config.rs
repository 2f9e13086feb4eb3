use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapkeepError};
use crate::gateway::AwsCliConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    /// Region used when none is given on the command line
    pub region: Option<String>,
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Path or name of the aws CLI binary
    pub binary: String,
    pub profile: Option<String>,
    /// Pause before every API call, to stay under the account rate limit
    pub call_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            binary: "aws".to_string(),
            profile: None,
            call_delay_ms: 200,
            timeout_ms: 60000,
        }
    }
}

impl AwsConfig {
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    /// Gateway settings for the given region
    pub fn cli_config(&self, region: &str) -> AwsCliConfig {
        AwsCliConfig::new(region)
            .binary(self.binary.clone())
            .profile(self.profile.clone())
            .timeout(Duration::from_millis(self.timeout_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            region: None,
            aws: AwsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_name = env!("CARGO_PKG_NAME");

        // ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Command-line region wins over the configured one.
    pub fn resolve_region(&self, cli_region: Option<&str>) -> Result<String> {
        cli_region
            .or(self.region.as_deref())
            .map(str::to_string)
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| SnapkeepError::Config("no region given on the command line or in the config file".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert!(config.region.is_none());
        assert_eq!(config.aws.binary, "aws");
        assert_eq!(config.aws.call_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_load_partial_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("snapkeep.yml");
        fs::write(
            &path,
            "region: eu-central-1\naws:\n  profile: backups\n  call_delay_ms: 500\n",
        )?;

        let config = Config::load(Some(&path))?;

        assert_eq!(config.region.as_deref(), Some("eu-central-1"));
        assert_eq!(config.aws.profile.as_deref(), Some("backups"));
        assert_eq!(config.aws.call_delay_ms, 500);
        // unspecified keys keep their defaults
        assert_eq!(config.aws.binary, "aws");
        assert_eq!(config.aws.timeout_ms, 60000);
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let path = PathBuf::from("/nonexistent/snapkeep.yml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, SnapkeepError::Io(_)));
    }

    #[test]
    fn test_invalid_yaml_is_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("bad.yml");
        fs::write(&path, "aws: [unclosed")?;

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, SnapkeepError::Yaml(_)));
        Ok(())
    }

    #[test]
    fn test_resolve_region_precedence() {
        let config = Config {
            region: Some("us-west-2".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_region(Some("eu-west-1")).unwrap(), "eu-west-1");
        assert_eq!(config.resolve_region(None).unwrap(), "us-west-2");
    }

    #[test]
    fn test_resolve_region_missing() {
        let err = Config::default().resolve_region(None).unwrap_err();
        assert!(matches!(err, SnapkeepError::Config(_)));
        assert!(Config::default().resolve_region(Some("  ")).is_err());
    }

    #[test]
    fn test_cli_config() {
        let aws = AwsConfig {
            profile: Some("ops".to_string()),
            timeout_ms: 1500,
            ..AwsConfig::default()
        };
        let cli = aws.cli_config("ap-south-1");
        assert_eq!(cli.region, "ap-south-1");
        assert_eq!(cli.profile.as_deref(), Some("ops"));
        assert_eq!(cli.timeout, Duration::from_millis(1500));
    }
}
