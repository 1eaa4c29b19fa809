//! Shell configuration

use std::path::{Path, PathBuf};

use authgate_core::{LockoutConfig, Result};
use serde::{Deserialize, Serialize};

/// How the shell answers biometric challenges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricMode {
    /// Report biometry as unavailable
    Disabled,
    /// Ask for a yes/no confirmation on stdin
    #[default]
    Prompt,
}

/// Shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Secret store file
    pub store_path: PathBuf,

    /// Preference flags file
    pub preferences_path: PathBuf,

    /// Attempt threshold and suspension window
    #[serde(default)]
    pub lockout: LockoutConfig,

    /// Biometric stand-in behaviour
    #[serde(default)]
    pub biometric: BiometricMode,
}

impl Default for ShellConfig {
    fn default() -> Self {
        let data_dir = Self::default_data_dir();
        Self {
            store_path: data_dir.join("secrets.json"),
            preferences_path: data_dir.join("preferences.json"),
            lockout: LockoutConfig::default(),
            biometric: BiometricMode::default(),
        }
    }
}

impl ShellConfig {
    fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("authgate")
    }

    /// `$AUTHGATE_CONFIG`, or `authgate/shell.json` under the user config dir
    pub fn default_path() -> PathBuf {
        std::env::var_os("AUTHGATE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("authgate")
                    .join("shell.json")
            })
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.lockout.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path`, writing the defaults there first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let config = Self::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Create the data directories if they don't exist
    pub fn ensure_directories(&self) -> Result<()> {
        for path in [&self.store_path, &self.preferences_path] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::AuthError;
    use tempfile::TempDir;

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("shell.json");

        let (config, created) = ShellConfig::load_or_create(&path).unwrap();
        assert!(created);
        assert!(path.exists());
        assert_eq!(config.lockout, LockoutConfig::default());

        let (reloaded, created) = ShellConfig::load_or_create(&path).unwrap();
        assert!(!created);
        assert_eq!(reloaded.store_path, config.store_path);
        assert_eq!(reloaded.biometric, BiometricMode::Prompt);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shell.json");
        std::fs::write(
            &path,
            r#"{
                "store_path": "/tmp/s.json",
                "preferences_path": "/tmp/p.json",
                "lockout": { "allowed_attempts": 3 },
                "biometric": "disabled"
            }"#,
        )
        .unwrap();

        let config = ShellConfig::load(&path).unwrap();
        assert_eq!(config.lockout.allowed_attempts, 3);
        assert_eq!(config.lockout.suspension_secs, 600);
        assert_eq!(config.biometric, BiometricMode::Disabled);
    }

    #[test]
    fn test_invalid_lockout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shell.json");
        std::fs::write(
            &path,
            r#"{"store_path": "a", "preferences_path": "b", "lockout": {"allowed_attempts": 0}}"#,
        )
        .unwrap();

        assert!(matches!(
            ShellConfig::load(&path),
            Err(AuthError::InvalidInput(_))
        ));
    }
}
