use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding the photo files referenced by catalog rows.
    #[serde(default = "default_photos_dir")]
    pub photos_dir: PathBuf,

    /// Directory backup files are written into before sharing.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("waymark")
        .join("waymark.db")
}

fn default_photos_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("waymark")
        .join("photos")
}

fn default_backup_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("waymark")
        .join("backups")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            photos_dir: default_photos_dir(),
            backup_dir: default_backup_dir(),
        }
    }
}

impl Config {
    /// Load the config file, creating it with defaults on first run.
    /// An explicit `path` overrides the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waymark")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert!(config.db_path.ends_with("waymark.db"));

        // Loading again round-trips the same values.
        let again = Config::load(Some(&path)).unwrap();
        assert_eq!(again.db_path, config.db_path);
        assert_eq!(again.photos_dir, config.photos_dir);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "db_path = \"/tmp/custom.db\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/custom.db"));
        assert!(config.photos_dir.ends_with("photos"));
    }
}
