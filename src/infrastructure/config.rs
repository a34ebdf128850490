use crate::domain::{config::RelayConfig, error::{RelayError, RelayResult}};
use std::path::{Path, PathBuf};
use std::fs;

const CONFIG_DIR: &str = ".scopebridge";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self {
            global_config_path: Self::get_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    /// Load configuration: the project file wins over the global file,
    /// defaults apply when neither exists
    pub fn load_config(&self) -> RelayResult<RelayConfig> {
        match self.active_config_path() {
            Some(path) => self.load_config_from_path(path),
            None => Ok(RelayConfig::default()),
        }
    }

    /// The file `load_config` reads, if any
    pub fn active_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path
            .as_ref()
            .filter(|path| path.exists())
            .or_else(|| self.global_config_path.as_ref().filter(|path| path.exists()))
    }

    /// Get global configuration path
    fn get_global_config_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("scopebridge").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> RelayResult<RelayConfig> {
        let content = fs::read_to_string(path).map_err(|e| RelayError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| RelayError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &RelayConfig) -> RelayResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| RelayError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RelayError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        fs::write(path, content).map_err(|e| RelayError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Write a default project configuration under `path`
    pub fn init_project_config(&self, path: &Path) -> RelayResult<PathBuf> {
        let config_file = path.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_file.exists() {
            return Err(RelayError::Config {
                message: format!("Project configuration already exists at {}", config_file.display()),
            });
        }

        self.save_config_to_path(&config_file, &RelayConfig::default())?;

        Ok(config_file)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> Option<&PathBuf> {
        self.global_config_path.as_ref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn isolated_manager() -> ConfigManager {
        ConfigManager {
            global_config_path: None,
            project_config_path: None,
        }
    }

    #[test]
    fn test_load_default_config() {
        let config = isolated_manager().load_config().unwrap();

        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.device.baud_rate, 38400);
    }

    #[test]
    fn test_init_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = isolated_manager();

        let config_file = manager.init_project_config(temp_dir.path()).unwrap();
        assert_eq!(config_file, temp_dir.path().join(".scopebridge").join("config.toml"));

        let config = manager.load_config_from_path(&config_file).unwrap();
        assert_eq!(config.device.port_patterns, vec!["tty.usbmodem", "COM4"]);

        // refuses to overwrite
        assert!(manager.init_project_config(temp_dir.path()).is_err());
    }

    #[test]
    fn test_project_config_wins() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[server]\nport = 9001\n").unwrap();
        fs::write(&project, "[server]\nport = 9002\n").unwrap();

        let manager = ConfigManager {
            global_config_path: Some(global.clone()),
            project_config_path: Some(project),
        };
        assert_eq!(manager.load_config().unwrap().server.port, 9002);

        let manager = ConfigManager {
            global_config_path: Some(global),
            project_config_path: None,
        };
        assert_eq!(manager.load_config().unwrap().server.port, 9001);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        let result = isolated_manager().load_config_from_path(&path);
        assert!(matches!(result, Err(RelayError::Config { .. })));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let manager = isolated_manager();

        let mut config = RelayConfig::default();
        config.device.port_override = Some("ttyACM0".to_string());
        manager.save_config_to_path(&path, &config).unwrap();

        let reloaded = manager.load_config_from_path(&path).unwrap();
        assert_eq!(reloaded.device.port_override.as_deref(), Some("ttyACM0"));
    }
}
