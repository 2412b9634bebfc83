use std::fs;
use std::io::Write;
use std::path::PathBuf;

use dirs_next as dirs;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::ScannerMode;
use crate::sonar::DEFAULT_URL;

pub const APP_DIR: &str = ".sonarctl";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sonar_url: String,
    pub compose_file: PathBuf,
    pub compose_project: String,
    pub http_timeout_secs: u64,
    pub readiness_timeout_secs: u64,
    pub scanner: ScannerMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sonar_url: DEFAULT_URL.to_string(),
            compose_file: std::env::temp_dir().join("docker-compose.sonarctl.yml"),
            compose_project: "sonarctl".to_string(),
            http_timeout_secs: 30,
            readiness_timeout_secs: 300,
            scanner: ScannerMode::Container,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let path = config_file_path()?;
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let path = config_file_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::File::create(path)?;
        let contents = toml::to_string_pretty(self)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}

/// `~/.sonarctl`, or `$SONARCTL_HOME` when set.
pub fn app_home() -> Result<PathBuf, AppError> {
    if let Some(explicit) = std::env::var_os("SONARCTL_HOME") {
        return Ok(PathBuf::from(explicit));
    }
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or_else(|| AppError::config("Unable to determine the home directory"))
}

pub fn config_file_path() -> Result<PathBuf, AppError> {
    Ok(app_home()?.join(CONFIG_FILE))
}

pub fn tokens_dir() -> Result<PathBuf, AppError> {
    Ok(app_home()?.join("sonar").join("tokens"))
}

/// Create the config file with defaults if it does not exist yet.
pub fn ensure_config_file() -> Result<PathBuf, AppError> {
    let path = config_file_path()?;
    if !path.exists() {
        Config::default().save()?;
    }
    Ok(path)
}
