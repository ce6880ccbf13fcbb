use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::system::DEFAULT_TOP_N;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub top_n: usize,
    pub default_sort: String,
    pub cpu_sample_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            top_n: DEFAULT_TOP_N,
            default_sort: "pid".to_string(),
            cpu_sample_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub name_width: usize,
    pub show_user: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            name_width: 28,
            show_user: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("proctree").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

/// Missing or unparsable files fall back to defaults.
pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.general.top_n, 5);
        assert_eq!(config.general.default_sort, "pid");
        assert_eq!(config.general.cpu_sample_ms, 250);
        assert_eq!(config.display.name_width, 28);
        assert!(config.display.show_user);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[general]
top_n = 10
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.top_n, 10);
        assert_eq!(config.general.default_sort, "pid");
        assert_eq!(config.display.name_width, 28);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[general]
top_n = 3
default_sort = "memory"
cpu_sample_ms = 500

[display]
name_width = 40
show_user = false

[logging]
level = "debug"
format = "json"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.top_n, 3);
        assert_eq!(config.general.default_sort, "memory");
        assert_eq!(config.general.cpu_sample_ms, 500);
        assert_eq!(config.display.name_width, 40);
        assert!(!config.display.show_user);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.general.top_n, 5);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let temp = std::env::temp_dir().join("proctree_test_invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.general.top_n, 5);
        let _ = std::fs::remove_file(&temp);
    }
}
