//! Configuration file support

use crate::syntax::DEFAULT_THEME;
use rowdiff_core::config::RenderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub syntax: SyntaxConfig,
}

/// Syntax highlighting settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    pub enabled: bool,
    /// Name of a bundled syntect theme
    pub theme: String,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl Config {
    /// Candidate config paths, in lookup order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("rowdiff").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("rowdiff").join("config.toml"));
        }

        // ~/Library/Application Support on macOS
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("rowdiff").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    /// Load the config, falling back to defaults when it is missing or invalid
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read config");
                return Self::default();
            }
        };
        Self::from_toml(&content).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "failed to parse config, using defaults");
            Self::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowdiff_core::flatten::Layout;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.render.layout, Layout::Split);
        assert!(config.syntax.enabled);
        assert_eq!(config.syntax.theme, "base16-ocean.dark");
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
[render]
layout = "unified"
wrap = true
column_width = 72
overscan = 4

[syntax]
enabled = false
theme = "InspiredGitHub"
"#,
        )
        .unwrap();
        assert_eq!(config.render.layout, Layout::Unified);
        assert!(config.render.wrap);
        assert_eq!(config.render.column_width, 72);
        assert_eq!(config.render.overscan, 4);
        assert!(!config.syntax.enabled);
        assert_eq!(config.syntax.theme, "InspiredGitHub");
    }

    #[test]
    fn test_bad_value_is_an_error() {
        assert!(Config::from_toml("[render]\nlayout = \"diagonal\"\n").is_err());
    }

    #[test]
    fn test_unreadable_path_uses_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/rowdiff/config.toml"));
        assert_eq!(config, Config::default());
    }
}
