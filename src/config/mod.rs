use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::geometry::Size;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "pictor";
const APP_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_CANVAS_WIDTH: u32 = 1000;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;
pub const DEFAULT_GRID_SIZE: u32 = 20;

/// A font file registered for one family name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FontEntry {
    pub family: String,
    pub path: PathBuf,
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub grid_size: u32,
    pub fonts: Vec<FontEntry>,
    pub default_font: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            grid_size: DEFAULT_GRID_SIZE,
            fonts: Vec::new(),
            default_font: None,
        }
    }
}

impl AppConfig {
    /// Render surface extent; a zero dimension falls back to the default.
    pub fn canvas_size(&self) -> Size {
        let width = if self.canvas_width == 0 {
            DEFAULT_CANVAS_WIDTH
        } else {
            self.canvas_width
        };
        let height = if self.canvas_height == 0 {
            DEFAULT_CANVAS_HEIGHT
        } else {
            self.canvas_height
        };
        Size::new(width, height)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_app_config(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

fn parse_app_config(contents: &str) -> serde_json::Result<AppConfig> {
    serde_json::from_str(contents)
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
