//! Persisted app configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::settings::TutorSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_url: String,
    #[serde(default)]
    pub dark_mode: bool,
    /// Settings selections from the previous run, restored into the
    /// settings panel at startup.
    #[serde(default)]
    pub last_settings: Option<TutorSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "ws://127.0.0.1:5000/ws".into(),
            dark_mode: false,
            last_settings: None,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let proj = directories::ProjectDirs::from("com.local", "Tutor Desk", "TutorDesk")?;
    let _ = fs::create_dir_all(proj.config_dir());
    Some(proj.config_dir().join("config.json"))
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(config)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Load the config file, falling back to defaults on any problem. The
/// backend URL can be overridden with `TUTOR_BACKEND_URL` for development
/// setups running the backend on another port.
pub fn load_or_default() -> AppConfig {
    let mut config = config_path()
        .and_then(|path| read_config(&path).ok())
        .unwrap_or_default();
    if let Ok(url) = std::env::var("TUTOR_BACKEND_URL") {
        if !url.trim().is_empty() {
            config.backend_url = url.trim().to_string();
        }
    }
    config
}

/// Save the config, ignoring errors; losing a preference is not worth
/// interrupting the user.
pub fn save(config: &AppConfig) {
    if let Some(path) = config_path() {
        if let Err(e) = write_config(&path, config) {
            tracing::warn!(error = %e, "failed to save config");
        }
    }
}
