use crate::model::ConnectionStyle;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EditorSettings {
    pub svg_path: String,
    pub connection_style: ConnectionStyle,
    pub show_grid: bool,
    pub grid_size: f32,
    /// Built-in template applied at startup, e.g. `groundRadiation`.
    pub initial_template: Option<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            svg_path: "graphical-abstract.svg".to_string(),
            connection_style: ConnectionStyle::Arrow,
            show_grid: true,
            grid_size: 20.0,
            initial_template: None,
        }
    }
}

/// `~/.config/graphabs.toml` when present, else `./settings.toml` when
/// present.
pub(crate) fn config_path() -> Option<String> {
    if let Some(home) = std::env::var_os("HOME") {
        let path = std::path::PathBuf::from(home)
            .join(".config")
            .join("graphabs.toml");
        if path.exists() {
            return Some(path.display().to_string());
        }
    }
    if std::path::Path::new("settings.toml").exists() {
        return Some("settings.toml".to_string());
    }
    None
}

pub(crate) fn load_settings(path: &str) -> Option<EditorSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    if path.ends_with(".toml") {
        toml::from_str::<EditorSettings>(&s)
            .ok()
            .or_else(|| serde_json::from_str::<EditorSettings>(&s).ok())
    } else {
        serde_json::from_str::<EditorSettings>(&s)
            .ok()
            .or_else(|| toml::from_str::<EditorSettings>(&s).ok())
    }
}

pub(crate) fn save_settings(path: &str, settings: &EditorSettings) -> Result<(), String> {
    if path.ends_with(".toml") {
        let toml = toml::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, toml).map_err(|e| e.to_string())
    } else {
        let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| e.to_string())
    }
}
