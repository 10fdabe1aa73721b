// Grid settings
// Loaded from ~/.config/gridkit/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gridkit_engine::grid::GridFeatures;
use gridkit_engine::layout::{
    LayoutConfig, CLICK_SUPPRESS_WINDOW, MIN_COLUMN_WIDTH, SELECTION_COLUMN_WIDTH,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Layout
    #[serde(rename = "grid.minColumnWidth")]
    pub min_column_width: f64,

    #[serde(rename = "grid.selectionColumnWidth")]
    pub selection_column_width: f64,

    #[serde(rename = "grid.clickSuppressMs")]
    pub click_suppress_ms: u64,

    // Features
    #[serde(rename = "grid.features")]
    pub features: GridFeatures,

    // Storage
    #[serde(rename = "storage.dir")]
    pub storage_dir: Option<PathBuf>, // None = <config dir>/gridkit/views

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_column_width: MIN_COLUMN_WIDTH,
            selection_column_width: SELECTION_COLUMN_WIDTH,
            click_suppress_ms: CLICK_SUPPRESS_WINDOW.as_millis() as u64,
            features: GridFeatures::default(),
            storage_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Base config directory for gridkit
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridkit")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Load settings from the default location, writing a commented default
    /// file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Where stored view states live
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("views"))
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            min_width: self.min_column_width.max(0.0),
            selection_width: self.selection_column_width.max(0.0),
            click_suppress: Duration::from_millis(self.click_suppress_ms),
        }
    }

    /// `log.level` as a filter; unknown names mean warn
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Warn)
    }

    fn create_default_file(&self, path: &Path) {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Column layout (pixels)
    "grid.minColumnWidth": 40,
    "grid.selectionColumnWidth": 40,

    // Header clicks are ignored this long after a column drag
    "grid.clickSuppressMs": 200,

    // Turn individual grid features off
    "grid.features": {
        "sortable": true,
        "filterable": true,
        "groupable": true,
        "columnVisibility": true,
        "columnReorder": true,
        "columnResize": true,
        "selectable": true,
        "freezePanes": true,
        "exportCsv": true
    },

    // Stored view states (null = default location)
    "storage.dir": null,

    // off, error, warn, info, debug, trace
    "log.level": "warn"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("error writing default settings.json: {}", e);
        }
    }
}
