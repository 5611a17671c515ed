use std::fs;
use std::path::{Path, PathBuf};

use crate::ui::settings::UiSettings;

const APP_DIR: &str = "startup_story_simulator";
const SETTINGS_FILE: &str = "ui_settings.json";

fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push(SETTINGS_FILE);
    path
}

pub fn load_settings() -> UiSettings {
    load_settings_from(&settings_path())
}

pub fn save_settings(settings: &UiSettings) {
    if let Err(e) = save_settings_to(&settings_path(), settings) {
        log::warn!("could not save UI settings: {e}");
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings_from(path: &Path) -> UiSettings {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("ignoring malformed settings at {}: {e}", path.display());
            UiSettings::default()
        }),
        Err(_) => UiSettings::default(),
    }
}

pub fn save_settings_to(path: &Path, settings: &UiSettings) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
