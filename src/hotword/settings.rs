//! Process-wide runtime hotword settings with last-writer-wins persistence.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

use crate::error::Result;

pub const MAX_HOTWORD_COUNT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotwordMode {
    #[default]
    UserOnly,
    Curated,
    Experiment,
}

impl HotwordMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "curated" => HotwordMode::Curated,
            "experiment" => HotwordMode::Experiment,
            _ => HotwordMode::UserOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HotwordSettings {
    pub auto_hotwords: bool,
    pub post_process: bool,
    pub mode: HotwordMode,
    pub max_count: u32,
}

impl Default for HotwordSettings {
    fn default() -> Self {
        Self {
            auto_hotwords: false,
            post_process: false,
            mode: HotwordMode::UserOnly,
            max_count: 20,
        }
    }
}

/// Raw on-disk shape; tolerates junk values by normalizing on load.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default)]
    auto_hotwords: Option<bool>,
    #[serde(default)]
    post_process: Option<bool>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    max_count: Option<i64>,
}

impl From<RawSettings> for HotwordSettings {
    fn from(raw: RawSettings) -> Self {
        let defaults = HotwordSettings::default();
        Self {
            auto_hotwords: raw.auto_hotwords.unwrap_or(defaults.auto_hotwords),
            post_process: raw.post_process.unwrap_or(defaults.post_process),
            mode: raw
                .mode
                .map(|m| HotwordMode::parse(&m))
                .unwrap_or(defaults.mode),
            max_count: raw
                .max_count
                .map(|c| c.clamp(0, MAX_HOTWORD_COUNT as i64) as u32)
                .unwrap_or(defaults.max_count),
        }
    }
}

/// Single coordinator for the runtime hotword toggles.
///
/// Writers serialize through the lock and persist with a temp-file-plus-
/// rename so a crash mid-write never corrupts the settings file; readers
/// only ever take the read side.
pub struct HotwordSettingsStore {
    path: PathBuf,
    state: RwLock<HotwordSettings>,
}

impl HotwordSettingsStore {
    /// Load settings from `path`, falling back to defaults (and writing
    /// them out) when the file is absent or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawSettings>(&contents) {
                Ok(raw) => HotwordSettings::from(raw),
                Err(e) => {
                    warn!("Unparseable hotword settings file, using defaults: {e}");
                    HotwordSettings::default()
                }
            },
            Err(_) => {
                let defaults = HotwordSettings::default();
                if let Err(e) = persist(&path, &defaults) {
                    warn!("Could not persist default hotword settings: {e}");
                }
                defaults
            }
        };

        info!("Hotword settings loaded from {}", path.display());
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub fn get(&self) -> HotwordSettings {
        *self.state.read().expect("settings lock poisoned")
    }

    pub fn set_auto_hotwords(&self, enabled: bool) -> Result<HotwordSettings> {
        self.update(|s| s.auto_hotwords = enabled)
    }

    pub fn set_post_process(&self, enabled: bool) -> Result<HotwordSettings> {
        self.update(|s| s.post_process = enabled)
    }

    pub fn set_mode(&self, mode: HotwordMode) -> Result<HotwordSettings> {
        self.update(|s| s.mode = mode)
    }

    pub fn set_max_count(&self, max_count: u32) -> Result<HotwordSettings> {
        self.update(|s| s.max_count = max_count.min(MAX_HOTWORD_COUNT))
    }

    /// Apply a mutation and persist atomically. Last writer wins.
    pub fn update(&self, f: impl FnOnce(&mut HotwordSettings)) -> Result<HotwordSettings> {
        let mut state = self.state.write().expect("settings lock poisoned");
        f(&mut state);
        persist(&self.path, &state)?;
        Ok(*state)
    }
}

fn persist(path: &Path, settings: &HotwordSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(serde_json::to_string_pretty(settings)?.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
