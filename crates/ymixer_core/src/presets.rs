//! Equalizer Presets
//!
//! Named gain configurations persisted as one JSON object keyed by scope:
//!
//! - `Global_<name>`: usable everywhere; `Global_Default` is applied when the
//!   global scope is selected
//! - `Process_<process>_<name>`: tied to one application; `Process_<process>`
//!   is applied when that application is selected
//!
//! Persistence is best-effort. A missing or corrupt file loads as empty and a
//! failed write is logged and dropped.
//!
//! # Storage Locations
//! - Linux: `~/.config/ymixer/equalizer_presets.json`
//! - Windows: `%APPDATA%\YMixer\YMixer\config\equalizer_presets.json`
//! - macOS: `~/Library/Application Support/com.ymixer.YMixer/equalizer_presets.json`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ymixer_dsp::{EqualizerConfig, BAND_COUNT};

use crate::error::{EngineError, EngineResult};

pub const PRESETS_FILE_NAME: &str = "equalizer_presets.json";

const GLOBAL_PREFIX: &str = "Global_";
const PROCESS_PREFIX: &str = "Process_";

/// Scope key -> preset
pub type PresetMap = BTreeMap<String, Preset>;

/// One stored equalizer configuration, in UI units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Preset {
    /// The full scope key this preset was saved under
    pub name: String,
    /// Band gains in dB, -24..=24
    pub gains: [i32; BAND_COUNT],
    /// Volume boost in percent, 0..=300
    pub volume_boost: i32,
    /// Bass boost in dB, 0..=24
    pub bass_boost: i32,
}

impl Preset {
    /// Capture the current configuration under `key`
    pub fn from_config(key: impl Into<String>, config: &EqualizerConfig) -> Self {
        Self {
            name: key.into(),
            gains: config.gains().map(|g| g.round() as i32),
            volume_boost: config.volume_boost_percent(),
            bass_boost: config.bass_boost().round() as i32,
        }
    }

    /// Rebuild an EQ configuration, clamping anything out of range
    pub fn to_config(&self) -> EqualizerConfig {
        let mut config = EqualizerConfig::default();
        config.set_gains(self.gains.map(|g| g as f32));
        config.set_volume_boost_percent(self.volume_boost);
        config.set_bass_boost(self.bass_boost as f32);
        config
    }
}

/// Which presets the user is currently working with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PresetScope {
    #[default]
    Global,
    Process(String),
}

impl PresetScope {
    /// Scope key for a preset called `name`
    pub fn key(&self, name: &str) -> EngineResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidPreset("preset name is empty".into()));
        }

        match self {
            PresetScope::Global => Ok(format!("{}{}", GLOBAL_PREFIX, name)),
            PresetScope::Process(process) if process.is_empty() => {
                Err(EngineError::InvalidPreset("no process selected".into()))
            }
            PresetScope::Process(process) => Ok(format!("{}{}_{}", PROCESS_PREFIX, process, name)),
        }
    }

    /// Key of the preset applied automatically when this scope is selected
    pub fn default_key(&self) -> String {
        match self {
            PresetScope::Global => format!("{}Default", GLOBAL_PREFIX),
            PresetScope::Process(process) => format!("{}{}", PROCESS_PREFIX, process),
        }
    }

    /// Whether `key` belongs to this scope
    pub fn owns(&self, key: &str) -> bool {
        match self {
            PresetScope::Global => key.starts_with(GLOBAL_PREFIX),
            PresetScope::Process(process) => key
                .strip_prefix(PROCESS_PREFIX)
                .and_then(|rest| rest.strip_prefix(process.as_str()))
                .map_or(false, |rest| rest.is_empty() || rest.starts_with('_')),
        }
    }

    /// Strip the scope prefix from a key for display
    ///
    /// Process names containing underscores can't be told apart from the
    /// preset name; everything after the first underscore past the prefix is
    /// treated as the name.
    pub fn display_name(key: &str) -> &str {
        if let Some(rest) = key.strip_prefix(GLOBAL_PREFIX) {
            rest
        } else if let Some(rest) = key.strip_prefix(PROCESS_PREFIX) {
            rest.split_once('_').map_or(rest, |(_, name)| name)
        } else {
            key
        }
    }
}

/// File-backed preset collection
#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    presets: PresetMap,
}

impl PresetStore {
    /// Open the store at `path`, loading whatever is there
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let presets = Self::load_from(&path);
        Self { path, presets }
    }

    /// Open the store in the platform config directory
    pub fn open_default() -> EngineResult<Self> {
        let path = Self::default_path()
            .ok_or_else(|| EngineError::Config("could not determine config directory".into()))?;
        Ok(Self::open(path))
    }

    /// Platform-specific location of the presets file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "ymixer", "YMixer")
            .map(|proj| proj.config_dir().join(PRESETS_FILE_NAME))
    }

    /// Re-read the file. Any I/O or parse failure yields an empty map.
    pub fn load(&mut self) -> &PresetMap {
        self.presets = Self::load_from(&self.path);
        &self.presets
    }

    /// Replace the collection and write it out (best-effort)
    pub fn save(&mut self, presets: PresetMap) {
        self.presets = presets;
        self.persist();
    }

    /// Store one preset under its key and write the file
    pub fn insert(&mut self, preset: Preset) {
        self.presets.insert(preset.name.clone(), preset);
        self.persist();
    }

    pub fn get(&self, key: &str) -> Option<&Preset> {
        self.presets.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.presets.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn presets(&self) -> &PresetMap {
        &self.presets
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from(path: &Path) -> PresetMap {
        if !path.exists() {
            debug!("No presets file at {:?}", path);
            return PresetMap::new();
        }

        let loaded = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str::<PresetMap>(&json).map_err(|e| e.to_string()));

        match loaded {
            Ok(presets) => {
                info!("Loaded {} presets from {:?}", presets.len(), path);
                presets
            }
            Err(e) => {
                warn!("Failed to load presets from {:?}: {}", path, e);
                PresetMap::new()
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.write() {
            warn!("Failed to save presets to {:?}: {}", self.path, e);
        }
    }

    fn write(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(&self.presets).map_err(|e| e.to_string())?;
        fs::write(&self.path, json).map_err(|e| e.to_string())?;

        debug!("Presets saved to {:?}", self.path);
        Ok(())
    }
}
