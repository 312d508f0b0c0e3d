//! Persistent Settings Management
//!
//! Application flags saved to disk, with change notification for whoever
//! holds a subscription.
//!
//! # Storage Locations
//! - Linux: `~/.config/ymixer/settings.json`
//! - Windows: `%APPDATA%\YMixer\YMixer\config\settings.json`
//! - macOS: `~/Library/Application Support/com.ymixer.YMixer/settings.json`

use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, Sender};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// User-facing application flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub dark_theme: bool,
    pub open_on_tray_hover: bool,
    /// Restore the last applied preset at startup
    pub save_profiles: bool,
    pub show_in_tray: bool,
    /// Scope key of the preset applied most recently
    pub last_preset: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            dark_theme: true,
            open_on_tray_hover: false,
            save_profiles: true,
            show_in_tray: true,
            last_preset: None,
        }
    }
}

impl AppSettings {
    /// Preset to apply at startup, if profiles are being saved
    pub fn startup_preset(&self) -> Option<&str> {
        if self.save_profiles {
            self.last_preset.as_deref()
        } else {
            None
        }
    }
}

/// Owns the settings file and notifies subscribers on every change
pub struct SettingsStore {
    path: PathBuf,
    settings: Mutex<AppSettings>,
    observers: Mutex<Vec<Sender<AppSettings>>>,
}

impl SettingsStore {
    /// Load settings from `path`, or use defaults if missing/corrupt
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Self::read(&path).unwrap_or_else(|| {
            info!("Using default settings");
            AppSettings::default()
        });

        Self {
            path,
            settings: Mutex::new(settings),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Load from the platform config directory
    pub fn load_default() -> Option<Self> {
        Self::default_path().map(Self::load)
    }

    /// Get the platform-specific settings file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "ymixer", "YMixer")
            .map(|proj| proj.config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> AppSettings {
        self.settings.lock().clone()
    }

    /// Modify settings, save them and notify subscribers
    ///
    /// Nothing is saved or sent when `f` leaves the settings unchanged.
    pub fn update<F>(&self, f: F) -> AppSettings
    where
        F: FnOnce(&mut AppSettings),
    {
        let updated = {
            let mut settings = self.settings.lock();
            let before = settings.clone();
            f(&mut settings);
            if *settings == before {
                return before;
            }
            settings.clone()
        };

        if let Err(e) = self.save(&updated) {
            error!("Failed to save settings to {:?}: {}", self.path, e);
        }

        // Drop observers whose receiver has gone away
        self.observers
            .lock()
            .retain(|tx| tx.send(updated.clone()).is_ok());

        updated
    }

    /// Receive a copy of the settings after every change
    pub fn subscribe(&self) -> Receiver<AppSettings> {
        let (tx, rx) = unbounded();
        self.observers.lock().push(tx);
        rx
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Option<AppSettings> {
        if !path.exists() {
            return None;
        }

        match fs::File::open(path) {
            Ok(file) => match serde_json::from_reader(file) {
                Ok(settings) => {
                    info!("Settings loaded from {:?}", path);
                    Some(settings)
                }
                Err(e) => {
                    error!("Failed to parse settings file: {}", e);
                    None
                }
            },
            Err(e) => {
                error!("Failed to open settings file: {}", e);
                None
            }
        }
    }

    fn save(&self, settings: &AppSettings) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let file = fs::File::create(&self.path).map_err(|e| e.to_string())?;
        serde_json::to_writer_pretty(file, settings).map_err(|e| e.to_string())?;

        debug!("Settings saved to {:?}", self.path);
        Ok(())
    }
}
