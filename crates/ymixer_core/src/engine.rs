//! Audio Engine - Main Entry Point
//!
//! The AudioEngine owns the device pipeline and coordinates communication
//! between the UI and the audio control thread.
//!
//! # Architecture
//!
//! ```text
//!   UI thread                          ymixer-audio thread
//!   ─────────                          ───────────────────
//!   start/stop/restart ──Command──▶  DeviceFailoverController
//!   poll_event         ◀──Event────    (owns capture + playback streams)
//!
//!   set_band_gain ─┐
//!   set_volume_boost ──▶ EqParams atomics ──▶ render callback
//!   load_preset ───┘
//! ```
//!
//! Device streams never leave the control thread. EQ changes bypass it
//! entirely and land in the render callback on its next buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use ymixer_dsp::{EqParams, EqualizerConfig, BASS_BOOST_BANDS};

use crate::backend::{AudioBackend, CpalBackend};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::failover::{DeviceFailoverController, StreamNotice};
use crate::message::{Command, EngineStatus, Event, FailoverState};
use crate::presets::{Preset, PresetScope, PresetStore};
use crate::settings::SettingsStore;

// How often the control thread refreshes the shared status snapshot
const STATUS_INTERVAL: Duration = Duration::from_millis(16);

// Stream error notices queued from OS audio threads
const NOTICE_CAPACITY: usize = 16;

/// The main audio engine controller
///
/// Lives on the UI/main thread. Device work happens on a dedicated thread,
/// driven through channels.
pub struct AudioEngine {
    /// Channel for sending commands to the audio thread
    command_sender: Sender<Command>,

    /// Channel for receiving events from the audio thread
    event_receiver: Receiver<Event>,

    /// Handle to the audio control thread
    audio_thread: Option<JoinHandle<()>>,

    /// Flag to signal shutdown
    shutdown_flag: Arc<AtomicBool>,

    config: EngineConfig,

    /// Live parameters read by the render callback
    params: Arc<EqParams>,

    /// UI-side equalizer state, source of truth for presets
    equalizer: Mutex<EqualizerConfig>,

    presets: Mutex<PresetStore>,
    scope: Mutex<PresetScope>,
    settings: Option<Arc<SettingsStore>>,

    /// Last snapshot published by the audio thread
    status: Arc<Mutex<EngineStatus>>,
}

impl AudioEngine {
    /// Create an engine on real hardware with default configuration
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine on real hardware, presets in the platform config dir
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        Self::with_backend(CpalBackend::new(), config, PresetStore::open_default()?)
    }

    /// Create an engine on any backend
    pub fn with_backend<B>(
        backend: B,
        config: EngineConfig,
        presets: PresetStore,
    ) -> EngineResult<Self>
    where
        B: AudioBackend + 'static,
    {
        config.stream.validate().map_err(EngineError::Config)?;

        let (command_sender, command_receiver) = bounded::<Command>(32);
        let (event_sender, event_receiver) = unbounded::<Event>();

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(EngineStatus::default()));
        let params = Arc::new(EqParams::new());

        let shutdown_clone = Arc::clone(&shutdown_flag);
        let status_clone = Arc::clone(&status);
        let params_clone = Arc::clone(&params);
        let config_clone = config.clone();

        let audio_thread = thread::Builder::new()
            .name("ymixer-audio".into())
            .spawn(move || {
                let (notice_sender, notice_receiver) = bounded(NOTICE_CAPACITY);
                let controller = DeviceFailoverController::new(
                    backend,
                    config_clone,
                    params_clone,
                    event_sender.clone(),
                    notice_sender,
                );
                Self::audio_thread_main(
                    controller,
                    command_receiver,
                    notice_receiver,
                    event_sender,
                    shutdown_clone,
                    status_clone,
                );
            })
            .map_err(|e| EngineError::Thread(e.to_string()))?;

        let engine = Self {
            command_sender,
            event_receiver,
            audio_thread: Some(audio_thread),
            shutdown_flag,
            config,
            params,
            equalizer: Mutex::new(EqualizerConfig::default()),
            presets: Mutex::new(presets),
            scope: Mutex::new(PresetScope::Global),
            settings: None,
            status,
        };

        if engine.config.auto_start {
            engine.start()?;
        }

        Ok(engine)
    }

    /// Record applied presets in `settings`, restoring the last one now
    pub fn with_settings(mut self, settings: Arc<SettingsStore>) -> Self {
        if let Some(key) = settings.get().startup_preset() {
            match self.apply_stored_preset(key) {
                Ok(()) => info!("Restored preset '{}'", key),
                Err(e) => warn!("Could not restore preset '{}': {}", key, e),
            }
        }
        self.settings = Some(settings);
        self
    }

    /// Open devices: loopback first, microphone on failure
    pub fn start(&self) -> EngineResult<()> {
        self.send_command(Command::Start)
    }

    /// Close all devices
    pub fn stop(&self) -> EngineResult<()> {
        self.send_command(Command::Stop)
    }

    /// Tear down and rebuild the pipeline, also from the failed state
    pub fn restart(&self) -> EngineResult<()> {
        self.send_command(Command::Restart)
    }

    /// Request state update
    pub fn request_state(&self) -> EngineResult<()> {
        self.send_command(Command::RequestState)
    }

    /// Set one band's gain in dB, clamped to [-24, 24]
    pub fn set_band_gain(&self, band: usize, gain_db: i32) -> EngineResult<()> {
        let mut eq = self.equalizer.lock();
        eq.set_band_gain(band, gain_db as f32)?;
        eq.apply_band(band, &self.params);
        Ok(())
    }

    /// Set post-EQ volume in percent, clamped to [0, 300]
    pub fn set_volume_boost(&self, percent: i32) {
        let mut eq = self.equalizer.lock();
        eq.set_volume_boost_percent(percent);
        self.params.set_volume_boost(eq.volume_boost());
    }

    /// Set bass boost in dB, clamped to [0, 24]. Rebuilds the lowest bands.
    pub fn set_bass_boost(&self, boost_db: i32) {
        let mut eq = self.equalizer.lock();
        eq.set_bass_boost(boost_db as f32);
        for band in 0..BASS_BOOST_BANDS {
            eq.apply_band(band, &self.params);
        }
    }

    /// Replace the whole equalizer configuration
    pub fn apply_config(&self, config: EqualizerConfig) {
        let mut eq = self.equalizer.lock();
        config.apply(&self.params);
        *eq = config;
    }

    /// Flat gains, 100 % volume, no bass boost
    pub fn reset_equalizer(&self) {
        self.apply_config(EqualizerConfig::default());
    }

    pub fn equalizer(&self) -> EqualizerConfig {
        self.equalizer.lock().clone()
    }

    /// Save the current equalizer as `name` in the current scope
    ///
    /// Returns the scope key it was stored under.
    pub fn save_preset(&self, name: &str) -> EngineResult<String> {
        let key = self.scope.lock().key(name)?;
        let preset = Preset::from_config(key.clone(), &self.equalizer.lock());
        self.presets.lock().insert(preset);

        info!("Saved preset '{}'", key);
        self.remember_preset(&key);
        Ok(key)
    }

    /// Apply a stored preset by scope key
    pub fn load_preset(&self, key: &str) -> EngineResult<()> {
        self.apply_stored_preset(key)?;
        info!("Applied preset '{}'", key);
        self.remember_preset(key);
        Ok(())
    }

    /// Switch scope, applying its default preset or resetting to neutral
    ///
    /// Returns whether a default preset was found.
    pub fn select_scope(&self, scope: PresetScope) -> bool {
        let default_key = scope.default_key();
        *self.scope.lock() = scope;

        match self.apply_stored_preset(&default_key) {
            Ok(()) => {
                debug!("Applied scope default '{}'", default_key);
                true
            }
            Err(_) => {
                debug!("No preset '{}', resetting equalizer", default_key);
                self.reset_equalizer();
                false
            }
        }
    }

    pub fn scope(&self) -> PresetScope {
        self.scope.lock().clone()
    }

    /// Keys of the stored presets belonging to the current scope
    pub fn preset_keys(&self) -> Vec<String> {
        let scope = self.scope();
        self.presets
            .lock()
            .keys()
            .filter(|key| scope.owns(key))
            .map(str::to_string)
            .collect()
    }

    /// Live parameters shared with the render callback
    pub fn params(&self) -> &Arc<EqParams> {
        &self.params
    }

    /// Latest pipeline snapshot published by the audio thread
    pub fn status(&self) -> EngineStatus {
        self.status.lock().clone()
    }

    /// Check if capture and playback are currently running
    pub fn is_running(&self) -> bool {
        self.status.lock().state == FailoverState::Running
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Get next event (blocking)
    pub fn wait_event(&self) -> Option<Event> {
        self.event_receiver.recv().ok()
    }

    /// Get next event, giving up after `timeout`
    pub fn wait_event_timeout(&self, timeout: Duration) -> Option<Event> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn apply_stored_preset(&self, key: &str) -> EngineResult<()> {
        let config = self
            .presets
            .lock()
            .get(key)
            .map(Preset::to_config)
            .ok_or_else(|| EngineError::InvalidPreset(format!("no preset '{}'", key)))?;
        self.apply_config(config);
        Ok(())
    }

    fn remember_preset(&self, key: &str) {
        if let Some(settings) = &self.settings {
            settings.update(|s| s.last_preset = Some(key.to_string()));
        }
    }

    /// Send command to audio thread
    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSend)
    }

    /// Audio thread main loop
    fn audio_thread_main<B: AudioBackend>(
        mut controller: DeviceFailoverController<B>,
        command_receiver: Receiver<Command>,
        notice_receiver: Receiver<StreamNotice>,
        event_sender: Sender<Event>,
        shutdown_flag: Arc<AtomicBool>,
        status: Arc<Mutex<EngineStatus>>,
    ) {
        info!("Audio thread started");

        let mut running = true;
        while running && !shutdown_flag.load(Ordering::SeqCst) {
            select! {
                recv(command_receiver) -> command => match command {
                    Ok(Command::Start) => {
                        if controller.state() == FailoverState::Running {
                            warn!("Engine already running");
                            let _ = event_sender.send(Event::error("Already running"));
                        } else {
                            controller.start();
                        }
                    }
                    Ok(Command::Stop) => controller.stop(),
                    Ok(Command::Restart) => {
                        info!("Restarting audio pipeline");
                        controller.restart();
                    }
                    Ok(Command::RequestState) => {
                        let snapshot = controller.status();
                        *status.lock() = snapshot.clone();
                        let _ = event_sender.send(Event::StateUpdate(snapshot));
                    }
                    Ok(Command::Shutdown) | Err(_) => {
                        debug!("Shutdown requested");
                        running = false;
                    }
                },
                recv(notice_receiver) -> notice => {
                    if let Ok(notice) = notice {
                        controller.handle_notice(notice);
                    }
                },
                default(STATUS_INTERVAL) => {}
            }

            *status.lock() = controller.status();
        }

        if controller.state() != FailoverState::Uninitialized {
            controller.stop();
        }
        *status.lock() = controller.status();

        info!("Audio thread stopped");
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        let _ = self.command_sender.send(Command::Shutdown);

        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
    }
}
