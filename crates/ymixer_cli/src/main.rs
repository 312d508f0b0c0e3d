//! YMixer CLI
//!
//! Captures system audio (or a microphone when loopback is unavailable),
//! runs it through the 10-band equalizer and plays it back. Equalizer and
//! preset changes are typed on stdin while audio keeps running.

mod commands;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ymixer_core::{
    AudioBackend, AudioEngine, CpalBackend, EngineConfig, Event, PresetStore, SettingsStore,
    BAND_COUNT,
};

/// Real-time 10-band equalizer for system audio
#[derive(Parser, Debug)]
#[command(name = "ymixer", version)]
struct Cli {
    /// Apply a stored preset by key (e.g. Global_Rock)
    #[arg(long)]
    preset: Option<String>,

    /// Band gain as INDEX=DB, repeatable (e.g. --band 0=6 --band 9=-3)
    #[arg(long, value_parser = parse_band)]
    band: Vec<(usize, i32)>,

    /// Volume boost in percent (0..300)
    #[arg(long)]
    volume: Option<i32>,

    /// Bass boost in dB (0..24)
    #[arg(long)]
    bass: Option<i32>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Presets file (defaults to the platform config directory)
    #[arg(long)]
    presets_file: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    settings_file: Option<PathBuf>,

    /// Jitter buffer length in milliseconds
    #[arg(long, default_value_t = 50)]
    jitter_ms: u32,
}

fn parse_band(s: &str) -> Result<(usize, i32), String> {
    let (index, gain) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=DB, got '{}'", s))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid band index '{}'", index))?;
    if index >= BAND_COUNT {
        return Err(format!("band index must be 0..{}", BAND_COUNT - 1));
    }
    let gain = gain
        .trim()
        .parse()
        .map_err(|_| format!("invalid gain '{}'", gain))?;
    Ok((index, gain))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ymixer=info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        return list_devices();
    }

    info!("Starting YMixer v{}", env!("CARGO_PKG_VERSION"));

    let presets = match &cli.presets_file {
        Some(path) => PresetStore::open(path),
        None => PresetStore::open_default()?,
    };
    let settings = cli
        .settings_file
        .clone()
        .or_else(SettingsStore::default_path)
        .map(|path| Arc::new(SettingsStore::load(path)));

    let config = EngineConfig {
        jitter_buffer_ms: cli.jitter_ms,
        ..Default::default()
    };
    let mut engine = AudioEngine::with_backend(CpalBackend::new(), config, presets)
        .context("failed to create audio engine")?;
    if let Some(settings) = &settings {
        engine = engine.with_settings(Arc::clone(settings));
    }

    apply_arguments(&engine, &cli)?;
    engine.start()?;

    let engine = Arc::new(engine);
    let done = Arc::new(AtomicBool::new(false));
    let printer = spawn_event_printer(Arc::clone(&engine), settings, Arc::clone(&done));

    println!("{}", commands::HELP);
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let keep_going = match commands::parse(&line) {
            Ok(Some(input)) => commands::execute(&engine, input).unwrap_or_else(|e| {
                eprintln!("error: {:#}", e);
                true
            }),
            Ok(None) => true,
            Err(e) => {
                eprintln!("error: {:#}", e);
                true
            }
        };
        if !keep_going {
            break;
        }
    }

    done.store(true, Ordering::SeqCst);
    let _ = printer.join();
    info!("Shutting down");
    Ok(())
}

fn apply_arguments(engine: &AudioEngine, cli: &Cli) -> Result<()> {
    if let Some(key) = &cli.preset {
        engine
            .load_preset(key)
            .with_context(|| format!("failed to apply preset '{}'", key))?;
    }
    for &(index, gain) in &cli.band {
        engine.set_band_gain(index, gain)?;
    }
    if let Some(volume) = cli.volume {
        engine.set_volume_boost(volume);
    }
    if let Some(bass) = cli.bass {
        engine.set_bass_boost(bass);
    }
    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = CpalBackend::new()
        .input_devices()
        .context("failed to enumerate input devices")?;

    if devices.is_empty() {
        println!("no input devices");
    }
    for device in devices {
        println!(
            "{} {} ({} ch){}",
            if device.is_default { "*" } else { " " },
            device.name,
            device.channels,
            if device.is_capable() { "" } else { " [unusable]" }
        );
    }
    Ok(())
}

/// Print engine events and settings changes until `done` is set
fn spawn_event_printer(
    engine: Arc<AudioEngine>,
    settings: Option<Arc<SettingsStore>>,
    done: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    let settings_changes = settings.map(|s| s.subscribe());

    thread::spawn(move || {
        while !done.load(Ordering::SeqCst) {
            if let Some(event) = engine.wait_event_timeout(Duration::from_millis(100)) {
                print_event(&event);
            }
            if let Some(rx) = &settings_changes {
                for changed in rx.try_iter() {
                    info!("Settings updated (last preset: {:?})", changed.last_preset);
                }
            }
        }
    })
}

fn print_event(event: &Event) {
    match event {
        Event::Running { device } => println!(
            "running on '{}' ({:?}, {} Hz, {} ch)",
            device.name, device.kind, device.sample_rate, device.channels
        ),
        Event::FailoverStarted { reason } => {
            println!("loopback capture unavailable ({}), trying microphone", reason)
        }
        Event::Fatal { message } => {
            println!("audio stopped: {}. Type 'restart' to try again.", message)
        }
        Event::Stopped => println!("stopped"),
        Event::Error { message } => warn!("{}", message),
        Event::StateUpdate(status) => println!("state: {:?}", status.state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_band_argument() {
        assert_eq!(parse_band("3=6"), Ok((3, 6)));
        assert_eq!(parse_band("0=-24"), Ok((0, -24)));
        assert!(parse_band("10=1").is_err());
        assert!(parse_band("3").is_err());
        assert!(parse_band("a=1").is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "ymixer",
            "--band",
            "1=4",
            "--band",
            "8=-2",
            "--volume",
            "150",
            "--presets-file",
            "/tmp/p.json",
        ]);
        assert_eq!(cli.band, vec![(1, 4), (8, -2)]);
        assert_eq!(cli.volume, Some(150));
        assert_eq!(cli.presets_file, Some(PathBuf::from("/tmp/p.json")));
        assert_eq!(cli.jitter_ms, 50);
    }
}
