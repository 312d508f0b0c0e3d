//! End-to-end failover behaviour through the public engine API

use std::time::Duration;

use tempfile::TempDir;
use ymixer_core::backend::mock::MockOpen;
use ymixer_core::{
    AudioEngine, DeviceKind, EngineConfig, Event, FailoverState, InputDeviceInfo, MockBackend,
    PresetStore, StreamConfig, PRESETS_FILE_NAME,
};

const WAIT: Duration = Duration::from_secs(2);

fn start_engine(mock: &MockBackend) -> (AudioEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let presets = PresetStore::open(dir.path().join(PRESETS_FILE_NAME));
    let engine = AudioEngine::with_backend(mock.clone(), EngineConfig::default(), presets).unwrap();
    engine.start().unwrap();
    (engine, dir)
}

/// Everything the engine emits until it settles in Running or Failed
fn events_until_settled(engine: &AudioEngine) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = engine.wait_event_timeout(WAIT) {
        let settled = matches!(event, Event::Running { .. } | Event::Fatal { .. });
        events.push(event);
        if settled {
            break;
        }
    }
    events
}

fn current_state(engine: &AudioEngine) -> Option<FailoverState> {
    engine.request_state().unwrap();
    while let Some(event) = engine.wait_event_timeout(WAIT) {
        if let Event::StateUpdate(status) = event {
            return Some(status.state);
        }
    }
    None
}

#[test]
fn loopback_failure_falls_back_to_capable_microphone() {
    let mock = MockBackend::new()
        .with_loopback_failure("loopback not supported")
        .with_inputs(vec![InputDeviceInfo {
            name: "USB Microphone".into(),
            channels: 1,
            is_default: true,
        }]);
    let (engine, _dir) = start_engine(&mock);

    let events = events_until_settled(&engine);
    assert!(matches!(events.first(), Some(Event::FailoverStarted { .. })));
    match events.last() {
        Some(Event::Running { device }) => {
            assert_eq!(device.kind, DeviceKind::MicrophoneInput);
            assert_eq!(device.name, "USB Microphone");
            assert_eq!(device.channels, 1);
        }
        other => panic!("expected Running, got {:?}", other),
    }

    // Playback follows the microphone's channel count
    assert!(mock.opened().contains(&MockOpen::Output {
        config: StreamConfig::new(44100, 1)
    }));
    assert_eq!(current_state(&engine), Some(FailoverState::Running));
}

#[test]
fn no_input_devices_is_fatal_without_retry() {
    let mock = MockBackend::new().with_loopback_failure("access denied");
    let (engine, _dir) = start_engine(&mock);

    let events = events_until_settled(&engine);
    let fatal = events
        .iter()
        .filter(|e| matches!(e, Event::Fatal { .. }))
        .count();
    assert_eq!(fatal, 1);

    assert_eq!(current_state(&engine), Some(FailoverState::Failed));
    // Nothing else happens on its own
    assert!(engine.wait_event_timeout(Duration::from_millis(100)).is_none());
    assert_eq!(mock.enumerations(), 1);
    assert!(!mock.is_capturing());
}

#[test]
fn restart_recovers_from_failed() {
    let mock = MockBackend::new().with_loopback_failure("access denied");
    let (engine, _dir) = start_engine(&mock);
    events_until_settled(&engine);

    mock.set_loopback_failure(None);
    engine.restart().unwrap();

    let events = events_until_settled(&engine);
    assert!(matches!(
        events.last(),
        Some(Event::Running { device }) if device.kind == DeviceKind::LoopbackOutput
    ));
}

#[test]
fn processed_audio_reaches_output() {
    let mock = MockBackend::new();
    let (engine, _dir) = start_engine(&mock);
    events_until_settled(&engine);

    mock.deliver(&[0.5, -0.5, 1.0, -1.0]).unwrap();
    let out = mock.render(4).unwrap();

    let expected = [0.6, -0.6, 1.0, -1.0];
    for (got, want) in out.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "got {}, want {}", got, want);
    }

    // Volume changes land on the next render without touching the audio thread
    engine.set_volume_boost(0);
    mock.deliver(&[0.5; 8]).unwrap();
    assert!(mock.render(8).unwrap().iter().all(|&s| s == 0.0));
}

#[test]
fn stop_releases_devices() {
    let mock = MockBackend::new();
    let (engine, _dir) = start_engine(&mock);
    events_until_settled(&engine);

    engine.stop().unwrap();
    let stopped = std::iter::from_fn(|| engine.wait_event_timeout(WAIT))
        .find(|e| matches!(e, Event::Stopped));
    assert!(stopped.is_some());
    assert!(!mock.is_capturing());
    assert!(!mock.is_playing());
}

#[test]
fn settings_changed_while_failed_apply_after_restart() {
    let mock = MockBackend::new().with_loopback_failure("access denied");
    let (engine, _dir) = start_engine(&mock);
    let events = events_until_settled(&engine);
    assert!(matches!(events.last(), Some(Event::Fatal { .. })));

    // No device is open; the changes are still accepted
    engine.set_band_gain(0, 6).unwrap();
    engine.set_volume_boost(0);
    engine.set_bass_boost(3);
    assert_eq!(engine.params().band_gain(0), 9.0);
    assert_eq!(engine.equalizer().volume_boost_percent(), 0);

    mock.set_loopback_failure(None);
    engine.restart().unwrap();
    let events = events_until_settled(&engine);
    assert!(matches!(events.last(), Some(Event::Running { .. })));

    // The rebuilt pipeline renders with the volume set while it was down
    mock.deliver(&[0.5; 8]).unwrap();
    assert!(mock.render(8).unwrap().iter().all(|&s| s == 0.0));
}
