//! cpal Backend
//!
//! Real devices through the platform's default cpal host. Loopback capture
//! opens an input stream on the default OUTPUT device, which WASAPI exposes
//! as system-audio capture. Hosts without loopback support fail the open,
//! which is what triggers the microphone fallback.

use std::fmt::Display;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream};
use tracing::{debug, info};

use super::{ActiveStream, AudioBackend, ErrorCallback, RenderCallback};
use crate::config::StreamConfig;
use crate::device::{CaptureTarget, InputDeviceInfo};
use crate::error::{EngineError, EngineResult};
use crate::jitter::JitterWriter;

// Conversion scratch for non-f32 output devices, allocated once per stream
const OUTPUT_SCRATCH_SAMPLES: usize = 8192;

fn capture_err<E: Display>(err: E) -> EngineError {
    EngineError::Capture(err.to_string())
}

fn playback_err<E: Display>(err: E) -> EngineError {
    EngineError::Playback(err.to_string())
}

/// Keeps a cpal stream alive
struct CpalStream {
    _stream: Stream,
    device_name: String,
}

impl ActiveStream for CpalStream {
    fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Backend over `cpal::default_host()`
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    fn cpal_config(config: &StreamConfig) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        }
    }

    fn find_input(host: &cpal::Host, name: &str) -> EngineResult<Device> {
        host.input_devices()
            .map_err(capture_err)?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| EngineError::Capture(format!("input device '{}' not found", name)))
    }

    fn build_capture<T>(
        device: &Device,
        config: &cpal::StreamConfig,
        mut writer: JitterWriter,
        mut on_error: ErrorCallback,
    ) -> Result<Stream, cpal::BuildStreamError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Real-time audio callback - NO allocations allowed here
                writer.push_iter(data.iter().map(|&s| f32::from_sample(s)));
            },
            move |err| on_error(err.to_string()),
            None,
        )
    }

    fn build_output<T>(
        device: &Device,
        config: &cpal::StreamConfig,
        mut render: RenderCallback,
        mut on_error: ErrorCallback,
    ) -> Result<Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let mut scratch = vec![0.0_f32; OUTPUT_SCRATCH_SAMPLES];
        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(OUTPUT_SCRATCH_SAMPLES) {
                    let scratch = &mut scratch[..chunk.len()];
                    render(scratch);
                    for (out, &s) in chunk.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(s);
                    }
                }
            },
            move |err| on_error(err.to_string()),
            None,
        )
    }

    fn build_output_f32(
        device: &Device,
        config: &cpal::StreamConfig,
        mut render: RenderCallback,
        mut on_error: ErrorCallback,
    ) -> Result<Stream, cpal::BuildStreamError> {
        device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render(data),
            move |err| on_error(err.to_string()),
            None,
        )
    }
}

impl AudioBackend for CpalBackend {
    fn open_capture(
        &mut self,
        target: &CaptureTarget,
        config: &StreamConfig,
        writer: JitterWriter,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>> {
        let host = cpal::default_host();

        let (device, sample_format) = match target {
            CaptureTarget::Loopback => {
                let device = host
                    .default_output_device()
                    .ok_or_else(|| EngineError::Capture("no default output device".into()))?;
                let format = device
                    .default_output_config()
                    .map_err(capture_err)?
                    .sample_format();
                (device, format)
            }
            CaptureTarget::Microphone(info) => {
                let device = Self::find_input(&host, &info.name)?;
                let format = device
                    .default_input_config()
                    .map_err(capture_err)?
                    .sample_format();
                (device, format)
            }
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown device".into());
        let cpal_config = Self::cpal_config(config);
        debug!(
            "Opening capture on '{}' ({:?}, {}Hz, {}ch)",
            device_name, sample_format, config.sample_rate, config.channels
        );

        let cfg = &cpal_config;
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_capture::<f32>(&device, cfg, writer, on_error),
            SampleFormat::I16 => Self::build_capture::<i16>(&device, cfg, writer, on_error),
            SampleFormat::U16 => Self::build_capture::<u16>(&device, cfg, writer, on_error),
            other => {
                return Err(EngineError::Capture(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(capture_err)?;

        stream.play().map_err(capture_err)?;
        info!("Capture started on '{}'", device_name);

        Ok(Box::new(CpalStream {
            _stream: stream,
            device_name,
        }))
    }

    fn input_devices(&mut self) -> EngineResult<Vec<InputDeviceInfo>> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(capture_err)?
            .filter_map(|device| {
                let name = device.name().ok()?;
                // Devices that can't report a config are listed but not capable
                let channels = device
                    .default_input_config()
                    .map(|c| c.channels())
                    .unwrap_or(0);
                let is_default = default_name.as_deref() == Some(name.as_str());
                Some(InputDeviceInfo {
                    name,
                    channels,
                    is_default,
                })
            })
            .collect();

        Ok(devices)
    }

    fn open_output(
        &mut self,
        config: &StreamConfig,
        render: RenderCallback,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Playback("no default output device".into()))?;
        let sample_format = device
            .default_output_config()
            .map_err(playback_err)?
            .sample_format();
        let device_name = device.name().unwrap_or_else(|_| "Unknown device".into());
        let cpal_config = Self::cpal_config(config);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_output_f32(&device, &cpal_config, render, on_error),
            SampleFormat::I16 => Self::build_output::<i16>(&device, &cpal_config, render, on_error),
            SampleFormat::U16 => Self::build_output::<u16>(&device, &cpal_config, render, on_error),
            other => {
                return Err(EngineError::Playback(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(playback_err)?;

        stream.play().map_err(playback_err)?;
        info!("Playback started on '{}'", device_name);

        Ok(Box::new(CpalStream {
            _stream: stream,
            device_name,
        }))
    }

    fn name(&self) -> &'static str {
        "cpal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_config_mapping() {
        let config = CpalBackend::cpal_config(&StreamConfig::new(44100, 1));
        assert_eq!(config.channels, 1);
        assert_eq!(config.sample_rate, cpal::SampleRate(44100));
    }

    // Note: Hardware-dependent tests are marked with #[ignore]
    // Run them with: cargo test -- --ignored

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_enumerate_inputs() {
        let devices = CpalBackend::new().input_devices();
        assert!(devices.is_ok());
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_output() {
        let mut backend = CpalBackend::new();
        let stream = backend.open_output(
            &StreamConfig::default(),
            Box::new(|out: &mut [f32]| out.fill(0.0)),
            Box::new(|_| {}),
        );
        if let Ok(stream) = stream {
            assert!(!stream.device_name().is_empty());
        }
    }
}
