//! Microphone capture for voice queries.
//!
//! Opens the default input device via cpal, converts the native stream to
//! 16 kHz mono, and blocks until the utterance detector hands back a
//! complete utterance. Capture runs on a blocking thread; the audio
//! callback only mixes, resamples, and forwards chunks.

use crate::error::{Result, SvarError};
use crate::speech::UtteranceDetector;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Sample rate delivered to the transcriber.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Chunks buffered between the audio callback and the capture loop.
const CHUNK_QUEUE_DEPTH: usize = 64;

/// Records a single utterance from the default microphone.
pub struct MicCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    native_rate: u32,
    native_channels: u16,
}

impl MicCapture {
    /// Open the default input device with its native configuration.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SvarError::Audio("No microphone available".to_string()))?;

        let device_name = device
            .description()
            .map(|desc| desc.name().to_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        let default_config = device
            .default_input_config()
            .map_err(|e| SvarError::Audio(format!("Failed to query microphone config: {e}")))?;

        let native_rate = default_config.sample_rate();
        let native_channels = default_config.channels();

        info!(
            "Using input device: {} ({} ch at {} Hz)",
            device_name, native_channels, native_rate
        );

        let config = cpal::StreamConfig {
            channels: native_channels,
            sample_rate: native_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            config,
            native_rate,
            native_channels,
        })
    }

    /// Block until one utterance is captured, or until `max_listen` passes
    /// with no speech at all. Returns an empty buffer in the latter case.
    ///
    /// The returned samples are 16 kHz mono in the range [-1.0, 1.0].
    pub fn record_utterance(
        &self,
        detector: &mut UtteranceDetector,
        max_listen: Duration,
    ) -> Result<Vec<f32>> {
        let (tx, rx) = mpsc::sync_channel::<Vec<f32>>(CHUNK_QUEUE_DEPTH);
        let channels = self.native_channels;
        let native_rate = self.native_rate;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    let mono = mix_to_mono(data, channels);
                    let samples = if native_rate == CAPTURE_SAMPLE_RATE {
                        mono
                    } else {
                        resample(&mono, native_rate, CAPTURE_SAMPLE_RATE)
                    };
                    // Never block the audio thread; a full queue drops the chunk.
                    let _ = tx.try_send(samples);
                },
                move |err| {
                    warn!("Microphone stream error: {}", err);
                },
                None,
            )
            .map_err(|e| SvarError::Audio(format!("Failed to open microphone stream: {e}")))?;

        stream
            .play()
            .map_err(|e| SvarError::Audio(format!("Failed to start microphone stream: {e}")))?;
        debug!("Microphone stream started");

        let deadline = Instant::now() + max_listen;
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(chunk) => {
                    if let Some(utterance) = detector.push_chunk(&chunk) {
                        drop(stream);
                        debug!("Captured utterance of {} samples", utterance.len());
                        return Ok(utterance);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(SvarError::Audio(
                        "Microphone stream closed unexpectedly".to_string(),
                    ));
                }
            }

            if !detector.speech_started() && Instant::now() >= deadline {
                drop(stream);
                debug!("No speech before the listening deadline");
                return Ok(Vec::new());
            }
        }
    }

    /// The rate of samples returned by [`record_utterance`](Self::record_utterance).
    pub fn sample_rate(&self) -> u32 {
        CAPTURE_SAMPLE_RATE
    }
}

/// Names of all available input devices, for diagnostics.
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices
            .filter_map(|d| d.description().ok().map(|desc| desc.name().to_owned()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Average interleaved frames down to a single channel.
fn mix_to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let channels = channels as usize;
    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler, sufficient for speech input.
fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;
        let value = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else {
            samples[samples.len() - 1] as f64
        };
        out.push(value as f32);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono_averages_channels() {
        let stereo = [0.0, 1.0, 0.5, 0.5, -1.0, 1.0];
        let mono = mix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_mix_to_mono_passthrough_for_single_channel() {
        let samples = [0.1, 0.2, 0.3];
        assert_eq!(mix_to_mono(&samples, 1), samples.to_vec());
    }

    #[test]
    fn test_resample_passthrough_for_same_rate() {
        let samples = [0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000), samples.to_vec());
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = [0.0, 1.0, 2.0, 3.0];
        let out = resample(&samples, 4, 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_constant_signal() {
        let samples = vec![0.5; 4800];
        let out = resample(&samples, 48_000, 16_000);
        assert_eq!(out.len(), 1600);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample(&[], 48_000, 16_000).is_empty());
    }
}
