//! Energy-based utterance detection.
//!
//! Splits a live microphone stream into utterances by RMS energy
//! thresholding: speech starts when a 32 ms frame crosses the energy
//! threshold and ends after a configurable run of trailing silence.

use tracing::debug;

/// Frame length used for energy analysis, in milliseconds.
const FRAME_MS: u32 = 32;

/// Detects a single utterance in a stream of audio samples.
///
/// Feed samples with [`push_chunk`](Self::push_chunk) as they arrive;
/// chunk boundaries do not need to align with analysis frames. When a
/// complete utterance has been captured the accumulated samples are
/// returned and the detector is ready for the next one.
pub struct UtteranceDetector {
    /// Samples per analysis frame.
    frame_samples: usize,
    /// RMS energy above which a frame counts as speech.
    energy_threshold: f32,
    /// Consecutive silent frames that end an utterance.
    silence_frames: u32,
    /// Minimum number of speech samples for a valid utterance.
    min_speech_samples: usize,
    /// Samples waiting to fill the next analysis frame.
    pending: Vec<f32>,
    /// Accumulated samples of the current utterance.
    utterance: Vec<f32>,
    in_speech: bool,
    silence_count: u32,
}

impl UtteranceDetector {
    pub fn new(sample_rate: u32, energy_threshold: f32, silence_ms: u32, min_speech_ms: u32) -> Self {
        let frame_samples = (sample_rate * FRAME_MS / 1000) as usize;
        let silence_frames = (silence_ms / FRAME_MS).max(1);
        let min_speech_samples = (min_speech_ms as usize * sample_rate as usize) / 1000;

        debug!(
            "Utterance detector: threshold={}, silence={} frames, min_speech={} samples",
            energy_threshold, silence_frames, min_speech_samples
        );

        Self {
            frame_samples,
            energy_threshold,
            silence_frames,
            min_speech_samples,
            pending: Vec::new(),
            utterance: Vec::new(),
            in_speech: false,
            silence_count: 0,
        }
    }

    /// Feed captured samples into the detector.
    ///
    /// Returns the full utterance (speech plus trailing silence) once the
    /// silence run after speech is long enough. Blips shorter than the
    /// minimum speech duration are discarded and detection continues.
    pub fn push_chunk(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            if let Some(utterance) = self.process_frame(&frame) {
                return Some(utterance);
            }
        }

        None
    }

    fn process_frame(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        let energy = rms_energy(frame);
        let is_speech = energy > self.energy_threshold;

        if is_speech {
            if !self.in_speech {
                self.in_speech = true;
                self.utterance.clear();
                debug!("Speech started (energy {:.4})", energy);
            }
            self.silence_count = 0;
            self.utterance.extend_from_slice(frame);
        } else if self.in_speech {
            self.silence_count += 1;
            self.utterance.extend_from_slice(frame);

            if self.silence_count >= self.silence_frames {
                self.in_speech = false;
                self.silence_count = 0;

                let trailing = self.silence_frames as usize * self.frame_samples;
                let speech_samples = self.utterance.len().saturating_sub(trailing);
                if speech_samples >= self.min_speech_samples {
                    debug!("Utterance complete ({} samples)", self.utterance.len());
                    return Some(std::mem::take(&mut self.utterance));
                }

                debug!("Discarding short blip ({} speech samples)", speech_samples);
                self.utterance.clear();
            }
        }

        None
    }

    /// Whether any speech has been detected since the last reset.
    pub fn speech_started(&self) -> bool {
        self.in_speech || !self.utterance.is_empty()
    }

    /// Discard all buffered audio and return to the idle state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.utterance.clear();
        self.in_speech = false;
        self.silence_count = 0;
    }
}

/// Root-mean-square energy of a frame.
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
