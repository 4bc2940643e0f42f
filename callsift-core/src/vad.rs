//! Energy-based VAD with an adaptive threshold and debounced transitions.
//!
//! ## Algorithm (per frame)
//!
//! 1. Compute the frame's mean absolute amplitude.
//! 2. During the initial calibration window, raise the decision threshold
//!    toward observed ambient energy (never lower it, never past the
//!    configured ceiling). The threshold freezes once the window elapses.
//! 3. Classify the frame loud/quiet against the threshold.
//! 4. Debounce: a provisional state must hold for `voice_ms` /
//!    `voice_end_ms` before `VoiceBegin` / `SilenceBegin` commits.
//!
//! Elapsed time is an explicit accumulator over per-channel sample counts,
//! so behavior is independent of host scheduling.

use tracing::{debug, warn};

use crate::audio::{frame_energy, AudioFrame};
use crate::config::VadConfig;
use crate::events::{LogLevel, LogSink, VadEvent, VadEventKind, VadEventSink};

/// Current debounced classification of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence,
    Voice,
}

impl VadState {
    pub fn is_voice(self) -> bool {
        self == VadState::Voice
    }
}

/// Stream format latched from the first frame. Mid-stream changes are
/// unsupported; later mismatches are logged and the latched format kept.
#[derive(Debug, Clone, Copy)]
struct StreamFormat {
    sample_rate: u32,
    channels: u16,
}

/// One energy VAD per audio stream.
pub struct EnergyVad {
    stream_id: String,
    config: VadConfig,
    /// Current decision threshold; `config.threshold <= this <= config.max_threshold`.
    energy_threshold: f64,
    state: VadState,
    candidate_state: VadState,
    format: Option<StreamFormat>,
    /// Per-channel samples processed since stream start.
    total_samples: u64,
    /// Per-channel samples the candidate state has held.
    candidate_samples: u64,
    event_sink: Option<VadEventSink>,
    log_sink: Option<LogSink>,
}

impl std::fmt::Debug for EnergyVad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyVad")
            .field("stream_id", &self.stream_id)
            .field("state", &self.state)
            .field("energy_threshold", &self.energy_threshold)
            .field("elapsed_ms", &self.elapsed_ms())
            .finish_non_exhaustive()
    }
}

impl EnergyVad {
    /// Create a detector for one audio stream.
    ///
    /// The stream's sample rate and channel count are latched from the first
    /// processed frame.
    pub fn new(stream_id: impl Into<String>, mut config: VadConfig) -> Self {
        config.normalize();
        let energy_threshold = config.threshold;
        Self {
            stream_id: stream_id.into(),
            config,
            energy_threshold,
            state: VadState::Silence,
            candidate_state: VadState::Silence,
            format: None,
            total_samples: 0,
            candidate_samples: 0,
            event_sink: None,
            log_sink: None,
        }
    }

    /// Register the transition event callback. Optional; defaults to no-op.
    pub fn set_event_sink(&mut self, sink: impl FnMut(&VadEvent) + Send + 'static) {
        self.event_sink = Some(Box::new(sink));
    }

    /// Register the diagnostic callback. Optional; defaults to no-op.
    pub fn set_log_sink(&mut self, sink: impl FnMut(LogLevel, &str) + Send + 'static) {
        self.log_sink = Some(Box::new(sink));
    }

    /// Consume one frame, returning the confirmed transition if this frame
    /// committed one. The event sink (if any) is invoked before returning.
    pub fn process_frame(&mut self, frame: &AudioFrame<'_>) -> Option<VadEvent> {
        let format = self.latch_format(frame);
        let energy = frame_energy(frame.samples);
        let frame_samples = frame.samples_per_channel();

        // Adaptive calibration: track ambient noise floor before the
        // adjustment window closes. Raises only, bounded by the ceiling.
        if self.elapsed_ms() < self.config.threshold_adjust_ms
            && energy > self.energy_threshold
            && energy <= self.config.max_threshold
        {
            debug!(
                stream_id = %self.stream_id,
                from = self.energy_threshold,
                to = energy,
                "raising energy threshold toward ambient level"
            );
            self.energy_threshold = energy;
        }

        let frame_state = if energy >= self.energy_threshold {
            VadState::Voice
        } else {
            VadState::Silence
        };

        if frame_state != self.candidate_state {
            self.candidate_state = frame_state;
            self.candidate_samples = frame_samples;
        } else {
            self.candidate_samples += frame_samples;
        }

        // Elapsed time advances every frame, whatever the classification.
        self.total_samples += frame_samples;

        if self.candidate_state == self.state {
            return None;
        }

        let confirm_ms = match self.candidate_state {
            VadState::Voice => self.config.voice_ms,
            VadState::Silence => self.config.voice_end_ms,
        };
        if samples_to_ms(self.candidate_samples, format.sample_rate) < confirm_ms {
            return None;
        }

        self.state = self.candidate_state;
        let event = VadEvent {
            kind: match self.state {
                VadState::Voice => VadEventKind::VoiceBegin,
                VadState::Silence => VadEventKind::SilenceBegin,
            },
            elapsed_ms: self.elapsed_ms(),
            stream_id: self.stream_id.clone(),
        };
        debug!(
            stream_id = %self.stream_id,
            kind = ?event.kind,
            elapsed_ms = event.elapsed_ms,
            "vad transition"
        );
        if let Some(sink) = self.event_sink.as_mut() {
            sink(&event);
        }
        Some(event)
    }

    /// Total audio time processed since stream start, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        match self.format {
            Some(f) => samples_to_ms(self.total_samples, f.sample_rate),
            None => 0,
        }
    }

    /// Current decision threshold (amplitude units).
    pub fn energy_threshold(&self) -> f64 {
        self.energy_threshold
    }

    /// Current debounced classification.
    pub fn state(&self) -> VadState {
        self.state
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Return the detector to its initial state for reuse on a new stream.
    ///
    /// Keeps the configuration and registered sinks; clears the latched
    /// stream format, elapsed time, and the adaptive threshold.
    pub fn reset(&mut self) {
        self.energy_threshold = self.config.threshold;
        self.state = VadState::Silence;
        self.candidate_state = VadState::Silence;
        self.format = None;
        self.total_samples = 0;
        self.candidate_samples = 0;
    }

    fn latch_format(&mut self, frame: &AudioFrame<'_>) -> StreamFormat {
        match self.format {
            Some(latched) => {
                if latched.sample_rate != frame.sample_rate || latched.channels != frame.channels
                {
                    let msg = format!(
                        "stream format changed mid-stream ({}Hz/{}ch -> {}Hz/{}ch) — keeping latched format",
                        latched.sample_rate, latched.channels, frame.sample_rate, frame.channels
                    );
                    warn!(stream_id = %self.stream_id, "{msg}");
                    if let Some(sink) = self.log_sink.as_mut() {
                        sink(LogLevel::Warning, &msg);
                    }
                }
                latched
            }
            None => {
                let latched = StreamFormat {
                    sample_rate: frame.sample_rate.max(1),
                    channels: frame.channels.max(1),
                };
                self.format = Some(latched);
                latched
            }
        }
    }
}

fn samples_to_ms(samples: u64, sample_rate: u32) -> u64 {
    samples * 1000 / u64::from(sample_rate.max(1))
}
