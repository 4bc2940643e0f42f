//! Answering machine detection layered on the energy VAD.
//!
//! The classifier owns one [`EnergyVad`], measures how long each confirmed
//! voice/silence segment lasted, and classifies each segment as it ends:
//! a voice segment at least `machine_ms` long is machine speech (greeting
//! messages are one long utterance), anything shorter is human. A silence
//! segment inherits the verdict of the voice segment before it. If no voice
//! at all arrives within `wait_for_voice_ms`, a single `DeadAir` verdict
//! fires and detection keeps running.
//!
//! Classifying per segment means the caller can react as soon as a segment
//! resolves; no terminal "call over" signal is needed.

use tracing::{debug, warn};

use crate::audio::AudioFrame;
use crate::config::AmdConfig;
use crate::events::{AmdEvent, AmdEventKind, AmdEventSink, LogLevel, LogSink, VadEventKind};
use crate::vad::EnergyVad;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmdPhase {
    /// No voice seen yet; the dead-air timeout is armed.
    AwaitingFirstVoice,
    InVoiceSegment,
    InSilenceSegment,
}

/// Verdict of the most recently ended voice segment. Doubles as the soft
/// "decided" marker: classification continues per segment after it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Human,
    Machine,
}

/// One AMD classifier per audio stream; exclusively owns its VAD.
pub struct AmdClassifier {
    vad: EnergyVad,
    wait_for_voice_ms: u64,
    machine_ms: u64,
    phase: AmdPhase,
    /// Elapsed time at which the current segment began.
    segment_start_ms: u64,
    dead_air_fired: bool,
    last_voice_verdict: Option<Verdict>,
    event_sink: Option<AmdEventSink>,
    log_sink: Option<LogSink>,
}

impl std::fmt::Debug for AmdClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmdClassifier")
            .field("vad", &self.vad)
            .field("phase", &self.phase)
            .field("segment_start_ms", &self.segment_start_ms)
            .field("dead_air_fired", &self.dead_air_fired)
            .finish_non_exhaustive()
    }
}

impl AmdClassifier {
    /// Create a classifier for one audio stream. The VAD part of `config`
    /// seeds the owned detector.
    pub fn new(stream_id: impl Into<String>, mut config: AmdConfig) -> Self {
        config.normalize();
        Self {
            vad: EnergyVad::new(stream_id, config.vad),
            wait_for_voice_ms: config.wait_for_voice_ms,
            machine_ms: config.machine_ms,
            phase: AmdPhase::AwaitingFirstVoice,
            segment_start_ms: 0,
            dead_air_fired: false,
            last_voice_verdict: None,
            event_sink: None,
            log_sink: None,
        }
    }

    /// Register the verdict event callback. Optional; defaults to no-op.
    pub fn set_event_sink(&mut self, sink: impl FnMut(&AmdEvent) + Send + 'static) {
        self.event_sink = Some(Box::new(sink));
    }

    /// Register the diagnostic callback. Optional; defaults to no-op.
    pub fn set_log_sink(&mut self, sink: impl FnMut(LogLevel, &str) + Send + 'static) {
        self.log_sink = Some(Box::new(sink));
    }

    /// Consume one frame, returning the verdict if this frame produced one.
    ///
    /// Every VAD transition yields exactly one classification event, and at
    /// most one `DeadAir` fires per stream. The event sink (if any) is
    /// invoked before returning.
    pub fn process_frame(&mut self, frame: &AudioFrame<'_>) -> Option<AmdEvent> {
        let transition = self.vad.process_frame(frame);

        let Some(transition) = transition else {
            // A voiceless stream times out exactly once; detection continues.
            if self.phase == AmdPhase::AwaitingFirstVoice
                && !self.dead_air_fired
                && self.vad.elapsed_ms() >= self.wait_for_voice_ms
            {
                self.dead_air_fired = true;
                let elapsed_ms = self.vad.elapsed_ms();
                let stream_id = self.vad.stream_id().to_string();
                return self.emit(AmdEventKind::DeadAir, elapsed_ms, stream_id);
            }
            return None;
        };

        match (self.phase, transition.kind) {
            (AmdPhase::AwaitingFirstVoice, VadEventKind::VoiceBegin) => {
                self.segment_start_ms = transition.elapsed_ms;
                self.phase = AmdPhase::InVoiceSegment;
                None
            }
            (AmdPhase::InVoiceSegment, VadEventKind::SilenceBegin) => {
                let duration = transition.elapsed_ms - self.segment_start_ms;
                let verdict = if duration >= self.machine_ms {
                    Verdict::Machine
                } else {
                    Verdict::Human
                };
                self.last_voice_verdict = Some(verdict);
                self.segment_start_ms = transition.elapsed_ms;
                self.phase = AmdPhase::InSilenceSegment;
                let kind = match verdict {
                    Verdict::Machine => AmdEventKind::MachineVoice,
                    Verdict::Human => AmdEventKind::HumanVoice,
                };
                self.emit(kind, transition.elapsed_ms, transition.stream_id)
            }
            (AmdPhase::InSilenceSegment, VadEventKind::VoiceBegin) => {
                // A silence segment inherits the preceding voice verdict;
                // last_voice_verdict is always set once this phase is reached.
                let kind = match self.last_voice_verdict.unwrap_or(Verdict::Human) {
                    Verdict::Machine => AmdEventKind::MachineSilence,
                    Verdict::Human => AmdEventKind::HumanSilence,
                };
                self.segment_start_ms = transition.elapsed_ms;
                self.phase = AmdPhase::InVoiceSegment;
                self.emit(kind, transition.elapsed_ms, transition.stream_id)
            }
            (phase, kind) => {
                // Unreachable while the VAD alternates transitions; resync so
                // the state machine can never wedge.
                let msg = format!(
                    "unexpected {kind:?} in phase {phase:?} at {} ms — resyncing",
                    transition.elapsed_ms
                );
                warn!(stream_id = %transition.stream_id, "{msg}");
                if let Some(sink) = self.log_sink.as_mut() {
                    sink(LogLevel::Warning, &msg);
                }
                self.segment_start_ms = transition.elapsed_ms;
                self.phase = match kind {
                    VadEventKind::VoiceBegin => AmdPhase::InVoiceSegment,
                    VadEventKind::SilenceBegin => AmdPhase::InSilenceSegment,
                };
                None
            }
        }
    }

    /// The owned VAD, for host diagnostics.
    pub fn vad(&self) -> &EnergyVad {
        &self.vad
    }

    /// Total audio time processed since stream start, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.vad.elapsed_ms()
    }

    /// Return the classifier and its VAD to their initial state for reuse.
    pub fn reset(&mut self) {
        self.vad.reset();
        self.phase = AmdPhase::AwaitingFirstVoice;
        self.segment_start_ms = 0;
        self.dead_air_fired = false;
        self.last_voice_verdict = None;
    }

    fn emit(&mut self, kind: AmdEventKind, elapsed_ms: u64, stream_id: String) -> Option<AmdEvent> {
        let event = AmdEvent {
            kind,
            elapsed_ms,
            stream_id,
        };
        debug!(
            stream_id = %event.stream_id,
            kind = ?event.kind,
            elapsed_ms = event.elapsed_ms,
            "amd verdict"
        );
        if let Some(sink) = self.event_sink.as_mut() {
            sink(&event);
        }
        Some(event)
    }
}
