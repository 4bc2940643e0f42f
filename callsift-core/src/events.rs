//! Event types delivered to caller-supplied sinks.
//!
//! The event vocabulary is closed and small, so both layers use tagged enums
//! with exhaustive matches at the sink boundary. Payloads serialize to JSON
//! (camelCase fields, kebab-case kinds) so hosts can forward them verbatim
//! to call-control or telemetry layers.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// VAD events
// ---------------------------------------------------------------------------

/// Debounced voice/silence transition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VadEventKind {
    /// Energy held above threshold for the voice confirm duration.
    VoiceBegin,
    /// Energy held below threshold for the silence confirm duration.
    SilenceBegin,
}

/// A confirmed voice/silence transition from the energy VAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VadEvent {
    pub kind: VadEventKind,
    /// Audio time processed since detection start, at the moment of commit.
    pub elapsed_ms: u64,
    /// Identifier of the owning stream, forwarded unchanged by the AMD layer.
    pub stream_id: String,
}

// ---------------------------------------------------------------------------
// AMD events
// ---------------------------------------------------------------------------

/// Human/machine/dead-air verdicts produced per voice or silence segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmdEventKind {
    /// No voice activity within the initial waiting window. Fires at most
    /// once per stream.
    DeadAir,
    /// A voice segment at least `machine_ms` long just ended.
    MachineVoice,
    /// Silence following a machine voice segment just ended.
    MachineSilence,
    /// A voice segment shorter than `machine_ms` just ended.
    HumanVoice,
    /// Silence following a human voice segment just ended.
    HumanSilence,
}

/// A classified segment (or dead-air verdict) from the AMD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmdEvent {
    pub kind: AmdEventKind,
    /// Elapsed time of the underlying VAD transition (or timeout check).
    pub elapsed_ms: u64,
    /// Stream identifier, carried over from the owned VAD.
    pub stream_id: String,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Severity of a diagnostic message sent to a log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Caller-supplied VAD event callback. Defaults to no-op when unset.
pub type VadEventSink = Box<dyn FnMut(&VadEvent) + Send>;

/// Caller-supplied AMD event callback. Defaults to no-op when unset.
pub type AmdEventSink = Box<dyn FnMut(&AmdEvent) + Send>;

/// Caller-supplied diagnostic callback. Defaults to no-op when unset;
/// `tracing` output is emitted regardless.
pub type LogSink = Box<dyn FnMut(LogLevel, &str) + Send>;
