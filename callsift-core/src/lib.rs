//! # callsift-core
//!
//! Frame-by-frame voice activity detection (VAD) and answering machine
//! detection (AMD) for narrow-band telephony audio.
//!
//! ## Architecture
//!
//! ```text
//! PCM frame → EnergyVad (energy, adaptive threshold, debounce)
//!                  │
//!            VadEvent (VoiceBegin / SilenceBegin)
//!                  │
//!           AmdClassifier (segment timing, dead-air timeout)
//!                  │
//!            AmdEvent (DeadAir / MachineVoice / … ) → caller sink
//! ```
//!
//! Everything is synchronous and single-threaded per stream: the host pushes
//! one frame at a time and all classification work, including sink
//! notification, completes before `process_frame` returns. Detectors for
//! different calls are independent and may live on different threads.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod amd;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod vad;

// Convenience re-exports for downstream crates
pub use amd::AmdClassifier;
pub use audio::AudioFrame;
pub use config::{AmdConfig, VadConfig};
pub use error::CallsiftError;
pub use events::{AmdEvent, AmdEventKind, LogLevel, VadEvent, VadEventKind};
pub use vad::{EnergyVad, VadState};
