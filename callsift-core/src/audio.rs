//! Typed audio frame passed from the host's media tap into the detectors.

/// A borrowed view of one block of interleaved linear-PCM samples.
///
/// Frames are delivered at a regular cadence (typically 10–20 ms) and are
/// never buffered by the detectors — only the view for the current call to
/// `process_frame` is needed.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    /// Interleaved signed 16-bit PCM samples.
    pub samples: &'a [i16],
    /// Sample rate in Hz (e.g. 8000 for narrow-band telephony).
    pub sample_rate: u32,
    /// Number of interleaved channels. `0` is treated as mono.
    pub channels: u16,
}

impl<'a> AudioFrame<'a> {
    pub fn new(samples: &'a [i16], sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of samples per channel in this frame.
    pub fn samples_per_channel(&self) -> u64 {
        self.samples.len() as u64 / u64::from(self.channels.max(1))
    }

    /// Returns true if the frame contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Mean absolute amplitude over all samples of all channels.
///
/// Monotonic in signal loudness and deterministic for identical input.
/// Zero-length frames carry zero energy.
pub fn frame_energy(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|s| u64::from(s.unsigned_abs())).sum();
    sum as f64 / samples.len() as f64
}
