//! Detector configuration: typed structs with defaults plus the string-keyed
//! option surface hosts use (`threshold`, `voice_ms`, …).
//!
//! Option application is non-fatal by design: an out-of-range or non-numeric
//! value is rejected with a diagnostic and the prior value is retained, and
//! unrecognized keys are logged and ignored. Detection always starts.

use tracing::warn;

use crate::error::{CallsiftError, Result};

/// Configuration for [`crate::EnergyVad`].
#[derive(Debug, Clone, PartialEq)]
pub struct VadConfig {
    /// Initial/floor energy decision threshold (amplitude units on i16 PCM).
    pub threshold: f64,
    /// Ceiling the adaptive threshold may not exceed.
    pub max_threshold: f64,
    /// Calibration window from stream start during which the threshold may
    /// still adapt upward. After this elapses the threshold is frozen.
    pub threshold_adjust_ms: u64,
    /// Minimum duration energy must stay above threshold to confirm voice.
    pub voice_ms: u64,
    /// Minimum duration energy must stay below threshold to confirm silence.
    pub voice_end_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 130.0,
            max_threshold: 1300.0,
            threshold_adjust_ms: 200,
            voice_ms: 60,
            voice_end_ms: 850,
        }
    }
}

impl VadConfig {
    /// Apply one string-keyed option.
    ///
    /// # Errors
    /// - `CallsiftError::UnknownOption` if the key is not a VAD option.
    /// - `CallsiftError::InvalidConfigValue` if the value fails its bound
    ///   check; the field keeps its previous value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "threshold" => self.threshold = parse_amplitude(key, value)?,
            "max_threshold" => {
                let v = parse_amplitude(key, value)?;
                if v < self.threshold {
                    return Err(invalid(key, value, "must be >= threshold"));
                }
                self.max_threshold = v;
            }
            "threshold_adjust_ms" => self.threshold_adjust_ms = parse_ms(key, value, true)?,
            "voice_ms" => self.voice_ms = parse_ms(key, value, false)?,
            "voice_end_ms" => self.voice_end_ms = parse_ms(key, value, false)?,
            other => return Err(CallsiftError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// Apply a whole option map, skipping rejected entries.
    ///
    /// Returns the number of rejected entries; each rejection is logged.
    /// Applying the same map twice leaves the config unchanged.
    pub fn apply_map<K, V, I>(&mut self, entries: I) -> usize
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        apply_entries(entries, |key, value| self.set(key, value))
    }

    /// Enforce cross-field invariants, warning on adjustments.
    ///
    /// Detectors call this once at creation so `threshold <= max_threshold`
    /// holds regardless of the order options were applied in.
    pub fn normalize(&mut self) {
        if self.threshold > self.max_threshold {
            warn!(
                threshold = self.threshold,
                max_threshold = self.max_threshold,
                "threshold exceeds max_threshold — clamping down"
            );
            self.threshold = self.max_threshold;
        }
    }
}

/// Configuration for [`crate::AmdClassifier`]: all VAD options (forwarded to
/// the owned VAD) plus the AMD timing thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct AmdConfig {
    pub vad: VadConfig,
    /// Maximum elapsed time with no voice before the dead-air verdict fires.
    pub wait_for_voice_ms: u64,
    /// Minimum continuous-voice duration that marks a segment as machine
    /// speech rather than human speech.
    pub machine_ms: u64,
}

impl Default for AmdConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            wait_for_voice_ms: 2000,
            machine_ms: 1300,
        }
    }
}

impl AmdConfig {
    /// Apply one string-keyed option, delegating VAD keys to the owned
    /// [`VadConfig`]. Same error contract as [`VadConfig::set`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "wait_for_voice_ms" => self.wait_for_voice_ms = parse_ms(key, value, false)?,
            "machine_ms" => self.machine_ms = parse_ms(key, value, false)?,
            _ => self.vad.set(key, value)?,
        }
        Ok(())
    }

    /// Apply a whole option map, skipping rejected entries.
    pub fn apply_map<K, V, I>(&mut self, entries: I) -> usize
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        apply_entries(entries, |key, value| self.set(key, value))
    }

    pub fn normalize(&mut self) {
        self.vad.normalize();
    }
}

fn apply_entries<K, V, I, F>(entries: I, mut set: F) -> usize
where
    K: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
    F: FnMut(&str, &str) -> Result<()>,
{
    let mut rejected = 0;
    for (key, value) in entries {
        if let Err(e) = set(key.as_ref(), value.as_ref()) {
            warn!(key = key.as_ref(), value = value.as_ref(), "ignoring option: {e}");
            rejected += 1;
        }
    }
    rejected
}

fn invalid(key: &str, value: &str, reason: &str) -> CallsiftError {
    CallsiftError::InvalidConfigValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Amplitude-unit thresholds must sit strictly inside the i16 positive range.
fn parse_amplitude(key: &str, value: &str) -> Result<f64> {
    let v: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "not a number"))?;
    if !v.is_finite() || v <= 0.0 || v >= 32767.0 {
        return Err(invalid(key, value, "must satisfy 0 < v < 32767"));
    }
    Ok(v)
}

fn parse_ms(key: &str, value: &str, zero_ok: bool) -> Result<u64> {
    let v: u64 = value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "not a non-negative integer"))?;
    if v == 0 && !zero_ok {
        return Err(invalid(key, value, "must be positive"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_satisfy_invariants() {
        let cfg = VadConfig::default();
        assert!(cfg.threshold <= cfg.max_threshold);
        assert!(cfg.voice_ms > 0);
        assert!(cfg.voice_end_ms > 0);
    }

    #[test]
    fn set_accepts_in_range_values() {
        let mut cfg = VadConfig::default();
        cfg.set("threshold", "200").unwrap();
        cfg.set("max_threshold", "2000").unwrap();
        cfg.set("threshold_adjust_ms", "0").unwrap();
        cfg.set("voice_ms", "40").unwrap();
        assert_eq!(cfg.threshold, 200.0);
        assert_eq!(cfg.max_threshold, 2000.0);
        assert_eq!(cfg.threshold_adjust_ms, 0);
        assert_eq!(cfg.voice_ms, 40);
    }

    #[test]
    fn rejected_value_retains_previous() {
        let mut cfg = VadConfig::default();
        assert!(cfg.set("threshold", "0").is_err());
        assert!(cfg.set("threshold", "40000").is_err());
        assert!(cfg.set("threshold", "loud").is_err());
        assert_eq!(cfg.threshold, VadConfig::default().threshold);

        assert!(cfg.set("voice_ms", "0").is_err());
        assert_eq!(cfg.voice_ms, VadConfig::default().voice_ms);
    }

    #[test]
    fn max_threshold_must_not_drop_below_threshold() {
        let mut cfg = VadConfig::default();
        cfg.set("threshold", "500").unwrap();
        assert!(cfg.set("max_threshold", "400").is_err());
        assert_eq!(cfg.max_threshold, VadConfig::default().max_threshold);
    }

    #[test]
    fn unknown_key_is_an_error_not_a_mutation() {
        let mut cfg = AmdConfig::default();
        let before = cfg.clone();
        assert!(matches!(
            cfg.set("beep_detect", "1"),
            Err(CallsiftError::UnknownOption(_))
        ));
        assert_eq!(cfg, before);
    }

    #[test]
    fn amd_set_forwards_vad_keys() {
        let mut cfg = AmdConfig::default();
        cfg.set("voice_end_ms", "500").unwrap();
        cfg.set("machine_ms", "1500").unwrap();
        assert_eq!(cfg.vad.voice_end_ms, 500);
        assert_eq!(cfg.machine_ms, 1500);
    }

    #[test]
    fn apply_map_is_idempotent_and_counts_rejections() {
        let entries = [
            ("threshold", "150"),
            ("machine_ms", "1100"),
            ("threshold", "-3"),
            ("ring_timeout", "9"),
        ];

        let mut first = AmdConfig::default();
        let rejected = first.apply_map(entries);
        assert_eq!(rejected, 2);

        let mut second = first.clone();
        let rejected = second.apply_map(entries);
        assert_eq!(rejected, 2);
        assert_eq!(first, second);
        assert_eq!(first.vad.threshold, 150.0);
        assert_eq!(first.machine_ms, 1100);
    }

    #[test]
    fn normalize_clamps_threshold_to_ceiling() {
        let mut cfg = VadConfig {
            threshold: 2000.0,
            max_threshold: 1300.0,
            ..VadConfig::default()
        };
        cfg.normalize();
        assert_eq!(cfg.threshold, 1300.0);
    }
}
