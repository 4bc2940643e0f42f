//! Offline driver for the Callsift detectors.
//!
//! Stands in for a media-server tap: reads a 16-bit PCM WAV file, slices it
//! into fixed-duration frames, pushes them through an [`AmdClassifier`] (or a
//! bare [`EnergyVad`] with `--vad-only`), and prints each emitted event as a
//! JSON line, exactly the payload a host would forward to call control.
//!
//! ```text
//! callsift [--vad-only] [--frame-ms <n>] [--set key=value]... <file.wav>
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use callsift_core::{AmdClassifier, AmdConfig, AudioFrame, EnergyVad, VadConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    wav_path: PathBuf,
    frame_ms: u64,
    options: Vec<(String, String)>,
    vad_only: bool,
    stream_id: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut wav_path: Option<PathBuf> = None;
    let mut frame_ms: u64 = 20;
    let mut options = Vec::new();
    let mut vad_only = false;
    let mut stream_id: Option<String> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--frame-ms" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --frame-ms");
                };
                frame_ms = v
                    .parse::<u64>()
                    .context("invalid value for --frame-ms")?
                    .clamp(1, 100);
            }
            "--set" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --set");
                };
                let Some((key, value)) = v.split_once('=') else {
                    bail!("--set expects key=value, got '{v}'");
                };
                options.push((key.to_string(), value.to_string()));
            }
            "--stream-id" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --stream-id");
                };
                stream_id = Some(v);
            }
            "--vad-only" => vad_only = true,
            "--help" | "-h" => {
                println!(
                    "Usage: callsift [--vad-only] [--frame-ms <n>] [--stream-id <id>] \\
  [--set key=value]... <file.wav>

Options (via --set): threshold, max_threshold, threshold_adjust_ms,
voice_ms, voice_end_ms, wait_for_voice_ms, machine_ms"
                );
                std::process::exit(0);
            }
            other if !other.starts_with('-') => wav_path = Some(PathBuf::from(other)),
            other => bail!("unknown argument: {other}"),
        }
    }

    let Some(wav_path) = wav_path else {
        bail!("missing WAV file argument (see --help)");
    };
    Ok(Args {
        wav_path,
        frame_ms,
        options,
        vad_only,
        stream_id,
    })
}

/// Read an integer-PCM WAV as interleaved i16, keeping channels intact.
fn read_wav_i16(path: &Path) -> anyhow::Result<(Vec<i16>, u32, u16)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("open {}", path.display()))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample > 16 {
        bail!(
            "{}: expected 16-bit integer PCM, got {:?}/{} bits",
            path.display(),
            spec.sample_format,
            spec.bits_per_sample
        );
    }
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("decode {}", path.display()))?;
    Ok((samples, spec.sample_rate, spec.channels.max(1)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let (samples, sample_rate, channels) = read_wav_i16(&args.wav_path)?;

    let stream_id = args.stream_id.clone().unwrap_or_else(|| {
        args.wav_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stream".to_string())
    });

    let frame_samples = (u64::from(sample_rate) * args.frame_ms / 1000) as usize
        * usize::from(channels);
    if frame_samples == 0 {
        bail!("frame of {} ms is empty at {} Hz", args.frame_ms, sample_rate);
    }

    info!(
        file = %args.wav_path.display(),
        sample_rate,
        channels,
        frame_ms = args.frame_ms,
        total_samples = samples.len(),
        "starting detection"
    );

    let mut emitted = 0usize;
    if args.vad_only {
        let mut config = VadConfig::default();
        let rejected = config.apply_map(
            args.options
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        if rejected > 0 {
            info!(rejected, "some options were ignored");
        }
        let mut vad = EnergyVad::new(stream_id, config);
        for chunk in samples.chunks(frame_samples) {
            let frame = AudioFrame::new(chunk, sample_rate, channels);
            if let Some(event) = vad.process_frame(&frame) {
                println!("{}", serde_json::to_string(&event)?);
                emitted += 1;
            }
        }
        info!(
            elapsed_ms = vad.elapsed_ms(),
            energy_threshold = vad.energy_threshold(),
            events = emitted,
            "detection finished"
        );
    } else {
        let mut config = AmdConfig::default();
        let rejected = config.apply_map(
            args.options
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        if rejected > 0 {
            info!(rejected, "some options were ignored");
        }
        let mut amd = AmdClassifier::new(stream_id, config);
        for chunk in samples.chunks(frame_samples) {
            let frame = AudioFrame::new(chunk, sample_rate, channels);
            if let Some(event) = amd.process_frame(&frame) {
                println!("{}", serde_json::to_string(&event)?);
                emitted += 1;
            }
        }
        info!(
            elapsed_ms = amd.elapsed_ms(),
            events = emitted,
            "detection finished"
        );
    }

    Ok(())
}
