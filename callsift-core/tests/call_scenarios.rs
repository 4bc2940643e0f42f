//! End-to-end call scenarios driving the detectors with synthesized
//! narrow-band PCM, the way a media-server tap would.

use callsift_core::{
    AmdClassifier, AmdConfig, AmdEvent, AmdEventKind, AudioFrame, EnergyVad, VadConfig, VadEvent,
};

const RATE: u32 = 8000;
const FRAME_LEN: usize = 160; // 20 ms mono

/// Duration-to-frame-count for the fixed 20 ms cadence.
fn frames(ms: u64) -> usize {
    (ms / 20) as usize
}

fn drive_amd(amd: &mut AmdClassifier, amplitude: i16, ms: u64) -> Vec<AmdEvent> {
    let samples = vec![amplitude; FRAME_LEN];
    let frame = AudioFrame::new(&samples, RATE, 1);
    (0..frames(ms))
        .filter_map(|_| amd.process_frame(&frame))
        .collect()
}

fn drive_vad(vad: &mut EnergyVad, amplitude: i16, ms: u64) -> Vec<VadEvent> {
    let samples = vec![amplitude; FRAME_LEN];
    let frame = AudioFrame::new(&samples, RATE, 1);
    (0..frames(ms))
        .filter_map(|_| vad.process_frame(&frame))
        .collect()
}

fn fast_calibration() -> AmdConfig {
    AmdConfig {
        vad: VadConfig {
            threshold_adjust_ms: 0,
            ..VadConfig::default()
        },
        ..AmdConfig::default()
    }
}

#[test]
fn constant_silence_yields_one_dead_air_and_no_transitions() {
    let mut vad = EnergyVad::new("call-vad", VadConfig::default());
    assert!(drive_vad(&mut vad, 0, 3000).is_empty());

    let mut amd = AmdClassifier::new("call-amd", AmdConfig::default());
    let events = drive_amd(&mut amd, 0, 3000);
    assert_eq!(
        events,
        vec![AmdEvent {
            kind: AmdEventKind::DeadAir,
            elapsed_ms: 2000,
            stream_id: "call-amd".into(),
        }]
    );
}

#[test]
fn long_burst_resolves_to_machine_voice_at_silence_confirm() {
    let mut amd = AmdClassifier::new("call-1", fast_calibration());

    // 1500 ms above threshold, then quiet. VoiceBegin commits 60 ms after
    // onset; the segment resolves when silence confirms 860 ms later.
    let mut events = drive_amd(&mut amd, 400, 1500);
    events.extend(drive_amd(&mut amd, 0, 1000));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AmdEventKind::MachineVoice);
    assert_eq!(events[0].elapsed_ms, 1500 + 860);
}

#[test]
fn short_burst_resolves_to_human_voice() {
    let mut amd = AmdClassifier::new("call-1", fast_calibration());

    let mut events = drive_amd(&mut amd, 400, 400);
    events.extend(drive_amd(&mut amd, 0, 1000));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AmdEventKind::HumanVoice);
    assert_eq!(events[0].elapsed_ms, 400 + 860);
}

#[test]
fn threshold_calibration_rises_then_freezes() {
    // Ambient 150 with threshold=130, max_threshold=1300,
    // threshold_adjust_ms=200: the threshold follows the ambient level
    // inside the window and stays put afterward.
    let mut vad = EnergyVad::new("call-1", VadConfig::default());
    drive_vad(&mut vad, 150, 200);
    assert_eq!(vad.energy_threshold(), 150.0);

    drive_vad(&mut vad, 0, 2000);
    let events = drive_vad(&mut vad, 140, 500);
    assert!(events.is_empty(), "140 is below the raised threshold");
    assert_eq!(vad.energy_threshold(), 150.0);
}

#[test]
fn amd_emits_exactly_one_event_per_vad_transition() {
    let config = fast_calibration();
    let mut vad = EnergyVad::new("call-1", config.vad.clone());
    let mut amd = AmdClassifier::new("call-1", config);

    // Alternating talk turns and gaps, each long enough to confirm.
    let script: &[(i16, u64)] = &[
        (0, 400),
        (500, 1600),
        (0, 1200),
        (500, 300),
        (0, 1500),
        (500, 2000),
        (0, 1000),
    ];

    let mut vad_transitions = Vec::new();
    let mut amd_events = Vec::new();
    for &(amplitude, ms) in script {
        vad_transitions.extend(drive_vad(&mut vad, amplitude, ms));
        amd_events.extend(drive_amd(&mut amd, amplitude, ms));
    }

    let classifications: Vec<_> = amd_events
        .iter()
        .filter(|e| e.kind != AmdEventKind::DeadAir)
        .collect();

    // The stream's first VoiceBegin opens the first segment; every other
    // transition closes exactly one segment and yields exactly one verdict,
    // stamped with the transition's own time and stream id.
    assert!(!vad_transitions.is_empty());
    assert_eq!(classifications.len(), vad_transitions.len() - 1);
    assert_eq!(vad_transitions.len(), 6);
    for (transition, verdict) in vad_transitions.iter().skip(1).zip(&classifications[..]) {
        assert_eq!(transition.elapsed_ms, verdict.elapsed_ms);
        assert_eq!(transition.stream_id, verdict.stream_id);
    }
}

#[test]
fn identical_config_maps_produce_identical_behavior() {
    let entries = [
        ("threshold", "200"),
        ("voice_ms", "40"),
        ("voice_end_ms", "600"),
        ("machine_ms", "1000"),
        ("wait_for_voice_ms", "1500"),
        ("threshold_adjust_ms", "0"),
        ("caller_id", "ignored"), // unknown key: logged, ignored
    ];

    let mut once = AmdConfig::default();
    once.apply_map(entries);
    let mut twice = once.clone();
    twice.apply_map(entries);
    assert_eq!(once, twice);

    let mut a = AmdClassifier::new("call-1", once);
    let mut b = AmdClassifier::new("call-1", twice);
    let mut events_a = drive_amd(&mut a, 400, 1200);
    events_a.extend(drive_amd(&mut a, 0, 800));
    let mut events_b = drive_amd(&mut b, 400, 1200);
    events_b.extend(drive_amd(&mut b, 0, 800));
    assert_eq!(events_a, events_b);
    assert_eq!(events_a.len(), 1);
    assert_eq!(events_a[0].kind, AmdEventKind::MachineVoice);
}

#[test]
fn event_payloads_serialize_for_host_forwarding() {
    let mut amd = AmdClassifier::new("b4c7", AmdConfig::default());
    let events = drive_amd(&mut amd, 0, 2000);
    assert_eq!(events.len(), 1);

    let json = serde_json::to_value(&events[0]).expect("serialize amd event");
    assert_eq!(json["kind"], "dead-air");
    assert_eq!(json["elapsedMs"], 2000);
    assert_eq!(json["streamId"], "b4c7");
}
