//! End-to-end tests: encoded bytes -> backend decode -> graph render

use emepetre_audio::{
    AudioGraph, BackendFactory, ContextState, EqPreset, HeadlessBackendFactory, ManualClock,
};
use std::io::Cursor;
use std::sync::Arc;

// ===== Test Helpers =====

fn wav_tone(sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (seconds * sample_rate as f32) as usize;
        for i in 0..frames {
            let s = amplitude
                * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32).sin();
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
}

async fn graph_with_tone(amplitude: f32) -> (AudioGraph, ManualClock) {
    let clock = ManualClock::new();
    let factory = HeadlessBackendFactory::new(44100, Arc::new(clock.clone()));
    let mut graph = AudioGraph::new();
    graph.initialize(factory.create().unwrap());
    graph.resume().unwrap();
    assert_eq!(graph.context_state(), Some(ContextState::Running));

    let decoded = graph.decode(wav_tone(44100, 0.5, amplitude)).await.unwrap();
    assert_eq!(decoded.channels(), 2);
    graph.start_source(Arc::new(decoded), 0.0).unwrap();
    (graph, clock)
}

// ===== Tests =====

#[tokio::test]
async fn decoded_file_plays_at_master_volume() {
    let (mut graph, _clock) = graph_with_tone(0.2).await;
    graph.set_master_volume(0.5);

    let mut out = vec![0.0f32; 2 * 4096];
    graph.render(&mut out);

    let p = peak(&out[1024..]);
    assert!((p - 0.1).abs() < 0.01, "peak {p}");
}

#[tokio::test]
async fn limiter_holds_boosted_signal_below_clipping() {
    let (mut graph, _clock) = graph_with_tone(0.9).await;
    graph.set_master_volume(1.0);
    graph.set_preamp_db(12.0);
    graph.equalizer_mut().set_band_gain(5, 12.0);

    let mut out = vec![0.0f32; 2 * 16384];
    graph.render(&mut out);

    // Steady state after the attack phase
    let settled = peak(&out[2 * 8192..]);
    assert!(settled < 1.5, "settled peak {settled}");
    assert!(graph.limiter().current_reduction() < -10.0);
}

#[tokio::test]
async fn presets_change_the_spectrum_not_the_wiring() {
    let (mut graph, _clock) = graph_with_tone(0.05).await;
    graph.set_master_volume(1.0);

    let mut flat = vec![0.0f32; 2 * 4096];
    graph.render(&mut flat);

    graph.equalizer_mut().apply_preset(EqPreset::Vocal);
    let mut vocal = vec![0.0f32; 2 * 8192];
    graph.render(&mut vocal);

    let expected = graph.equalizer().frequency_response(&[1000.0]).magnitudes[0];
    assert!(expected > 1.5, "vocal preset should lift 1 kHz");

    let ratio = peak(&vocal[2 * 4096..]) / peak(&flat[2048..]);
    assert!((ratio - expected).abs() / expected < 0.05, "ratio {ratio}, expected {expected}");
}

#[tokio::test]
async fn corrupt_bytes_fail_to_decode() {
    let clock = ManualClock::new();
    let factory = HeadlessBackendFactory::new(44100, Arc::new(clock));
    let mut graph = AudioGraph::new();
    graph.initialize(factory.create().unwrap());

    assert!(graph.decode(vec![0xde, 0xad, 0xbe, 0xef]).await.is_err());
}
