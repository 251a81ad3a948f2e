use spectralight_media::{decode_to_mono, load_samples, DecodeOptions, MediaError};
use std::path::Path;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32, amplitude: f32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f32 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * std::f32::consts::PI * 100.0 * t).sin() * amplitude;
        for _ in 0..channels {
            writer
                .write_sample((value * i16::MAX as f32) as i16)
                .unwrap();
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn test_mono_wav_at_target_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 44100, 1, 0.5, 0.5);

    let buffer = load_samples(&path, &DecodeOptions::default()).unwrap();
    assert_eq!(buffer.sample_rate(), 44100);
    assert_eq!(buffer.len(), 22050);

    let peak = buffer.samples().iter().fold(0.0f32, |a, s| a.max(s.abs()));
    assert!((peak - 1.0).abs() < 1e-6, "peak normalized, got {}", peak);
}

#[test]
fn test_stereo_wav_is_mixed_down() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    write_wav(&path, 44100, 2, 0.25, 0.8);

    let mono = decode_to_mono(&path).unwrap();
    assert_eq!(mono.sample_rate, 44100);
    assert_eq!(mono.samples.len(), 11025);

    // Identical channels average to the original amplitude
    let peak = mono.samples.iter().fold(0.0f32, |a, s| a.max(s.abs()));
    assert!((peak - 0.8).abs() < 0.01);
}

#[test]
fn test_resampled_to_analysis_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone48k.wav");
    write_wav(&path, 48000, 1, 1.0, 0.5);

    let buffer = load_samples(&path, &DecodeOptions::with_rate(44100)).unwrap();
    assert_eq!(buffer.sample_rate(), 44100);
    let expected = 44100.0;
    assert!((buffer.len() as f32 - expected).abs() < expected * 0.02);
}

#[test]
fn test_missing_file_is_not_found() {
    let err = load_samples(Path::new("/does/not/exist.ogg"), &DecodeOptions::default())
        .unwrap_err();
    assert!(matches!(err, MediaError::NotFound(_)));
}

#[test]
fn test_garbage_file_fails_to_probe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.bin");
    std::fs::write(&path, b"definitely not an audio container").unwrap();

    let err = load_samples(&path, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, MediaError::Probe(_)));
}
