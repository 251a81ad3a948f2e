use spectralight_core::{
    Band, BandPartitioner, FrameProcessor, SampleBuffer, SpectraConfig, SpectralAnalyzer,
    WindowFunction,
};

fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

fn max(values: &[f32]) -> f32 {
    values.iter().copied().fold(0.0, f32::max)
}

#[test]
fn test_bass_tone_dominates_bass_band() {
    let config = SpectraConfig::default();
    let mut analyzer = SpectralAnalyzer::new(config.analysis.clone());
    let partitioner = BandPartitioner::new(config.bands.clone());

    let spectrum = analyzer.analyze(&sine(100.0, 44100, 2048)).unwrap();
    let slices = partitioner.partition(&spectrum);

    assert_eq!(slices.bass.len() + slices.mid.len() + slices.treble.len(), 1025);

    let bass_peak = max(slices.bass);
    assert_eq!(bass_peak, spectrum.peak());
    assert!(bass_peak > 10.0 * max(slices.mid), "mid should be near zero");
    assert!(bass_peak > 10.0 * max(slices.treble), "treble should be near zero");
}

#[test]
fn test_bass_tone_lights_bass_group() {
    let config = SpectraConfig::default();
    let mut processor = FrameProcessor::new(&config);

    let processed = processor.process(&sine(100.0, 44100, 2048)).unwrap();
    let frame = &processed.actuation;

    let bass = frame.lit_count(Band::Bass);
    assert!(bass > 0);
    assert!(bass > frame.lit_count(Band::Mid));
    assert!(bass > frame.lit_count(Band::Treble));
    assert!(frame.values().iter().all(|v| *v <= 4095));

    assert!(processed.readings.get(Band::Bass) > processed.readings.get(Band::Mid));
}

#[test]
fn test_bass_tone_with_hann_window() {
    let mut config = SpectraConfig::default();
    config.analysis.window = WindowFunction::Hann;
    let mut processor = FrameProcessor::new(&config);

    let frame = processor
        .process(&sine(100.0, 44100, 2048))
        .unwrap()
        .actuation;
    assert!(frame.lit_count(Band::Bass) > frame.lit_count(Band::Mid));
    assert_eq!(frame.lit_count(Band::Treble), 0);
}

#[test]
fn test_treble_tone_lights_treble_group() {
    let mut config = SpectraConfig::default();
    config.mapping.policy = spectralight_core::MappingPolicy::Threshold;
    let mut processor = FrameProcessor::new(&config);

    // 8 kHz lands well inside the treble band
    let processed = processor.process(&sine(8000.0, 44100, 2048)).unwrap();
    let readings = processed.readings;
    assert!(readings.get(Band::Treble) > readings.get(Band::Bass));
    assert!(readings.get(Band::Treble) > readings.get(Band::Mid));
    assert!(processed.actuation.lit_count(Band::Treble) > 0);
}

#[test]
fn test_buffer_frames_feed_processor() {
    let config = SpectraConfig::default();
    let mut samples = sine(100.0, 44100, 2048 * 4);
    samples.extend(std::iter::repeat(0.1).take(300));
    let buffer = SampleBuffer::new(samples, 44100);

    let mut processor = FrameProcessor::new(&config);
    let mut frames = 0;
    for frame in buffer.frames(processor.window_size()) {
        let processed = processor.process(frame).unwrap();
        assert_eq!(processed.spectrum.len(), 1025);
        frames += 1;
    }
    assert_eq!(frames, 4);
    assert_eq!(processor.frames_processed(), 4);
}
