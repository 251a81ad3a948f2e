//! Decode an audio file into a mono sample buffer
//!
//! Any container/codec symphonia knows is accepted. Channels are averaged to
//! mono, the result is resampled to the analysis rate when the source rate
//! differs, and finally peak-normalized into [-1, 1].

use crate::error::{MediaError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use spectralight_core::SampleBuffer;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, info, warn};

/// Decode settings
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Sample rate of the produced buffer
    pub target_rate: u32,
    /// Scale so the loudest sample has magnitude 1.0
    pub normalize: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            target_rate: 44100,
            normalize: true,
        }
    }
}

impl DecodeOptions {
    /// Options targeting `target_rate`
    pub fn with_rate(target_rate: u32) -> Self {
        Self {
            target_rate,
            ..Default::default()
        }
    }
}

/// Decoded mono audio at the file's native rate
#[derive(Debug, Clone)]
pub struct MonoAudio {
    /// Samples, channel-averaged
    pub samples: Vec<f32>,
    /// Native sample rate
    pub sample_rate: u32,
}

/// Decode, resample and normalize a file into a `SampleBuffer`
pub fn load_samples(path: &Path, options: &DecodeOptions) -> Result<SampleBuffer> {
    let MonoAudio {
        samples,
        sample_rate,
    } = decode_to_mono(path)?;

    let mut samples = if sample_rate != options.target_rate {
        debug!(
            "Resampling {} samples from {} Hz to {} Hz",
            samples.len(),
            sample_rate,
            options.target_rate
        );
        resample(samples, sample_rate, options.target_rate)?
    } else {
        samples
    };

    if samples.is_empty() {
        return Err(MediaError::Empty);
    }

    if options.normalize {
        peak_normalize(&mut samples);
    }

    let buffer = SampleBuffer::new(samples, options.target_rate);
    info!(
        "Loaded {}: {:.1}s at {} Hz",
        path.display(),
        buffer.duration_secs(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

/// Decode every packet of the first audio track, averaged to mono
pub fn decode_to_mono(path: &Path) -> Result<MonoAudio> {
    if !path.exists() {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|source| MediaError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MediaError::Probe(e.to_string()))?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(MediaError::NoAudioTrack)?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| MediaError::Decode(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(MediaError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => mix_to_mono(&decoded, &mut samples),
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupt packet; the rest of the stream is usually fine
                skipped += 1;
                warn!("Skipping corrupted packet: {}", msg);
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(MediaError::Decode(e.to_string())),
        }
    }

    let sample_rate = decoder
        .codec_params()
        .sample_rate
        .or(codec_params.sample_rate)
        .ok_or_else(|| MediaError::Decode("sample rate unknown".to_string()))?;

    if samples.is_empty() {
        return Err(MediaError::Empty);
    }

    debug!(
        "Decoded {} mono samples at {} Hz ({} packets skipped)",
        samples.len(),
        sample_rate,
        skipped
    );

    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => mix_buffer(buf, out),
        AudioBufferRef::U8(buf) => mix_buffer(buf, out),
        AudioBufferRef::U16(buf) => mix_buffer(buf, out),
        AudioBufferRef::U24(buf) => mix_buffer(buf, out),
        AudioBufferRef::U32(buf) => mix_buffer(buf, out),
        AudioBufferRef::S8(buf) => mix_buffer(buf, out),
        AudioBufferRef::S16(buf) => mix_buffer(buf, out),
        AudioBufferRef::S24(buf) => mix_buffer(buf, out),
        AudioBufferRef::S32(buf) => mix_buffer(buf, out),
        AudioBufferRef::F64(buf) => mix_buffer(buf, out),
    }
}

/// Average all channels of one decoded buffer onto `out`
fn mix_buffer<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    if channels == 0 || frames == 0 {
        return;
    }

    let start = out.len();
    out.resize(start + frames, 0.0);
    let mixed = &mut out[start..];
    let scale = 1.0 / channels as f32;
    for ch in 0..channels {
        for (slot, &sample) in mixed.iter_mut().zip(buf.chan(ch)) {
            *slot += f32::from_sample(sample) * scale;
        }
    }
}

/// Convert a mono signal between sample rates
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(MediaError::Resample(format!(
            "invalid rates {} -> {}",
            from_rate, to_rate
        )));
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| MediaError::Resample(e.to_string()))?;

    let input = vec![samples];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| MediaError::Resample(e.to_string()))?;

    Ok(output.pop().unwrap_or_default())
}

/// Scale so the largest magnitude is 1.0; silence is left untouched
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        let gain = 1.0 / peak;
        for s in samples.iter_mut() {
            *s = if s.is_finite() { *s * gain } else { 0.0 };
        }
    }
}
