//! Sample conversion for the speech service: mono, 16 kHz, int16 LE.

use crate::wav::Wav;

pub const ASR_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved channels into one.
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resample.
///
/// The output length is `floor(len / from * to)`; output sample `i` reads
/// the input at an evenly spaced position between the first and last input
/// sample.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() {
        return samples.to_vec();
    }
    let out_len = (samples.len() as f64 / f64::from(from) * f64::from(to)) as usize;
    if out_len == 0 {
        return Vec::new();
    }

    let last = (samples.len() - 1) as f64;
    let step = if out_len > 1 {
        last / (out_len - 1) as f64
    } else {
        0.0
    };

    (0..out_len)
        .map(|i| {
            let x = i as f64 * step;
            let left = (x.floor() as usize).min(samples.len() - 1);
            let right = (left + 1).min(samples.len() - 1);
            let frac = (x - left as f64) as f32;
            samples[left] + (samples[right] - samples[left]) * frac
        })
        .collect()
}

/// Clip to `[-1, 1]`, scale by 32767 (truncating) and pack little-endian.
pub fn to_i16_le(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| ((s.clamp(-1.0, 1.0) * 32_767.0) as i16).to_le_bytes())
        .collect()
}

/// Convert a decoded file into the byte stream the speech service expects.
pub fn prepare_for_asr(wav: &Wav) -> Vec<u8> {
    let mono = downmix(&wav.samples, wav.channels);
    let resampled = resample(&mono, wav.sample_rate, ASR_SAMPLE_RATE);
    to_i16_le(&resampled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_each_frame() {
        assert_eq!(downmix(&[1.0, 0.0, -0.5, -0.5], 2), vec![0.5, -0.5]);
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn resample_halves_length_and_keeps_endpoints() {
        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let out = resample(&input, 32_000, 16_000);
        assert_eq!(out.len(), 4);
        assert_eq!(out.first(), Some(&0.0));
        assert_eq!(out.last(), Some(&7.0));
        // Positions 0, 7/3, 14/3, 7.
        assert!((out[1] - 7.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn resample_upsamples_by_interpolation() {
        let out = resample(&[0.0, 1.0], 8_000, 16_000);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 1.0 / 3.0).abs() < 1e-6);
        assert!((out[2] - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn same_rate_is_identity() {
        assert_eq!(resample(&[0.3, 0.4], 16_000, 16_000), vec![0.3, 0.4]);
    }

    #[test]
    fn i16_conversion_clips_and_truncates() {
        let bytes = to_i16_le(&[1.5, -2.0, 0.5, 0.0]);
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(values, vec![32_767, -32_767, 16_383, 0]);
    }

    #[test]
    fn prepare_produces_mono_16k_stream() {
        let wav = Wav {
            sample_rate: 32_000,
            channels: 2,
            samples: vec![0.5; 64],
        };
        let bytes = prepare_for_asr(&wav);
        // 32 frames at 32 kHz -> 16 samples at 16 kHz -> 32 bytes.
        assert_eq!(bytes.len(), 32);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 16_383);
    }
}
