//! Minimal RIFF/WAVE decoder.
//!
//! Supports integer PCM at 8, 16, 24 and 32 bits and 32-bit IEEE float,
//! including the `WAVE_FORMAT_EXTENSIBLE` wrapper. Samples are normalized to
//! `[-1.0, 1.0]` and kept interleaved.

use crate::error::MediaError;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

#[derive(Debug, Clone, PartialEq)]
pub struct Wav {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved, normalized samples.
    pub samples: Vec<f32>,
}

impl Wav {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

#[derive(Debug, Clone, Copy)]
struct Format {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

pub fn decode(bytes: &[u8]) -> Result<Wav, MediaError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(unsupported("not a RIFF/WAVE file"));
    }

    let mut format = None;
    let mut data = None;
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32_le(&bytes[pos + 4..pos + 8]) as usize;
        let body_start = pos + 8;
        let body_end = body_start.saturating_add(size).min(bytes.len());
        let body = &bytes[body_start..body_end];

        match id {
            b"fmt " => format = Some(parse_format(body)?),
            b"data" => data = Some(body),
            _ => {}
        }
        // Chunks are word aligned.
        pos = body_start.saturating_add(size).saturating_add(size & 1);
    }

    let format = format.ok_or_else(|| unsupported("missing fmt chunk"))?;
    let data = data.ok_or_else(|| unsupported("missing data chunk"))?;
    if format.channels == 0 {
        return Err(unsupported("zero channels"));
    }
    if format.sample_rate == 0 {
        return Err(unsupported("zero sample rate"));
    }

    let samples = match (format.tag, format.bits_per_sample) {
        (FORMAT_PCM, 8) => data.iter().map(|&b| (f32::from(b) - 128.0) / 128.0).collect(),
        (FORMAT_PCM, 16) => data
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / 32_768.0)
            .collect(),
        (FORMAT_PCM, 24) => data
            .chunks_exact(3)
            .map(|c| {
                let v = i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8;
                v as f32 / 8_388_608.0
            })
            .collect(),
        (FORMAT_PCM, 32) => data
            .chunks_exact(4)
            .map(|c| (f64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])) / 2_147_483_648.0) as f32)
            .collect(),
        (FORMAT_IEEE_FLOAT, 32) => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        (tag, bits) => {
            return Err(unsupported(&format!(
                "format tag {tag:#06x} with {bits} bits per sample"
            )))
        }
    };

    Ok(Wav {
        sample_rate: format.sample_rate,
        channels: format.channels,
        samples,
    })
}

fn parse_format(body: &[u8]) -> Result<Format, MediaError> {
    if body.len() < 16 {
        return Err(unsupported("truncated fmt chunk"));
    }
    let mut tag = u16_le(&body[0..2]);
    if tag == FORMAT_EXTENSIBLE {
        // The real format is the first two bytes of the sub-format GUID.
        if body.len() < 26 {
            return Err(unsupported("truncated extensible fmt chunk"));
        }
        tag = u16_le(&body[24..26]);
    }
    Ok(Format {
        tag,
        channels: u16_le(&body[2..4]),
        sample_rate: u32_le(&body[4..8]),
        bits_per_sample: u16_le(&body[14..16]),
    })
}

fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn unsupported(reason: &str) -> MediaError {
    MediaError::UnsupportedAudio(reason.to_string())
}

/// Build a WAV file in memory. Used by tests across the crate.
#[cfg(test)]
pub(crate) fn encode_for_test(tag: u16, channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
