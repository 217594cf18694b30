//! G.711 μ-law codec and telephony resampling
//!
//! Pure Rust implementation of ITU-T G.711 μ-law (PCMU) companding plus the
//! naive rate conversion used on the bridge: the phone side speaks μ-law at
//! 8kHz, the agent side linear PCM at 16kHz. Upsampling doubles the rate by
//! linear interpolation; downsampling decimates without filtering. These
//! transforms are bit-exact by contract — peers on both sides expect the
//! same bytes the reference pipeline emits.

use once_cell::sync::Lazy;

// μ-law encoding constants
const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: i32 = 32635;

/// Decode table for all 256 μ-law bytes, built on first use.
static ULAW_DECODE_TABLE: Lazy<[i16; 256]> = Lazy::new(|| {
    let mut table = [0i16; 256];
    for (byte, slot) in table.iter_mut().enumerate() {
        *slot = decode_ulaw(byte as u8);
    }
    table
});

/// Convert 16-bit linear PCM to μ-law
pub fn linear_to_ulaw(sample: i16) -> u8 {
    // Get the sign
    let sign = if sample < 0 { 0x80 } else { 0x00 };

    // Get absolute value and apply bias
    let mut sample = if sample < 0 {
        (-(sample as i32)).min(ULAW_CLIP)
    } else {
        (sample as i32).min(ULAW_CLIP)
    };

    sample += ULAW_BIAS;

    // Find the segment
    let exponent = match sample {
        s if s >= 0x4000 => 7,
        s if s >= 0x2000 => 6,
        s if s >= 0x1000 => 5,
        s if s >= 0x0800 => 4,
        s if s >= 0x0400 => 3,
        s if s >= 0x0200 => 2,
        s if s >= 0x0100 => 1,
        _ => 0,
    };

    let mantissa = (sample >> (exponent + 3)) & 0x0F;

    // Combine sign, exponent, and mantissa, then complement
    !(sign | (exponent << 4) | mantissa as u8)
}

/// Convert μ-law to 16-bit linear PCM
pub fn ulaw_to_linear(ulaw: u8) -> i16 {
    ULAW_DECODE_TABLE[ulaw as usize]
}

fn decode_ulaw(ulaw: u8) -> i16 {
    // Complement the byte
    let ulaw = !ulaw;

    let sign = ulaw & 0x80;
    let exponent = ((ulaw >> 4) & 0x07) as i32;
    let mantissa = (ulaw & 0x0F) as i32;

    // Reconstruct the linear value
    let mut sample = ((mantissa << 3) + ULAW_BIAS) << exponent;
    sample -= ULAW_BIAS;

    if sign != 0 {
        -sample as i16
    } else {
        sample as i16
    }
}

/// μ-law 8kHz → linear PCM 16kHz.
///
/// Each input byte yields two output samples: the decoded value, then the
/// average of the decoded value and the next one (the last byte averages
/// with itself). N bytes always yield exactly 2N samples.
pub fn upsample_ulaw_to_pcm16(ulaw: &[u8]) -> Vec<i16> {
    let mut pcm = Vec::with_capacity(ulaw.len() * 2);
    for (i, &byte) in ulaw.iter().enumerate() {
        let current = ulaw_to_linear(byte);
        let next = match ulaw.get(i + 1) {
            Some(&b) => ulaw_to_linear(b),
            None => current,
        };
        pcm.push(current);
        pcm.push(((current as i32 + next as i32) / 2) as i16);
    }
    pcm
}

/// Linear PCM 16kHz → μ-law 8kHz.
///
/// Keeps every second sample (plain decimation, no anti-alias filtering)
/// and companded-encodes it. M samples always yield floor(M/2) bytes.
pub fn downsample_pcm16_to_ulaw(pcm: &[i16]) -> Vec<u8> {
    pcm.chunks_exact(2)
        .map(|pair| linear_to_ulaw(pair[0]))
        .collect()
}

/// Interpret little-endian PCM-16 bytes as samples.
pub fn pcm16_bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Serialize samples as little-endian PCM-16 bytes.
pub fn samples_to_pcm16_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
