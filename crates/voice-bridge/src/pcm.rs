//! Sample format conversion between browser float audio and 16-bit
//! little-endian PCM, plus the base64 framing used on the wire.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::error::VoiceError;

/// Microphone stream format expected by the Live API.
pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";
/// Default rate of synthesized speech coming back.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Float to i16: scale by 32768 and truncate. Out-of-range values saturate.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| (s * 32768.0) as i16).collect()
}

pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Result<Vec<i16>, VoiceError> {
    if bytes.len() % 2 != 0 {
        return Err(VoiceError::Codec(format!(
            "PCM16 payload has odd length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Raw f32 LE bytes, the format of capture frames sent by the browser.
pub fn f32_from_le_bytes(bytes: &[u8]) -> Result<Vec<f32>, VoiceError> {
    if bytes.len() % 4 != 0 {
        return Err(VoiceError::Codec(format!(
            "f32 frame length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

pub fn f32_to_le_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Capture frame -> base64 PCM16 payload.
pub fn encode_frame(samples: &[f32]) -> String {
    BASE64_STANDARD.encode(pcm16_to_le_bytes(&float_to_pcm16(samples)))
}

/// Base64 PCM16 payload -> float samples.
pub fn decode_chunk(data: &str) -> Result<Vec<f32>, VoiceError> {
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .map_err(|e| VoiceError::Codec(format!("invalid base64 audio: {e}")))?;
    Ok(pcm16_to_float(&pcm16_from_le_bytes(&bytes)?))
}

/// Sample rate named in a MIME descriptor such as `audio/pcm;rate=24000`.
pub fn sample_rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}
