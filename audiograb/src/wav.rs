//! Minimal RIFF/WAVE header inspection.
//!
//! ffmpeg writing WAV to a pipe cannot seek back to patch chunk sizes, so the
//! RIFF and `data` lengths may be placeholders. Only the `fmt ` chunk is read.

use crate::error::{Error, Result};

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Stream parameters from a WAV `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Integer PCM, either plain or via WAVE_FORMAT_EXTENSIBLE.
    pub fn is_pcm(&self) -> bool {
        matches!(self.audio_format, WAVE_FORMAT_PCM | WAVE_FORMAT_EXTENSIBLE)
    }
}

/// Parse the format of a WAV byte stream.
pub fn parse_header(bytes: &[u8]) -> Result<WavFormat> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(Error::InvalidAudio("missing RIFF/WAVE header".into()));
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let body = offset + 8;

        match id {
            b"fmt " => {
                if size < 16 || body + 16 > bytes.len() {
                    return Err(Error::InvalidAudio("truncated fmt chunk".into()));
                }
                let u16_at = |i: usize| u16::from_le_bytes([bytes[body + i], bytes[body + i + 1]]);
                let u32_at = |i: usize| {
                    u32::from_le_bytes([
                        bytes[body + i],
                        bytes[body + i + 1],
                        bytes[body + i + 2],
                        bytes[body + i + 3],
                    ])
                };
                return Ok(WavFormat {
                    audio_format: u16_at(0),
                    channels: u16_at(2),
                    sample_rate: u32_at(4),
                    bits_per_sample: u16_at(14),
                });
            }
            b"data" => break,
            _ => {
                // Chunks are word aligned.
                offset = body.saturating_add(size).saturating_add(size & 1);
            }
        }
    }

    Err(Error::InvalidAudio("no fmt chunk before audio data".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(extra_chunk: Option<(&[u8; 4], &[u8])>, channels: u16, rate: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        if let Some((id, body)) = extra_chunk {
            out.extend_from_slice(id);
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            out.extend_from_slice(body);
            if body.len() % 2 == 1 {
                out.push(0);
            }
        }
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * u32::from(channels) * 2).to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out
    }

    #[test]
    fn test_parse_streaming_header() {
        let fmt = parse_header(&header(None, 1, 16_000)).unwrap();
        assert_eq!(
            fmt,
            WavFormat {
                audio_format: 1,
                channels: 1,
                sample_rate: 16_000,
                bits_per_sample: 16,
            }
        );
        assert!(fmt.is_pcm());
    }

    #[test]
    fn test_parse_skips_unknown_odd_sized_chunk() {
        let fmt = parse_header(&header(Some((b"LIST", b"abc")), 2, 44_100)).unwrap();
        assert_eq!(fmt.channels, 2);
        assert_eq!(fmt.sample_rate, 44_100);
    }

    #[test]
    fn test_parse_rejects_non_wav() {
        assert!(parse_header(b"ID3\x04 not a wav file").is_err());
        assert!(parse_header(b"").is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_fmt() {
        let full = header(None, 1, 16_000);
        assert!(parse_header(&full[..24]).is_err());
    }

    #[test]
    fn test_parse_with_hound_written_file() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..160 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let fmt = parse_header(cursor.get_ref()).unwrap();
        assert_eq!(fmt.channels, 1);
        assert_eq!(fmt.sample_rate, 16_000);
        assert_eq!(fmt.bits_per_sample, 16);
    }
}
