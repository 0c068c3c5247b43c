use std::path::Path;

use base64::Engine;
use tracing::{debug, info};

use crate::config::EncodeOptions;
use crate::error::{Error, Result};
use crate::process::{CommandSpec, ProcessRunner};
use crate::wav;

/// Output sample rate.
pub const SAMPLE_RATE: u32 = 16_000;

/// Output channel count.
pub const CHANNELS: u16 = 1;

const BITS_PER_SAMPLE: u16 = 16;

/// ffmpeg command that streams `input` as 16kHz mono s16le WAV to stdout.
///
/// The raw-output ceiling is derived from the encoded ceiling so that an
/// oversized stream is cut off before it is ever base64-encoded.
pub(crate) fn build_command(input: &Path, options: &EncodeOptions) -> CommandSpec {
    CommandSpec::new(&options.program, options.timeout)
        .args(["-nostdin", "-v", "error", "-i"])
        .arg(input)
        .args([
            "-vn",
            "-ac",
            &CHANNELS.to_string(),
            "-ar",
            &SAMPLE_RATE.to_string(),
            "-acodec",
            "pcm_s16le",
            "-f",
            "wav",
            "-",
        ])
        .max_output_bytes(options.max_raw_bytes())
}

/// Base64-encode a byte stream as a single unbroken token.
pub fn encode_base64(bytes: &[u8]) -> String {
    let mut encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    encoded.retain(|c| !matches!(c, '\n' | '\r' | ' '));
    encoded
}

/// Check that ffmpeg produced the WAV layout we asked for.
fn verify_wav(bytes: &[u8]) -> Result<()> {
    let format = wav::parse_header(bytes)?;
    if !format.is_pcm()
        || format.channels != CHANNELS
        || format.sample_rate != SAMPLE_RATE
        || format.bits_per_sample != BITS_PER_SAMPLE
    {
        return Err(Error::InvalidAudio(format!(
            "expected {CHANNELS}ch {SAMPLE_RATE}Hz {BITS_PER_SAMPLE}-bit PCM, got {}ch {}Hz {}-bit (format tag {})",
            format.channels, format.sample_rate, format.bits_per_sample, format.audio_format
        )));
    }
    Ok(())
}

/// Transcode `input` to normalized WAV and return it base64-encoded.
pub async fn encode_audio(
    runner: &dyn ProcessRunner,
    input: &Path,
    options: &EncodeOptions,
) -> Result<String> {
    info!(path = %input.display(), "transcoding audio");

    // The runner enforces the raw cap; report the configured ceiling instead.
    let output = runner
        .run(&build_command(input, options))
        .await
        .map_err(|e| match e {
            Error::OutputTooLarge { program, .. } => Error::OutputTooLarge {
                program,
                limit: options.max_encoded_bytes,
            },
            other => other,
        })?;

    if output.stdout.is_empty() {
        return Err(Error::EmptyOutput {
            program: options.program.clone(),
        });
    }

    // Custom runners may ignore the capture cap.
    if output.stdout.len() > options.max_raw_bytes() {
        return Err(Error::OutputTooLarge {
            program: options.program.clone(),
            limit: options.max_encoded_bytes,
        });
    }

    verify_wav(&output.stdout)?;

    let encoded = encode_base64(&output.stdout);
    if encoded.len() > options.max_encoded_bytes {
        return Err(Error::OutputTooLarge {
            program: options.program.clone(),
            limit: options.max_encoded_bytes,
        });
    }

    debug!(
        wav_bytes = output.stdout.len(),
        base64_bytes = encoded.len(),
        "audio encoded"
    );

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::process::ProcessOutput;

    fn wav_bytes(channels: u16, sample_rate: u32, seconds: f64) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (f64::from(sample_rate) * seconds) as usize;
        for _ in 0..frames * usize::from(channels) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    struct Emit(Vec<u8>);

    #[async_trait]
    impl ProcessRunner for Emit {
        async fn run(&self, _spec: &CommandSpec) -> Result<ProcessOutput> {
            Ok(ProcessOutput {
                stdout: self.0.clone(),
                ..ProcessOutput::default()
            })
        }
    }

    /// Fails the way the process runner does when stdout passes its cap.
    struct Overflow;

    #[async_trait]
    impl ProcessRunner for Overflow {
        async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
            Err(Error::OutputTooLarge {
                program: spec.program.clone(),
                limit: spec.max_output_bytes.unwrap_or_default(),
            })
        }
    }

    #[test]
    fn test_build_command() {
        let opts = EncodeOptions::new().max_encoded_bytes(4000).unwrap();
        let spec = build_command(Path::new("/tmp/job.mp4"), &opts);
        assert_eq!(spec.program, "ffmpeg");
        assert_eq!(spec.timeout, Duration::from_secs(180));
        assert_eq!(spec.arg_after("-i").unwrap(), "/tmp/job.mp4");
        assert_eq!(spec.arg_after("-ac").unwrap(), "1");
        assert_eq!(spec.arg_after("-ar").unwrap(), "16000");
        assert_eq!(spec.arg_after("-acodec").unwrap(), "pcm_s16le");
        assert_eq!(spec.arg_after("-f").unwrap(), "wav");
        assert!(spec.has_arg("-vn"));
        assert_eq!(spec.args.last().unwrap(), "-");
        assert_eq!(spec.max_output_bytes, Some(3000));
    }

    #[test]
    fn test_encode_base64_is_single_token() {
        let encoded = encode_base64(&[0u8; 1000]);
        assert!(!encoded.contains(['\n', '\r', ' ']));
        assert_eq!(encoded.len(), 1336);
    }

    #[tokio::test]
    async fn test_encode_audio_roundtrips_wav() {
        let wav = wav_bytes(1, SAMPLE_RATE, 0.5);
        let encoded = encode_audio(&Emit(wav.clone()), Path::new("x"), &EncodeOptions::default())
            .await
            .unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(decoded, wav);
    }

    #[tokio::test]
    async fn test_encode_audio_rejects_wrong_layout() {
        let wav = wav_bytes(2, 44_100, 0.1);
        let err = encode_audio(&Emit(wav), Path::new("x"), &EncodeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAudio(_)));
    }

    #[tokio::test]
    async fn test_encode_audio_empty_output() {
        let err = encode_audio(&Emit(Vec::new()), Path::new("x"), &EncodeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn test_encode_audio_over_ceiling() {
        let wav = wav_bytes(1, SAMPLE_RATE, 1.0);
        let opts = EncodeOptions::new().max_encoded_bytes(1024).unwrap();
        let err = encode_audio(&Emit(wav), Path::new("x"), &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OutputTooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_runner_cap_reports_configured_ceiling() {
        let opts = EncodeOptions::new().max_encoded_bytes(4000).unwrap();
        let err = encode_audio(&Overflow, Path::new("x"), &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OutputTooLarge { limit: 4000, .. }));
        assert_eq!(err.to_string(), "ffmpeg output exceeded the 4000 byte limit");
    }
}
