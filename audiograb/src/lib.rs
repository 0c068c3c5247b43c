//! Media URL in, normalized audio out.
//!
//! **audiograb** runs a strictly sequential pipeline per job: download the media
//! with yt-dlp into a per-job scratch directory, read its duration with ffprobe, then
//! transcode it with ffmpeg to 16 kHz mono 16-bit PCM WAV and return the bytes
//! base64-encoded. The scratch directory is removed on every exit path.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), audiograb::JobError> {
//! let audio = audiograb::fetch("https://www.xiaohongshu.com/explore/abc123").await?;
//! println!("{} seconds, {} base64 bytes", audio.duration, audio.audio_base64.len());
//! # Ok(())
//! # }
//! ```
//!
//! External commands run through a [`ProcessRunner`]. The default
//! [`TokioProcessRunner`] spawns them without a shell, enforces each stage's
//! timeout by killing the child, and caps captured output.

pub mod config;
pub mod download;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod process;
pub mod scratch;
pub mod types;
pub mod wav;

pub use config::{DownloadOptions, EncodeOptions, FetchOptions, ProbeOptions};
pub use error::{Error, Result};
pub use pipeline::{Job, JobError, Pipeline, ToolStatus};
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use scratch::{JobId, ScratchDir};
pub use types::{ExtractedAudio, JobState, Stage};

/// Fetch and transcode `url` with default options.
pub async fn fetch(url: &str) -> std::result::Result<ExtractedAudio, JobError> {
    fetch_with_options(url, &FetchOptions::default()).await
}

/// Fetch and transcode `url` with custom options.
pub async fn fetch_with_options(
    url: &str,
    options: &FetchOptions,
) -> std::result::Result<ExtractedAudio, JobError> {
    Pipeline::with_options(options.clone()).process(url).await
}
