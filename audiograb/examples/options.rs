//! Fetch with custom downloader settings and write the WAV to disk.
//!
//! Usage: cargo run --example options -- <media-url> out.wav

use std::time::Duration;

use audiograb::{DownloadOptions, EncodeOptions, FetchOptions};
use base64::Engine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args.next().expect("usage: options <media-url> <out.wav>");
    let out = args.next().expect("usage: options <media-url> <out.wav>");

    let opts = FetchOptions::new()
        .job_prefix("demo")?
        .download(
            DownloadOptions::new()
                .retries(5)
                .fragment_retries(5)
                .socket_timeout(Duration::from_secs(120))?
                .referer(None),
        )
        .encode(EncodeOptions::new().max_encoded_bytes(20 * 1024 * 1024)?);

    let audio = audiograb::fetch_with_options(&url, &opts).await?;
    let wav = base64::engine::general_purpose::STANDARD.decode(&audio.audio_base64)?;
    std::fs::write(&out, &wav)?;

    println!("[{}] {:.1}s of audio written to {out}", audio.job_id, audio.duration);

    Ok(())
}
