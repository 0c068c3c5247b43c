use std::path::Path;

use tracing::{debug, info};

use crate::config::DownloadOptions;
use crate::error::{Error, Result};
use crate::process::{CommandSpec, ProcessRunner};

/// Validate that a string looks like a URL.
/// Rejects anything that isn't http:// or https://.
pub fn validate_url(url: &str) -> Result<&str> {
    let trimmed = url.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(trimmed)
    } else {
        Err(Error::InvalidUrl(trimmed.to_string()))
    }
}

/// Build the yt-dlp command that writes `url` to `output`.
///
/// # Security
/// - Arguments are passed as a vector (no shell expansion)
/// - `--` separates options from the URL, so it can never be read as a flag
/// - `--no-exec` prevents yt-dlp from running post-processing commands
pub(crate) fn build_command(url: &str, output: &Path, options: &DownloadOptions) -> CommandSpec {
    let mut spec = CommandSpec::new(&options.program, options.timeout)
        .args(["-f", options.format.as_str()])
        .args([
            "--no-playlist",
            "--no-continue",
            "--no-cache-dir",
            "--no-exec",
            "--no-progress",
        ])
        .arg("--socket-timeout")
        .arg(options.socket_timeout.as_secs().max(1).to_string())
        .arg("--retries")
        .arg(options.retries.to_string())
        .arg("--fragment-retries")
        .arg(options.fragment_retries.to_string())
        .args(["--user-agent", options.user_agent.as_str()]);

    if let Some(referer) = &options.referer {
        spec = spec.arg("--add-header").arg(format!("Referer: {referer}"));
    }
    for header in &options.headers {
        spec = spec.args(["--add-header", header.as_str()]);
    }

    spec.arg("-o").arg(output).args(["--", url])
}

/// Download `url` to `output` with yt-dlp.
///
/// yt-dlp can exit 0 without writing anything (e.g. a page with no media),
/// so the file is checked afterwards and its absence is an error of its own.
pub async fn download_media(
    runner: &dyn ProcessRunner,
    url: &str,
    output: &Path,
    options: &DownloadOptions,
) -> Result<()> {
    let url = validate_url(url)?;

    info!(%url, "downloading media");

    let spec = build_command(url, output, options);
    runner.run(&spec).await?;

    if !tokio::fs::try_exists(output).await.unwrap_or(false) {
        return Err(Error::OutputMissing {
            path: output.to_path_buf(),
        });
    }

    debug!(path = %output.display(), "media downloaded");
    Ok(())
}
