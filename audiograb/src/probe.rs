use std::path::Path;

use tracing::debug;

use crate::config::ProbeOptions;
use crate::error::Result;
use crate::process::{CommandSpec, ProcessRunner};

pub(crate) fn build_command(input: &Path, options: &ProbeOptions) -> CommandSpec {
    CommandSpec::new(&options.program, options.timeout)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
}

/// Parse ffprobe's duration output. Anything unusable becomes `0.0`.
pub fn parse_duration(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0)
}

/// Read the container duration of `input` in seconds.
///
/// Duration is advisory: an unparseable value (e.g. `N/A` for some live
/// streams) yields `0.0` instead of an error. Process failures still propagate.
pub async fn probe_duration(
    runner: &dyn ProcessRunner,
    input: &Path,
    options: &ProbeOptions,
) -> Result<f64> {
    let output = runner.run(&build_command(input, options)).await?;
    let raw = output.stdout_text();
    let duration = parse_duration(&raw);

    if duration == 0.0 && !raw.trim().is_empty() {
        debug!(raw = raw.trim(), "unparseable duration, defaulting to 0");
    }

    Ok(duration)
}
