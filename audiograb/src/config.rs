use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// User agent sent by yt-dlp unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Xiaohongshu/8.99.1 (iPhone; iOS 16.0; Scale/3.00)";

/// Referer sent by yt-dlp unless overridden.
pub const DEFAULT_REFERER: &str = "https://www.xiaohongshu.com/";

/// Default ceiling on the base64 audio payload (100 MiB).
pub const DEFAULT_MAX_ENCODED_BYTES: usize = 100 * 1024 * 1024;

/// Prefix of generated job ids unless overridden.
pub const DEFAULT_JOB_PREFIX: &str = "xhs";

/// yt-dlp invocation settings.
///
/// Retry counts, timeouts and headers are tuning knobs for the source site,
/// so everything here is configurable.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub program: String,
    /// yt-dlp format selector.
    pub format: String,
    /// Per-connection socket timeout handed to yt-dlp.
    pub socket_timeout: Duration,
    pub retries: u32,
    pub fragment_retries: u32,
    pub user_agent: String,
    pub referer: Option<String>,
    /// Extra `Name: value` headers.
    pub headers: Vec<String>,
    /// Wall-clock limit for the whole stage.
    pub timeout: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            program: "yt-dlp".into(),
            format: "bestaudio/worst".into(),
            socket_timeout: Duration::from_secs(60),
            retries: 3,
            fragment_retries: 3,
            user_agent: DEFAULT_USER_AGENT.into(),
            referer: Some(DEFAULT_REFERER.into()),
            headers: Vec::new(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn socket_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.socket_timeout = non_zero("socket timeout", timeout)?;
        Ok(self)
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn fragment_retries(mut self, retries: u32) -> Self {
        self.fragment_retries = retries;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set or clear the `Referer` header.
    pub fn referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer.filter(|r| !r.trim().is_empty());
        self
    }

    /// Add a `Name: value` header. Rejects values without a colon.
    pub fn header(mut self, header: impl Into<String>) -> Result<Self> {
        let header = header.into();
        match header.split_once(':') {
            Some((name, _)) if !name.trim().is_empty() => {
                self.headers.push(header);
                Ok(self)
            }
            _ => Err(Error::InvalidOption(format!(
                "header must look like \"Name: value\", got \"{header}\""
            ))),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = non_zero("download timeout", timeout)?;
        Ok(self)
    }
}

/// ffprobe invocation settings.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub program: String,
    pub timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            program: "ffprobe".into(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl ProbeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = non_zero("probe timeout", timeout)?;
        Ok(self)
    }
}

/// ffmpeg invocation settings.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub program: String,
    pub timeout: Duration,
    /// Ceiling on the base64 text returned to callers.
    pub max_encoded_bytes: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            timeout: Duration::from_secs(180),
            max_encoded_bytes: DEFAULT_MAX_ENCODED_BYTES,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = non_zero("encode timeout", timeout)?;
        Ok(self)
    }

    pub fn max_encoded_bytes(mut self, limit: usize) -> Result<Self> {
        if limit < 4 {
            return Err(Error::InvalidOption(format!(
                "max encoded bytes must be at least 4, got {limit}"
            )));
        }
        self.max_encoded_bytes = limit;
        Ok(self)
    }

    /// Largest raw WAV stream whose base64 form fits in `max_encoded_bytes`.
    pub fn max_raw_bytes(&self) -> usize {
        self.max_encoded_bytes / 4 * 3
    }
}

/// Builder for pipeline options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Parent of the per-job scratch directories.
    pub scratch_dir: PathBuf,
    /// Prefix of generated job ids.
    pub job_prefix: String,
    pub download: DownloadOptions,
    pub probe: ProbeOptions,
    pub encode: EncodeOptions,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            job_prefix: DEFAULT_JOB_PREFIX.into(),
            download: DownloadOptions::default(),
            probe: ProbeOptions::default(),
            encode: EncodeOptions::default(),
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Set the job id prefix. Must be non-empty and filename-safe.
    pub fn job_prefix(mut self, prefix: &str) -> Result<Self> {
        let valid = !prefix.is_empty()
            && prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidOption(format!(
                "job prefix must be non-empty and contain only [A-Za-z0-9_-], got \"{prefix}\""
            )));
        }
        self.job_prefix = prefix.to_string();
        Ok(self)
    }

    pub fn download(mut self, download: DownloadOptions) -> Self {
        self.download = download;
        self
    }

    pub fn probe(mut self, probe: ProbeOptions) -> Self {
        self.probe = probe;
        self
    }

    pub fn encode(mut self, encode: EncodeOptions) -> Self {
        self.encode = encode;
        self
    }
}

fn non_zero(what: &str, timeout: Duration) -> Result<Duration> {
    if timeout.is_zero() {
        Err(Error::InvalidOption(format!("{what} must be greater than zero")))
    } else {
        Ok(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = FetchOptions::default();
        assert_eq!(opts.job_prefix, "xhs");
        assert_eq!(opts.download.program, "yt-dlp");
        assert_eq!(opts.download.format, "bestaudio/worst");
        assert_eq!(opts.download.timeout, Duration::from_secs(300));
        assert_eq!(opts.download.referer.as_deref(), Some(DEFAULT_REFERER));
        assert_eq!(opts.probe.timeout, Duration::from_secs(15));
        assert_eq!(opts.encode.timeout, Duration::from_secs(180));
        assert_eq!(opts.encode.max_encoded_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        assert!(DownloadOptions::new().timeout(Duration::ZERO).is_err());
        assert!(DownloadOptions::new().socket_timeout(Duration::ZERO).is_err());
        assert!(ProbeOptions::new().timeout(Duration::ZERO).is_err());
        assert!(EncodeOptions::new().timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn test_max_raw_bytes_fits_encoded_ceiling() {
        let opts = EncodeOptions::new().max_encoded_bytes(1000).unwrap();
        assert_eq!(opts.max_raw_bytes(), 750);
        // 750 raw bytes encode to exactly 1000 base64 characters.
        assert_eq!(opts.max_raw_bytes().div_ceil(3) * 4, 1000);
        assert!(EncodeOptions::new().max_encoded_bytes(3).is_err());
    }

    #[test]
    fn test_header_validation() {
        let opts = DownloadOptions::new().header("Cookie: a=b").unwrap();
        assert_eq!(opts.headers, vec!["Cookie: a=b".to_string()]);
        assert!(DownloadOptions::new().header("no colon").is_err());
        assert!(DownloadOptions::new().header(": value").is_err());
    }

    #[test]
    fn test_referer_blank_clears() {
        let opts = DownloadOptions::new().referer(Some("  ".into()));
        assert!(opts.referer.is_none());
    }

    #[test]
    fn test_job_prefix_validation() {
        assert_eq!(FetchOptions::new().job_prefix("xhs").unwrap().job_prefix, "xhs");
        assert!(FetchOptions::new().job_prefix("").is_err());
        assert!(FetchOptions::new().job_prefix("../evil").is_err());
    }
}
