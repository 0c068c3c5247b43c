use std::path::PathBuf;
use std::time::Duration;

use audiograb::config::{DEFAULT_JOB_PREFIX, DEFAULT_REFERER, DEFAULT_USER_AGENT};
use audiograb::{DownloadOptions, EncodeOptions, FetchOptions, ProbeOptions};
use clap::Parser;

/// Every flag can also be set through the environment variable shown in `--help`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "audiograb-server",
    version,
    about = "HTTP service: media URL in, 16 kHz mono WAV (base64) out"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Shared secret required in the Authorization header. Unset disables auth.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Parent of the per-job scratch directories (default: system temp dir).
    #[arg(long, env = "SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Prefix of generated job ids.
    #[arg(long, env = "JOB_PREFIX", default_value = DEFAULT_JOB_PREFIX)]
    pub job_prefix: String,

    /// yt-dlp executable.
    #[arg(long, env = "YTDLP_BIN", default_value = "yt-dlp")]
    pub ytdlp_bin: String,

    /// ffprobe executable.
    #[arg(long, env = "FFPROBE_BIN", default_value = "ffprobe")]
    pub ffprobe_bin: String,

    /// ffmpeg executable.
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    pub ffmpeg_bin: String,

    /// yt-dlp format selector.
    #[arg(long, env = "YTDLP_FORMAT", default_value = "bestaudio/worst")]
    pub format: String,

    /// yt-dlp socket timeout, in seconds.
    #[arg(long, env = "YTDLP_SOCKET_TIMEOUT", default_value_t = 60)]
    pub socket_timeout: u64,

    /// yt-dlp connection retries.
    #[arg(long, env = "YTDLP_RETRIES", default_value_t = 3)]
    pub retries: u32,

    /// yt-dlp fragment retries.
    #[arg(long, env = "YTDLP_FRAGMENT_RETRIES", default_value_t = 3)]
    pub fragment_retries: u32,

    /// User agent sent by yt-dlp.
    #[arg(long, env = "YTDLP_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Referer sent by yt-dlp. Pass an empty string to omit it.
    #[arg(long, env = "YTDLP_REFERER", default_value = DEFAULT_REFERER)]
    pub referer: String,

    /// Extra "Name: value" header for yt-dlp (repeatable). In YTDLP_HEADERS,
    /// separate headers with newlines; values may contain commas and semicolons.
    #[arg(long = "add-header", env = "YTDLP_HEADERS", value_delimiter = '\n')]
    pub headers: Vec<String>,

    /// Download stage timeout, in seconds.
    #[arg(long, env = "DOWNLOAD_TIMEOUT", default_value_t = 300)]
    pub download_timeout: u64,

    /// Probe stage timeout, in seconds.
    #[arg(long, env = "PROBE_TIMEOUT", default_value_t = 15)]
    pub probe_timeout: u64,

    /// Encode stage timeout, in seconds.
    #[arg(long, env = "ENCODE_TIMEOUT", default_value_t = 180)]
    pub encode_timeout: u64,

    /// Ceiling on the base64 audio payload, in MiB.
    #[arg(long, env = "MAX_OUTPUT_MB", default_value_t = 100)]
    pub max_output_mb: usize,

    /// Emit logs as JSON.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The configured API key, treating an empty value as unset.
    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.is_empty())
    }

    /// Build pipeline options. Rejects zero timeouts and ceilings.
    pub fn fetch_options(&self) -> audiograb::Result<FetchOptions> {
        let mut download = DownloadOptions::new()
            .program(&self.ytdlp_bin)
            .format(&self.format)
            .socket_timeout(Duration::from_secs(self.socket_timeout))?
            .retries(self.retries)
            .fragment_retries(self.fragment_retries)
            .user_agent(&self.user_agent)
            .referer(Some(self.referer.clone()))
            .timeout(Duration::from_secs(self.download_timeout))?;
        for header in self.headers.iter().map(|h| h.trim()).filter(|h| !h.is_empty()) {
            download = download.header(header)?;
        }

        let probe = ProbeOptions::new()
            .program(&self.ffprobe_bin)
            .timeout(Duration::from_secs(self.probe_timeout))?;

        let encode = EncodeOptions::new()
            .program(&self.ffmpeg_bin)
            .timeout(Duration::from_secs(self.encode_timeout))?
            .max_encoded_bytes(self.max_output_mb.saturating_mul(1024 * 1024))?;

        let mut options = FetchOptions::new()
            .job_prefix(&self.job_prefix)?
            .download(download)
            .probe(probe)
            .encode(encode);
        if let Some(dir) = &self.scratch_dir {
            options = options.scratch_dir(dir.clone());
        }
        Ok(options)
    }
}
