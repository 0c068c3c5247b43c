//! Download → probe → encode, with the scratch directory released on every path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span, Instrument};

use crate::config::FetchOptions;
use crate::error::{Error, Result};
use crate::process::{CommandSpec, ProcessRunner, TokioProcessRunner};
use crate::scratch::{JobId, ScratchDir};
use crate::types::{ExtractedAudio, JobState, Stage};
use crate::{download, encode, probe};

const TOOL_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// A failed job: which stage broke and why.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct JobError {
    pub job_id: JobId,
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl JobError {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_timeout(&self) -> bool {
        self.source.is_timeout()
    }
}

/// Availability of one external tool, as reported by its version flag.
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub program: String,
    /// First line of the version output.
    pub version: Option<String>,
    pub error: Option<String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-request job context. Owns the scratch directory exclusively.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    scratch: ScratchDir,
    state: JobState,
}

impl Job {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Where the media file is downloaded.
    pub fn scratch_path(&self) -> &std::path::Path {
        self.scratch.media_path()
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        self.scratch.dir()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn fail(&self, stage: Stage, source: Error) -> JobError {
        JobError {
            job_id: self.id.clone(),
            stage,
            source,
        }
    }
}

/// The three-stage extraction pipeline.
///
/// Holds only immutable configuration, so one instance serves any number of
/// concurrent jobs.
#[derive(Clone)]
pub struct Pipeline {
    runner: Arc<dyn ProcessRunner>,
    options: FetchOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(runner: Arc<dyn ProcessRunner>, options: FetchOptions) -> Self {
        Self { runner, options }
    }

    /// Pipeline running real processes via tokio.
    pub fn with_options(options: FetchOptions) -> Self {
        Self::new(Arc::new(TokioProcessRunner), options)
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Validate a media URL before any job is started.
    pub fn validate_url<'a>(&self, url: &'a str) -> Result<&'a str> {
        download::validate_url(url)
    }

    /// Allocate a job id and an empty scratch directory.
    pub fn start_job(&self) -> Result<Job> {
        let id = JobId::generate(&self.options.job_prefix);
        let scratch = ScratchDir::allocate(&self.options.scratch_dir, &id)?;
        Ok(Job {
            id,
            scratch,
            state: JobState::Idle,
        })
    }

    /// Run every stage for `job`. The scratch directory is gone when this returns,
    /// whatever the outcome.
    pub async fn run(
        &self,
        job: &mut Job,
        url: &str,
    ) -> std::result::Result<ExtractedAudio, JobError> {
        let start = Instant::now();
        let span = info_span!("job", job_id = %job.id);

        let result = self.run_stages(job, url).instrument(span.clone()).await;

        job.scratch.release();
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        span.in_scope(|| match &result {
            Ok(audio) => {
                job.state = JobState::Cleaned;
                info!(elapsed_ms, duration = audio.duration, "job completed");
            }
            Err(e) => {
                job.state = JobState::Failed;
                error!(elapsed_ms, stage = %e.stage, error = %e.source, "job failed");
            }
        });

        result
    }

    /// Ask each configured tool for its version.
    pub async fn check_tools(&self) -> Vec<ToolStatus> {
        let checks = [
            (&self.options.download.program, "--version"),
            (&self.options.probe.program, "-version"),
            (&self.options.encode.program, "-version"),
        ];

        let mut statuses = Vec::with_capacity(checks.len());
        for (program, flag) in checks {
            let spec = CommandSpec::new(program.as_str(), TOOL_CHECK_TIMEOUT).arg(flag);
            let status = match self.runner.run(&spec).await {
                Ok(output) => ToolStatus {
                    program: program.clone(),
                    version: output
                        .stdout_text()
                        .lines()
                        .next()
                        .map(|line| line.trim().to_string()),
                    error: None,
                },
                Err(e) => ToolStatus {
                    program: program.clone(),
                    version: None,
                    error: Some(e.to_string()),
                },
            };
            statuses.push(status);
        }
        statuses
    }

    /// Convenience wrapper: start a job and run it.
    pub async fn process(&self, url: &str) -> std::result::Result<ExtractedAudio, JobError> {
        let mut job = self.start_job().map_err(|source| JobError {
            job_id: JobId::generate(&self.options.job_prefix),
            stage: Stage::Download,
            source,
        })?;
        self.run(&mut job, url).await
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        url: &str,
    ) -> std::result::Result<ExtractedAudio, JobError> {
        let runner = self.runner.as_ref();
        let path = job.scratch.media_path().to_path_buf();

        info!(%url, "job started");

        enter(job, Stage::Download);
        download::download_media(runner, url, &path, &self.options.download)
            .await
            .map_err(|e| job.fail(Stage::Download, e))?;
        leave(job, Stage::Download);

        enter(job, Stage::Probe);
        let duration = probe::probe_duration(runner, &path, &self.options.probe)
            .await
            .map_err(|e| job.fail(Stage::Probe, e))?;
        leave(job, Stage::Probe);

        enter(job, Stage::Encode);
        let audio_base64 = encode::encode_audio(runner, &path, &self.options.encode)
            .await
            .map_err(|e| job.fail(Stage::Encode, e))?;
        leave(job, Stage::Encode);

        Ok(ExtractedAudio {
            job_id: job.id.to_string(),
            duration,
            audio_base64,
        })
    }
}

fn enter(job: &mut Job, stage: Stage) {
    job.state = JobState::running(stage);
    info!(%stage, "stage started");
}

fn leave(job: &mut Job, stage: Stage) {
    job.state = JobState::finished(stage);
    info!(%stage, "stage finished");
}
