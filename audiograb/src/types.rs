use serde::{Deserialize, Serialize};

/// Result of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedAudio {
    pub job_id: String,
    /// Container duration in seconds; `0.0` when it could not be determined.
    pub duration: f64,
    /// 16kHz mono s16le WAV, base64 without line breaks.
    pub audio_base64: String,
}

impl ExtractedAudio {
    /// Format as JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Format as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Download,
    Probe,
    Encode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Probe => "probe",
            Stage::Encode => "encode",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a job. `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Downloading,
    Downloaded,
    Probing,
    Probed,
    Encoding,
    Encoded,
    Cleaned,
    Failed,
}

impl JobState {
    /// State entered when `stage` starts.
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Download => JobState::Downloading,
            Stage::Probe => JobState::Probing,
            Stage::Encode => JobState::Encoding,
        }
    }

    /// State entered when `stage` completes.
    pub fn finished(stage: Stage) -> Self {
        match stage {
            Stage::Download => JobState::Downloaded,
            Stage::Probe => JobState::Probed,
            Stage::Encode => JobState::Encoded,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Cleaned | JobState::Failed)
    }
}
