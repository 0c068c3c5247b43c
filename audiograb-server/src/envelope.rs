use audiograb::ExtractedAudio;
use serde::{Deserialize, Serialize};

/// Body of `POST /download`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub media_url: Option<String>,
}

impl DownloadRequest {
    /// The trimmed URL, or `None` when missing or blank.
    pub fn media_url(&self) -> Option<&str> {
        self.media_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// The single response shape of `POST /download`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(audio: ExtractedAudio) -> Self {
        Self {
            success: true,
            job_id: Some(audio.job_id),
            duration: Some(audio.duration),
            audio_base64: Some(audio.audio_base64),
            error: None,
        }
    }

    pub fn failure(job_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            job_id,
            duration: None,
            audio_base64: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub auth_enabled: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub auth_enabled: bool,
    pub endpoints: Vec<EndpointInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_media_url_trimmed() {
        let req: DownloadRequest =
            serde_json::from_str(r#"{"mediaUrl": "  https://example.com/v "}"#).unwrap();
        assert_eq!(req.media_url(), Some("https://example.com/v"));
    }

    #[test]
    fn test_request_media_url_missing_or_blank() {
        let req: DownloadRequest = serde_json::from_str("{}").unwrap();
        assert!(req.media_url().is_none());
        let req: DownloadRequest = serde_json::from_str(r#"{"mediaUrl": "   "}"#).unwrap();
        assert!(req.media_url().is_none());
        let req: DownloadRequest = serde_json::from_str(r#"{"mediaUrl": null}"#).unwrap();
        assert!(req.media_url().is_none());
    }

    #[test]
    fn test_success_envelope_json() {
        let env = ResponseEnvelope::success(ExtractedAudio {
            job_id: "job_1_a".into(),
            duration: 3.0,
            audio_base64: "UklGRg==".into(),
        });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "jobId": "job_1_a",
                "duration": 3.0,
                "audioBase64": "UklGRg=="
            })
        );
    }

    #[test]
    fn test_failure_envelope_omits_empty_fields() {
        let json = serde_json::to_value(ResponseEnvelope::failure(None, "mediaUrl is required"))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "mediaUrl is required"})
        );
    }
}
