use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info, warn};

use audiograb::{Error, JobError};

use crate::envelope::{
    DownloadRequest, EndpointInfo, HealthResponse, ResponseEnvelope, ServiceInfo,
};
use crate::state::AppState;

pub const SERVICE_NAME: &str = "audiograb";

pub const MISSING_URL_MESSAGE: &str = "mediaUrl is required";

pub const TIMEOUT_MESSAGE: &str =
    "Request timed out: the source site may be rate limiting or blocking downloads, please try again later";

pub const MISSING_OUTPUT_MESSAGE: &str = "download did not produce expected output";

type EnvelopeResponse = (StatusCode, Json<ResponseEnvelope>);

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        auth_enabled: state.auth.is_enabled(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn root_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    let endpoint = |method: &str, path: &str, description: &str| EndpointInfo {
        method: method.to_string(),
        path: path.to_string(),
        description: description.to_string(),
    };

    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_enabled: state.auth.is_enabled(),
        endpoints: vec![
            endpoint("GET", "/health", "liveness probe"),
            endpoint("GET", "/", "service metadata"),
            endpoint(
                "POST",
                "/download",
                "download {mediaUrl} and return 16 kHz mono WAV as base64",
            ),
        ],
    })
}

/// Map a failed job to the message shown to clients.
pub fn user_message(err: &JobError) -> String {
    match &err.source {
        Error::ProcessTimeout { .. } => TIMEOUT_MESSAGE.to_string(),
        Error::OutputMissing { .. } => MISSING_OUTPUT_MESSAGE.to_string(),
        _ => err.to_string(),
    }
}

fn bad_request(message: impl Into<String>) -> EnvelopeResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(ResponseEnvelope::failure(None, message)),
    )
}

pub async fn download_handler(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> EnvelopeResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected malformed request body");
            return bad_request(format!("invalid request body: {}", rejection.body_text()));
        }
    };

    let Some(url) = request.media_url() else {
        return bad_request(MISSING_URL_MESSAGE);
    };

    let url = match state.pipeline.validate_url(url) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "rejected media URL");
            return bad_request(e.to_string());
        }
    };

    let mut job = match state.pipeline.start_job() {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "failed to allocate job");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResponseEnvelope::failure(None, format!("failed to start job: {e}"))),
            );
        }
    };

    info!(job_id = %job.id(), %url, "accepted download request");

    match state.pipeline.run(&mut job, url).await {
        Ok(audio) => (StatusCode::OK, Json(ResponseEnvelope::success(audio))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ResponseEnvelope::failure(
                Some(e.job_id.to_string()),
                user_message(&e),
            )),
        ),
    }
}
