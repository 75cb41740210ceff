use base64ct::{Base64, Encoding};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use super::dto::{AnalysisResult, JsonAnalysisRequest, UserProfile};
use super::normalize::{normalize, parse_payload};
use super::retry::RetryPolicy;
use crate::auth::{require_user, AuthUser};
use crate::config::AnalysisVariant;
use crate::error::{AttemptError, ClientError, ClientResult};
use crate::images::services::{
    ext_from_mime, mime_for_format, PreparedImage, SUPPORTED_IMAGE_TYPES,
};
use crate::state::ClientState;
use crate::transport::{ApiRequest, HttpTransport, MultipartImage, RequestBody};

pub const ANALYZE_PATH: &str = "/analyze-meal";

/// Image handed to the analysis endpoint.
#[derive(Debug, Clone)]
pub enum AnalysisImage {
    Prepared(PreparedImage),
    /// Base64 text, with or without a `data:image/...,` prefix.
    Base64(String),
}

impl AnalysisImage {
    fn is_empty(&self) -> bool {
        match self {
            Self::Prepared(p) => p.bytes.is_empty(),
            Self::Base64(s) => strip_data_url(s).trim().is_empty(),
        }
    }
}

/// Sends one image for analysis and returns the normalized result.
///
/// Transport errors and non-2xx statuses are retried with exponential
/// backoff. The whole call, backoff included, runs under a single deadline;
/// hitting it ends the call with [`ClientError::Timeout`] whatever retry budget
/// is left. A 2xx with an unusable body is never retried.
#[instrument(skip(state, user, image, profile), fields(user_id = ?user.map(|u| u.id)))]
pub async fn analyze_meal(
    state: &ClientState,
    user: Option<&AuthUser>,
    image: &AnalysisImage,
    profile: Option<UserProfile>,
) -> ClientResult<AnalysisResult> {
    let user = require_user(user)?;
    if image.is_empty() {
        return Err(ClientError::precondition("no image selected"));
    }

    let _guard = if state.config.single_flight {
        let guard = state.in_flight.try_claim(user.id).ok_or_else(|| {
            warn!("analysis already running for this user");
            ClientError::precondition("an analysis is already in flight for this user")
        })?;
        Some(guard)
    } else {
        None
    };

    let request = build_request(state.config.variant, user, image, profile)?;
    let policy = RetryPolicy::from(&state.config.retry);
    let deadline = state.config.request_timeout;

    let attempts = send_with_retry(state.transport.as_ref(), &request, &policy);
    match tokio::time::timeout(deadline, attempts).await {
        Ok(result) => result,
        Err(_) => {
            error!(timeout_secs = deadline.as_secs_f64(), "analysis deadline exceeded");
            Err(ClientError::Timeout(deadline))
        }
    }
}

async fn send_with_retry(
    transport: &dyn HttpTransport,
    request: &ApiRequest,
    policy: &RetryPolicy,
) -> ClientResult<AnalysisResult> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        info!(attempt, max_attempts = policy.max_attempts(), "sending analysis request");
        let started = Instant::now();

        let failure = match transport.post(request.clone()).await {
            Ok(res) if res.is_success() => {
                info!(
                    status = res.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    bytes = res.body.len(),
                    "analysis response received"
                );
                let payload = parse_payload(&res.body).inspect_err(|e| {
                    error!(error = %e, "analysis response unusable");
                })?;
                return Ok(normalize(&payload));
            }
            Ok(res) => AttemptError::Status {
                status: res.status,
                body: res.text(),
            },
            Err(e) => AttemptError::Transport(format!("{e:#}")),
        };

        warn!(attempt, error = %failure, "analysis attempt failed");
        match policy.backoff(attempt) {
            Some(delay) => {
                info!(delay_ms = delay.as_millis() as u64, "retrying analysis");
                tokio::time::sleep(delay).await;
            }
            None => {
                error!(attempts = attempt, "analysis retries exhausted");
                return Err(ClientError::AnalysisFailed {
                    attempts: attempt,
                    last: failure,
                });
            }
        }
    }
}

fn build_request(
    variant: AnalysisVariant,
    user: &AuthUser,
    image: &AnalysisImage,
    profile: Option<UserProfile>,
) -> ClientResult<ApiRequest> {
    let body = match variant {
        AnalysisVariant::Multipart => {
            let (file, file_name, content_type) = match image {
                AnalysisImage::Prepared(p) => (p.bytes.clone(), p.file_name(), p.content_type()),
                AnalysisImage::Base64(s) => {
                    let raw = Base64::decode_vec(strip_data_url(s).trim()).map_err(|e| {
                        ClientError::precondition(format!("image is not valid base64: {e}"))
                    })?;
                    let content_type = image::guess_format(&raw)
                        .ok()
                        .and_then(mime_for_format)
                        .ok_or_else(|| {
                            ClientError::precondition(format!(
                                "image must be one of {SUPPORTED_IMAGE_TYPES:?}"
                            ))
                        })?;
                    let ext = ext_from_mime(content_type).unwrap_or("bin");
                    (Bytes::from(raw), format!("meal.{ext}"), content_type)
                }
            };
            let profile = profile.unwrap_or_else(|| UserProfile::for_user(user.id));
            let profile = serde_json::to_string(&profile)
                .map_err(|e| ClientError::precondition(format!("profile not serializable: {e}")))?;
            RequestBody::Multipart(MultipartImage {
                file,
                file_name,
                content_type: content_type.to_string(),
                profile,
            })
        }
        AnalysisVariant::Json => {
            let encoded = match image {
                AnalysisImage::Prepared(p) => Base64::encode_string(&p.bytes),
                AnalysisImage::Base64(s) => strip_data_url(s).trim().to_string(),
            };
            let value = serde_json::to_value(JsonAnalysisRequest { image: &encoded })
                .map_err(|e| ClientError::precondition(format!("request not serializable: {e}")))?;
            RequestBody::Json(value)
        }
    };

    Ok(ApiRequest {
        path: ANALYZE_PATH,
        body,
        authorization: user.bearer(),
    })
}

pub(crate) fn strip_data_url(s: &str) -> &str {
    lazy_static! {
        static ref DATA_URL_RE: Regex = Regex::new(r"(?i)^data:image/[^,]*,").unwrap();
    }
    match DATA_URL_RE.find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    }
}
