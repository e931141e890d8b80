//! Provider webhook handlers
//!
//! The provider calls these routes out-of-band after a submitted job
//! finishes. Deliveries can arrive more than once and in any order; rows
//! are matched on the stored provider request id only, and transitions are
//! single filtered updates, so a redelivered or unknown completion resolves
//! zero rows and still succeeds.

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use portraitforge_common::{
    db::Repository,
    errors::{AppError, Result},
    metrics,
};

/// Provider job outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ProviderStatus {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Training completion payload
#[derive(Debug, Deserialize)]
pub struct TrainingWebhookPayload {
    pub request_id: String,

    #[serde(default)]
    pub status: ProviderStatus,

    /// Trained weights reference (absent on failures)
    #[serde(default, alias = "tensorPath")]
    pub tensor_path: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Image completion payload
#[derive(Debug, Deserialize)]
pub struct ImageWebhookPayload {
    pub request_id: String,

    #[serde(default)]
    pub status: ProviderStatus,

    /// Resolved image location (absent on failures)
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: String,
}

/// Check the optional shared secret on a webhook delivery
fn verify_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let Some(ref expected) = state.config.auth.webhook_secret else {
        return Ok(());
    };

    let provided = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != expected {
        return Err(AppError::Unauthorized {
            message: "Invalid webhook secret".to_string(),
        });
    }

    Ok(())
}

fn require_request_id(request_id: &str) -> Result<()> {
    if request_id.is_empty() {
        return Err(AppError::MissingField {
            field: "request_id".to_string(),
        });
    }
    Ok(())
}

/// Resolve models matching a finished training job
pub async fn training_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrainingWebhookPayload>,
) -> Result<Json<WebhookResponse>> {
    verify_webhook_secret(&state, &headers)?;
    require_request_id(&payload.request_id)?;

    let repo = Repository::new(state.db.clone());

    let rows = match (payload.status, payload.tensor_path.as_deref()) {
        (ProviderStatus::Ok, Some(tensor_path)) if !tensor_path.is_empty() => {
            repo.complete_training(&payload.request_id, tensor_path).await?
        }
        _ => {
            // ERROR status, or a success payload missing its artifact
            let error = payload
                .error
                .as_deref()
                .unwrap_or("provider reported failure");
            repo.fail_training(&payload.request_id, error).await?
        }
    };

    metrics::record_webhook("train", rows);

    if rows == 0 {
        // Expected under retried delivery or an unknown job id
        tracing::debug!(
            request_id = %payload.request_id,
            "Training webhook matched no submitted rows"
        );
    } else {
        tracing::info!(
            request_id = %payload.request_id,
            rows = rows,
            "Training webhook processed"
        );
    }

    Ok(Json(WebhookResponse {
        message: "webhook processed".to_string(),
    }))
}

/// Resolve output images matching a finished generation job
pub async fn image_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ImageWebhookPayload>,
) -> Result<Json<WebhookResponse>> {
    verify_webhook_secret(&state, &headers)?;
    require_request_id(&payload.request_id)?;

    let repo = Repository::new(state.db.clone());

    let rows = match (payload.status, payload.image_url.as_deref()) {
        (ProviderStatus::Ok, Some(image_url)) if !image_url.is_empty() => {
            repo.complete_image(&payload.request_id, image_url).await?
        }
        _ => {
            let error = payload
                .error
                .as_deref()
                .unwrap_or("provider reported failure");
            repo.fail_image(&payload.request_id, error).await?
        }
    };

    metrics::record_webhook("image", rows);

    if rows == 0 {
        tracing::debug!(
            request_id = %payload.request_id,
            "Image webhook matched no submitted rows"
        );
    } else {
        tracing::info!(
            request_id = %payload.request_id,
            rows = rows,
            "Image webhook processed"
        );
    }

    Ok(Json(WebhookResponse {
        message: "webhook processed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_payload_snake_case() {
        let payload: TrainingWebhookPayload = serde_json::from_str(
            r#"{"request_id":"req-1","status":"OK","tensor_path":"path/x"}"#,
        )
        .unwrap();
        assert_eq!(payload.request_id, "req-1");
        assert_eq!(payload.status, ProviderStatus::Ok);
        assert_eq!(payload.tensor_path.as_deref(), Some("path/x"));
    }

    #[test]
    fn test_training_payload_camel_alias() {
        let payload: TrainingWebhookPayload =
            serde_json::from_str(r#"{"request_id":"req-1","tensorPath":"path/x"}"#).unwrap();
        assert_eq!(payload.status, ProviderStatus::Ok);
        assert_eq!(payload.tensor_path.as_deref(), Some("path/x"));
    }

    #[test]
    fn test_image_payload_error_status() {
        let payload: ImageWebhookPayload = serde_json::from_str(
            r#"{"request_id":"req-9","status":"ERROR","error":"nsfw filter"}"#,
        )
        .unwrap();
        assert_eq!(payload.status, ProviderStatus::Error);
        assert_eq!(payload.image_url, None);
        assert_eq!(payload.error.as_deref(), Some("nsfw filter"));
    }

    #[test]
    fn test_missing_request_id_rejected() {
        assert!(serde_json::from_str::<ImageWebhookPayload>(r#"{"image_url":"u"}"#).is_err());
        assert!(require_request_id("").is_err());
        assert!(require_request_id("req-1").is_ok());
    }
}
