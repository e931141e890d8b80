//! Model training handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use portraitforge_common::{
    auth::AuthContext,
    db::models::{Ethnicity, EyeColor, SubjectType},
    db::Repository,
    errors::{AppError, Result},
    metrics,
};

/// Request to train a new portrait model
///
/// Wire spellings (`ethinicity`, `eyeColor`, `zipUrl`) are part of the
/// public API contract.
#[derive(Debug, Deserialize, Validate)]
pub struct TrainModelRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[serde(rename = "type")]
    pub subject_type: SubjectType,

    #[validate(range(min = 1, max = 120))]
    pub age: i32,

    #[serde(rename = "ethinicity")]
    pub ethnicity: Ethnicity,

    #[serde(rename = "eyeColor")]
    pub eye_color: EyeColor,

    pub bald: bool,

    /// Uploaded training image references
    #[validate(length(min = 1))]
    pub images: Vec<String>,

    /// Archive of the training images; falls back to the first entry of
    /// `images` when omitted
    #[serde(default, rename = "zipUrl")]
    pub zip_url: Option<String>,
}

impl TrainModelRequest {
    /// Resolve the training archive reference
    fn archive_url(&self) -> Result<String> {
        self.zip_url
            .clone()
            .or_else(|| self.images.first().cloned())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::MissingField {
                field: "zipUrl".to_string(),
            })
    }
}

/// Response after submitting a training job
#[derive(Serialize)]
pub struct TrainModelResponse {
    #[serde(rename = "modelId")]
    pub model_id: Uuid,
}

/// Validate a training request, submit the training job, and persist the
/// model row in submitted state keyed by the returned job id.
pub async fn train_model(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<TrainModelRequest>,
) -> Result<(StatusCode, Json<TrainModelResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let archive_url = request.archive_url()?;

    // Submit before persisting: the row must carry its job id from birth.
    let started = Instant::now();
    let submission = state
        .generator
        .submit_training(&archive_url, &request.name)
        .await
        .inspect_err(|_| metrics::record_submission("train", 0.0, false))?;
    metrics::record_submission("train", started.elapsed().as_secs_f64(), true);

    let repo = Repository::new(state.db.clone());
    let model = repo
        .create_model(
            auth.user_id,
            request.name.clone(),
            request.subject_type,
            request.age,
            request.ethnicity,
            request.eye_color,
            request.bald,
            archive_url,
            request.name,
            submission.request_id.clone(),
        )
        .await?;

    tracing::info!(
        model_id = %model.id,
        user_id = %auth.user_id,
        request_id = %submission.request_id,
        "Training job submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(TrainModelResponse { model_id: model.id }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_body() -> serde_json::Value {
        serde_json::json!({
            "name": "Jane",
            "type": "Woman",
            "age": 25,
            "ethinicity": "White",
            "eyeColor": "Blue",
            "bald": false,
            "images": ["u1"]
        })
    }

    #[test]
    fn test_example_request_parses_and_validates() {
        let request: TrainModelRequest = serde_json::from_value(example_body()).unwrap();
        assert_eq!(request.name, "Jane");
        assert_eq!(request.subject_type, SubjectType::Woman);
        assert_eq!(request.ethnicity, Ethnicity::White);
        assert_eq!(request.eye_color, EyeColor::Blue);
        assert!(request.validate().is_ok());
        assert_eq!(request.archive_url().unwrap(), "u1");
    }

    #[test]
    fn test_zip_url_takes_precedence() {
        let mut body = example_body();
        body["zipUrl"] = serde_json::json!("https://bucket/models/a.zip");
        let request: TrainModelRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.archive_url().unwrap(), "https://bucket/models/a.zip");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut body = example_body();
        body["name"] = serde_json::json!("");
        let request: TrainModelRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_empty_images_rejected() {
        let mut body = example_body();
        body["images"] = serde_json::json!([]);
        let request: TrainModelRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
        assert!(request.archive_url().is_err());
    }

    #[test]
    fn test_unknown_ethnicity_rejected() {
        let mut body = example_body();
        body["ethinicity"] = serde_json::json!("Martian");
        assert!(serde_json::from_value::<TrainModelRequest>(body).is_err());
    }
}
