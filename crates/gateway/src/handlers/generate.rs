//! Image generation handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use portraitforge_common::{
    auth::AuthContext,
    db::models::PortraitModel,
    db::Repository,
    errors::{AppError, Result},
    generation::JobSubmission,
    metrics,
};

/// Request to generate a single image
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateImageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,

    #[serde(rename = "modelId")]
    pub model_id: Uuid,

    /// Requested image count; a single row is created per request
    #[validate(range(min = 1, max = 10))]
    pub num: u32,
}

/// Response after submitting a generation job
#[derive(Serialize)]
pub struct GenerateImageResponse {
    #[serde(rename = "imageId")]
    pub image_id: Uuid,
}

/// Request to generate one image per prompt of a pack
#[derive(Debug, Deserialize)]
pub struct GenerateFromPackRequest {
    #[serde(rename = "modelId")]
    pub model_id: Uuid,

    #[serde(rename = "packId")]
    pub pack_id: Uuid,
}

/// Response after submitting a bulk pack generation
#[derive(Serialize)]
pub struct GenerateFromPackResponse {
    pub images: Vec<Uuid>,
}

/// Load a model and require it to be owned by the caller and fully trained
async fn load_trained_model(
    repo: &Repository,
    auth: &AuthContext,
    model_id: Uuid,
) -> Result<PortraitModel> {
    let model = repo
        .find_model_by_id(model_id)
        .await?
        .filter(|m| m.user_id == auth.user_id)
        .ok_or_else(|| AppError::ModelNotFound {
            id: model_id.to_string(),
        })?;

    if !model.is_trained() {
        return Err(AppError::ModelNotTrained {
            id: model_id.to_string(),
        });
    }

    Ok(model)
}

/// Pair prompts with their submissions by position
fn pair_by_position(prompts: &[String], submissions: Vec<JobSubmission>) -> Vec<(String, String)> {
    prompts
        .iter()
        .cloned()
        .zip(submissions.into_iter().map(|s| s.request_id))
        .collect()
}

/// Validate a generation request, submit the job, and persist the output
/// image row in submitted state keyed by the returned job id.
pub async fn generate_image(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<GenerateImageRequest>,
) -> Result<(StatusCode, Json<GenerateImageResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let model = load_trained_model(&repo, &auth, request.model_id).await?;

    // is_trained() guarantees the weights path is present
    let tensor_path = model.tensor_path.as_deref().unwrap_or_default();

    let started = Instant::now();
    let submission = state
        .generator
        .submit_generation(&request.prompt, tensor_path)
        .await
        .inspect_err(|_| metrics::record_submission("gen", 0.0, false))?;
    metrics::record_submission("gen", started.elapsed().as_secs_f64(), true);

    let image = repo
        .create_output_image(
            auth.user_id,
            model.id,
            request.prompt,
            submission.request_id.clone(),
        )
        .await?;

    tracing::info!(
        image_id = %image.id,
        model_id = %model.id,
        user_id = %auth.user_id,
        request_id = %submission.request_id,
        "Generation job submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateImageResponse { image_id: image.id }),
    ))
}

/// Submit one generation job per prompt of the pack, concurrently, and
/// persist one output image row per prompt.
///
/// Any submission failure rejects the whole batch before anything is
/// persisted, so the positional prompt-to-job pairing can never be
/// corrupted by a partial batch.
pub async fn generate_from_pack(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<GenerateFromPackRequest>,
) -> Result<(StatusCode, Json<GenerateFromPackResponse>)> {
    let repo = Repository::new(state.db.clone());
    let model = load_trained_model(&repo, &auth, request.model_id).await?;

    let pack = repo
        .find_pack_by_id(request.pack_id)
        .await?
        .ok_or_else(|| AppError::PackNotFound {
            id: request.pack_id.to_string(),
        })?;

    let prompts: Vec<String> = repo
        .list_pack_prompts(pack.id)
        .await?
        .into_iter()
        .map(|p| p.prompt)
        .collect();

    if prompts.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(GenerateFromPackResponse { images: Vec::new() }),
        ));
    }

    let tensor_path = model.tensor_path.as_deref().unwrap_or_default();

    let started = Instant::now();
    let submissions = futures::future::try_join_all(
        prompts
            .iter()
            .map(|prompt| state.generator.submit_generation(prompt, tensor_path)),
    )
    .await
    .inspect_err(|_| metrics::record_submission("pack", 0.0, false))?;
    metrics::record_submission("pack", started.elapsed().as_secs_f64(), true);

    let pairs = pair_by_position(&prompts, submissions);
    let rows = repo
        .create_output_images(auth.user_id, model.id, pairs)
        .await?;

    tracing::info!(
        pack_id = %pack.id,
        model_id = %model.id,
        user_id = %auth.user_id,
        count = rows.len(),
        "Bulk pack generation submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateFromPackResponse {
            images: rows.into_iter().map(|r| r.id).collect(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portraitforge_common::generation::{GenerationBackend, MockBackend};

    #[test]
    fn test_generate_request_wire_names() {
        let body = serde_json::json!({
            "prompt": "portrait at dusk",
            "modelId": "7f8de5c5-7d26-4b44-8c5e-0a6e2e2b1f11",
            "num": 1
        });
        let request: GenerateImageRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.prompt, "portrait at dusk");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_num_out_of_range_rejected() {
        let body = serde_json::json!({
            "prompt": "portrait",
            "modelId": "7f8de5c5-7d26-4b44-8c5e-0a6e2e2b1f11",
            "num": 0
        });
        let request: GenerateImageRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn test_positional_pairing() {
        let backend = MockBackend::new();
        let prompts: Vec<String> = (0..5).map(|i| format!("prompt-{}", i)).collect();

        let submissions = futures::future::try_join_all(
            prompts
                .iter()
                .map(|prompt| backend.submit_generation(prompt, "weights/x")),
        )
        .await
        .unwrap();

        let pairs = pair_by_position(&prompts, submissions);

        assert_eq!(pairs.len(), 5);
        for (i, (prompt, request_id)) in pairs.iter().enumerate() {
            assert_eq!(prompt, &format!("prompt-{}", i));
            assert_eq!(request_id, &format!("mock-gen-{}", i));
        }
    }

    #[tokio::test]
    async fn test_batch_fails_whole_on_submission_error() {
        let backend = MockBackend::failing();
        let prompts: Vec<String> = (0..3).map(|i| format!("prompt-{}", i)).collect();

        let result = futures::future::try_join_all(
            prompts
                .iter()
                .map(|prompt| backend.submit_generation(prompt, "weights/x")),
        )
        .await;

        assert!(matches!(result, Err(AppError::Submission { .. })));
        assert!(backend.submissions().is_empty());
    }
}
