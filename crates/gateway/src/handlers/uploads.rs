//! Training archive upload handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

use portraitforge_common::{auth::AuthContext, errors::Result};

/// Pre-signed upload slot response
#[derive(Serialize)]
pub struct UploadUrlResponse {
    pub url: String,
    pub key: String,
}

/// Issue a time-bounded pre-signed PUT URL for a training archive
pub async fn pre_signed_url(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<UploadUrlResponse>> {
    let target = state.uploads.issue_upload_url().await?;

    tracing::info!(
        user_id = %auth.user_id,
        key = %target.key,
        "Issued pre-signed upload URL"
    );

    Ok(Json(UploadUrlResponse {
        url: target.url,
        key: target.key,
    }))
}
