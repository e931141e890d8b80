//! Output image read handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use portraitforge_common::{
    auth::AuthContext,
    db::{clamp_page, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListImagesQuery {
    /// Comma-separated image ids to restrict the read to
    pub images: Option<String>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,
}

/// Parse a comma-separated id list
fn parse_id_filter(raw: Option<&str>) -> Result<Option<Vec<Uuid>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .split(',')
        .map(|part| {
            Uuid::parse_str(part.trim()).map_err(|_| AppError::InvalidFormat {
                message: format!("Invalid image id: {}", part.trim()),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[derive(Serialize)]
pub struct ImageView {
    pub id: Uuid,
    pub prompt: String,
    #[serde(rename = "modelId")]
    pub model_id: Uuid,
    pub status: String,
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ListImagesResponse {
    pub images: Vec<ImageView>,
}

/// List the caller's images, optionally restricted by id, with bounded
/// pagination. Rows belonging to other users are never returned.
pub async fn list_images(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<ListImagesResponse>> {
    let ids = parse_id_filter(query.images.as_deref())?;
    let (limit, offset) = clamp_page(query.limit, query.offset);

    let repo = Repository::new(state.db.clone());
    let (images, _total) = repo.list_images(auth.user_id, ids, offset, limit).await?;

    Ok(Json(ListImagesResponse {
        images: images
            .into_iter()
            .map(|image| ImageView {
                id: image.id,
                prompt: image.prompt,
                model_id: image.model_id,
                status: image.status,
                image_url: image.image_url,
                created_at: image.created_at.to_rfc3339(),
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_filter_absent() {
        assert_eq!(parse_id_filter(None).unwrap(), None);
        assert_eq!(parse_id_filter(Some("")).unwrap(), None);
        assert_eq!(parse_id_filter(Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_parse_id_filter_list() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{}, {}", a, b);
        assert_eq!(parse_id_filter(Some(&raw)).unwrap(), Some(vec![a, b]));
    }

    #[test]
    fn test_parse_id_filter_rejects_garbage() {
        assert!(parse_id_filter(Some("not-a-uuid")).is_err());
    }
}
