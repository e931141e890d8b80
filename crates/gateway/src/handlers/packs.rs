//! Prompt pack handlers

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
    errors::Result,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListPacksQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Serialize)]
pub struct PackView {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct ListPacksResponse {
    pub packs: Vec<PackView>,
}

/// List the pack catalog with bounded pagination
pub async fn list_packs(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<ListPacksQuery>,
) -> Result<Json<ListPacksResponse>> {
    let (limit, offset) = clamp_page(query.limit, query.offset);

    let repo = Repository::new(state.db.clone());
    let (packs, _total) = repo.list_packs(offset, limit).await?;

    Ok(Json(ListPacksResponse {
        packs: packs
            .into_iter()
            .map(|p| PackView {
                id: p.id,
                name: p.name,
                description: p.description,
            })
            .collect(),
    }))
}
