//! Territory endpoints under `/api/territories`. All require a session.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

use territory_core::{ImageKind, MapFrame};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Territory, TerritorySummary};
use crate::services::territories::{NewTerritory, TerritoryPatch};
use crate::state::AppState;

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Inline miniatures as `data:` URLs.
    #[serde(default)]
    pub miniatures: bool,
}

fn parse_kind(kind: &str) -> Result<ImageKind> {
    kind.parse()
        .map_err(|_| AppError::BadRequest("image kind must be `miniature` or `full`".to_string()))
}

/// GET /api/territories
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TerritorySummary>>> {
    let territories = state
        .territories()
        .list(auth.user.id, query.miniatures)
        .await?;
    Ok(Json(territories))
}

/// POST /api/territories
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Json(input): Json<NewTerritory>,
) -> Result<(StatusCode, Json<Territory>)> {
    let territory = state.territories().create(auth.user.id, input).await?;
    Ok((StatusCode::CREATED, Json(territory)))
}

/// GET /api/territories/{num}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(num): Path<String>,
) -> Result<Json<Territory>> {
    Ok(Json(state.territories().get(auth.user.id, &num).await?))
}

/// PUT /api/territories/{num}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(num): Path<String>,
    Json(patch): Json<TerritoryPatch>,
) -> Result<Json<Territory>> {
    let territory = state
        .territories()
        .update(auth.user.id, &num, patch)
        .await?;
    Ok(Json(territory))
}

/// DELETE /api/territories/{num}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(num): Path<String>,
) -> Result<StatusCode> {
    state.territories().delete(auth.user.id, &num).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/territories/{num}/frame
pub async fn frame(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(num): Path<String>,
) -> Result<Json<MapFrame>> {
    Ok(Json(state.territories().frame(auth.user.id, &num).await?))
}

/// PUT /api/territories/{num}/images/{kind}
///
/// Body is the raw image; its type is detected from the content.
pub async fn put_image(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path((num, kind)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode> {
    let kind = parse_kind(&kind)?;
    state
        .territories()
        .put_image(
            auth.user.id,
            &num,
            kind,
            &body,
            state.config().max_image_bytes,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/territories/{num}/images/{kind}
pub async fn get_image(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path((num, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let image = state
        .territories()
        .get_image(auth.user.id, &num, kind)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "private, no-cache".to_string()),
        ],
        image.data,
    ))
}

/// DELETE /api/territories/{num}/images/{kind}
pub async fn delete_image(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path((num, kind)): Path<(String, String)>,
) -> Result<StatusCode> {
    let kind = parse_kind(&kind)?;
    state
        .territories()
        .delete_image(auth.user.id, &num, kind)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
