//! Per-user image generation settings under `/api/config`.

use axum::{Json, extract::State};

use territory_core::ImageGenerationConfig;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// GET /api/config
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<ImageGenerationConfig>> {
    Ok(Json(state.territories().config(auth.user.id).await?))
}

/// PUT /api/config
///
/// Missing fields take their default value.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Json(config): Json<ImageGenerationConfig>,
) -> Result<Json<ImageGenerationConfig>> {
    let saved = state
        .territories()
        .update_config(auth.user.id, config)
        .await?;
    Ok(Json(saved))
}
