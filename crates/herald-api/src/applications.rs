use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{error, info};

use herald_types::api::CreateApplicationRequest;
use herald_types::models::{Application, ApplicationId, UserId};

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

const TOKEN_PREFIX: char = 'A';
const TOKEN_RANDOM_LEN: usize = 14;

/// Application token: a fixed prefix followed by random alphanumerics.
pub fn generate_token() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{TOKEN_PREFIX}{suffix}")
}

/// POST /application
pub async fn create_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<Json<Application>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("application name must not be empty".into()));
    }

    let db = state.clone();
    let user_id = claims.sub;
    let token = generate_token();
    let row = tokio::task::spawn_blocking(move || {
        db.db.create_application(user_id, &name, &req.description, &token)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal("application could not be created".into())
    })?
    .map_err(|e| ApiError::Internal(format!("application could not be created: {e}")))?;

    info!(app_id = row.id, user_id, "Application created");

    Ok(Json(Application {
        id: ApplicationId(row.id),
        user_id: UserId(row.user_id),
        name: row.name,
        description: row.description,
        token: row.token,
    }))
}
