//! Public redirect endpoints
//!
//! Two entry points resolve the same records:
//!
//! - `GET /qr/index.php?id={id}` answers **302 Found** (links printed on
//!   early QR codes)
//! - `GET /dynamiqr/{id}` answers **307 Temporary Redirect**
//!
//! Neither ever answers 301: destinations are editable and must not be
//! pinned by browser or proxy caches. Every failure is the same plain-text
//! 404 so probing ids reveals nothing.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::resolver::{resolve, Resolution};
use crate::state::AppState;

pub const NOT_FOUND_MESSAGE: &str = "QR no encontrado";

#[derive(Deserialize)]
pub struct LegacyParams {
    pub id: Option<String>,
}

pub async fn legacy_redirect(
    State(state): State<AppState>,
    Query(params): Query<LegacyParams>,
) -> Response {
    match params.id {
        Some(id) => redirect_or_not_found(&state, &id, StatusCode::FOUND).await,
        None => not_found(),
    }
}

pub async fn dynamic_redirect(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    redirect_or_not_found(&state, &id, StatusCode::TEMPORARY_REDIRECT).await
}

async fn redirect_or_not_found(state: &AppState, id: &str, status: StatusCode) -> Response {
    match resolve(&state.store, id).await {
        Resolution::Redirect(url) => match HeaderValue::from_str(&url) {
            Ok(location) => {
                tracing::debug!(qr_id = %id, status = status.as_u16(), "redirecting");
                (status, [(header::LOCATION, location)]).into_response()
            }
            Err(_) => {
                tracing::warn!(qr_id = %id, "destination is not a valid Location header");
                not_found()
            }
        },
        Resolution::NotFound => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response()
}
