//! HTTP request handlers
//!
//! - [`redirect`] - public short-link resolution
//! - [`qr`] / [`folder`] - QR code and folder management
//! - [`auth`] - login and current session
//! - [`user`] - user administration (admin only)

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub mod auth;
pub mod folder;
pub mod qr;
pub mod redirect;
pub mod user;

/// Liveness probe reporting the active storage backend
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.store.backend_name(),
    }))
}

/// Treats `""` (after trimming) the same as an absent field
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
