//! Route definitions for the dynamic QR service
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::routing::{delete, get, post};
use axum::{middleware, Router};

use crate::handler::{auth, folder, health, qr, redirect, user};
use crate::middleware::{require_admin, require_session};
use crate::state::AppState;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// Public:
/// - `GET /qr/index.php?id={id}` - 302 redirect to the destination
/// - `GET /dynamiqr/{id}` - 307 redirect to the destination
/// - `GET /health` - liveness and active backend
/// - `POST /api/auth/login` - exchange credentials for a session token
///
/// Session required (`Authorization: Bearer <token>`):
/// - `GET /api/auth/me`
/// - `GET|POST /api/qr`, `GET|PUT|DELETE /api/qr/{id}`
/// - `POST /api/qr/bulk/archive`
/// - `GET|POST /api/folders`, `PUT|DELETE /api/folders/{id}`
/// - `DELETE /api/folders/{id}/with-qrs`
///
/// Admin only:
/// - `GET|POST|PUT|DELETE /api/users`
///
/// # Example Usage
///
/// ```no_run
/// # use dynaqr::{config::Config, route::create_app, state::AppState, store::Store};
/// let config = Config::default();
/// let store = Store::open(&config.storage).unwrap();
/// let app = create_app(AppState::new(config, store));
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/users",
            get(user::list_users)
                .post(user::create_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        .route_layer(middleware::from_fn(require_admin));

    let session_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/qr", get(qr::list_qr_codes).post(qr::create_qr_code))
        .route("/qr/bulk/archive", post(qr::archive_qr_codes))
        .route(
            "/qr/{id}",
            get(qr::get_qr_code)
                .put(qr::update_qr_code)
                .delete(qr::delete_qr_code),
        )
        .route("/folders", get(folder::list_folders).post(folder::create_folder))
        .route(
            "/folders/{id}",
            delete(folder::delete_folder).put(folder::rename_folder),
        )
        .route("/folders/{id}/with-qrs", delete(folder::delete_folder_with_qrs))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .merge(session_routes);

    Router::new()
        // Public redirect endpoints
        .route("/qr/index.php", get(redirect::legacy_redirect))
        .route("/dynamiqr/{id}", get(redirect::dynamic_redirect))
        .route("/health", get(health))
        .nest("/api", api_routes)
        .with_state(state)
}
