//! QR code management
//!
//! Regular users see and edit their own codes plus unowned (shared) ones;
//! admins see everything. A code the caller may not see answers 404, the
//! same as a missing one.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;

use crate::error::AppError;
use crate::handler::non_empty;
use crate::ids::{self, MAX_ID_ATTEMPTS};
use crate::middleware::CurrentUser;
use crate::model::{
    ArchiveRequest, ArchiveResponse, CreateQrRequest, Folder, QrCode, QrListParams, QrView,
    UpdateQrRequest, User,
};
use crate::state::AppState;

fn view(state: &AppState, qr: QrCode) -> QrView {
    QrView::new(qr, &state.config.public_base_url)
}

/// Loads a QR code the caller is allowed to see
async fn load_visible(state: &AppState, user: &User, id: &str) -> Result<QrCode, AppError> {
    match state.store.get::<QrCode>(id).await? {
        Some(qr) if user.can_access(qr.user_id) => Ok(qr),
        _ => Err(AppError::not_found(format!("QR Code with id {id} not found"))),
    }
}

/// Resolves an optional folder reference, rejecting folders that do not exist
async fn checked_folder(
    state: &AppState,
    user: &User,
    folder_id: Option<String>,
) -> Result<Option<String>, AppError> {
    let Some(folder_id) = non_empty(folder_id) else {
        return Ok(None);
    };
    match state.store.get::<Folder>(&folder_id).await? {
        Some(folder) if user.can_access(folder.user_id) => Ok(Some(folder_id)),
        _ => Err(AppError::validation(format!(
            "folder {folder_id} does not exist"
        ))),
    }
}

/// Lists the caller's QR codes, oldest first
///
/// # Query Parameters
///
/// - `folderId` (optional) - only codes filed in this folder
/// - `includeArchived` (optional) - also return archived codes
pub async fn list_qr_codes(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<QrListParams>,
) -> Result<impl IntoResponse, AppError> {
    let include_archived = params.include_archived.unwrap_or(false);
    let folder = non_empty(params.folder_id);

    let mut qrcodes: Vec<QrCode> = state
        .store
        .list::<QrCode>()
        .await?
        .into_iter()
        .filter(|qr| user.can_access(qr.user_id))
        .filter(|qr| include_archived || !qr.is_archived())
        .filter(|qr| folder.is_none() || qr.folder_id == folder)
        .collect();
    qrcodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let views: Vec<QrView> = qrcodes.into_iter().map(|qr| view(&state, qr)).collect();
    Ok(Json(views))
}

/// Generates a new QR code
///
/// # Request Body
///
/// ```json
/// {
///   "destinationUrl": "https://example.com/page",
///   "name": "Flyer",
///   "folderId": null
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - the stored code with its `shortUrl`
/// - **400 Bad Request** - `destinationUrl` missing or empty, unknown folder
/// - **403 Forbidden** - the caller's QR limit is reached
///
/// The id is random; when it is already taken a new one is drawn, up to
/// [`MAX_ID_ATTEMPTS`] times.
pub async fn create_qr_code(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateQrRequest>,
) -> Result<impl IntoResponse, AppError> {
    let destination_url = non_empty(payload.destination_url)
        .ok_or_else(|| AppError::validation("destinationUrl is required"))?;
    let folder_id = checked_folder(&state, &user, payload.folder_id).await?;

    let owned = state
        .store
        .list::<QrCode>()
        .await?
        .iter()
        .filter(|qr| qr.user_id == Some(user.id) && !qr.is_archived())
        .count();
    if owned >= user.qr_limit as usize {
        return Err(AppError::forbidden(format!(
            "QR limit reached ({} of {})",
            owned, user.qr_limit
        )));
    }

    let now = Utc::now();
    let mut record = QrCode {
        id: String::new(),
        name: non_empty(payload.name),
        destination_url,
        folder_id,
        created_at: now,
        updated_at: None,
        nfc_link: non_empty(payload.nfc_link),
        user_id: Some(user.id),
        deleted_at: None,
    };

    for attempt in 1..=MAX_ID_ATTEMPTS {
        record.id = ids::generate(state.config.id_length);
        if state.store.insert(&record).await? {
            tracing::info!(qr_id = %record.id, user_id = user.id, "QR code created");
            return Ok((StatusCode::CREATED, Json(view(&state, record))));
        }
        tracing::warn!(qr_id = %record.id, attempt, "generated QR id already taken");
    }

    Err(AppError::Internal(
        "could not allocate a unique QR id".to_string(),
    ))
}

pub async fn get_qr_code(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let qr = load_visible(&state, &user, &id).await?;
    Ok(Json(view(&state, qr)))
}

/// Edits a QR code; fields left out of the body keep their value
///
/// # Response
///
/// - **200 OK** - the updated code
/// - **400 Bad Request** - `destinationUrl` sent empty, unknown folder
/// - **404 Not Found** - no such code
pub async fn update_qr_code(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateQrRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut qr = load_visible(&state, &user, &id).await?;

    if let Some(destination_url) = payload.destination_url {
        if destination_url.trim().is_empty() {
            return Err(AppError::validation("destinationUrl is required"));
        }
        qr.destination_url = destination_url;
    }
    if let Some(name) = payload.name {
        qr.name = non_empty(name);
    }
    if let Some(folder_id) = payload.folder_id {
        qr.folder_id = checked_folder(&state, &user, folder_id).await?;
    }
    if let Some(nfc_link) = payload.nfc_link {
        qr.nfc_link = non_empty(nfc_link);
    }
    qr.updated_at = Some(Utc::now());

    state.store.put(&qr).await?;
    tracing::info!(qr_id = %qr.id, "QR code updated");

    Ok(Json(view(&state, qr)))
}

pub async fn delete_qr_code(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    load_visible(&state, &user, &id).await?;

    if !state.store.delete::<QrCode>(&id).await? {
        return Err(AppError::not_found(format!("QR Code with id {id} not found")));
    }
    tracing::info!(qr_id = %id, "QR code deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Archives (soft-deletes) several QR codes at once
///
/// Archived codes stop resolving but stay listable with
/// `includeArchived=true`. Ids that are unknown, not visible to the caller
/// or already archived are skipped.
///
/// # Request Body
///
/// ```json
/// { "ids": ["aB3dE8xY", "Qw9Zt2Lm"] }
/// ```
pub async fn archive_qr_codes(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ArchiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.ids.is_empty() {
        return Err(AppError::validation("ids must not be empty"));
    }

    let now = Utc::now();
    let mut archived = 0;
    for id in &payload.ids {
        let Some(mut qr) = state.store.get::<QrCode>(id).await? else {
            continue;
        };
        if !user.can_access(qr.user_id) || qr.is_archived() {
            continue;
        }
        qr.deleted_at = Some(now);
        qr.updated_at = Some(now);
        state.store.put(&qr).await?;
        archived += 1;
    }
    tracing::info!(requested = payload.ids.len(), archived, "QR codes archived");

    Ok(Json(ArchiveResponse { archived }))
}
