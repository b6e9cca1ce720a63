//! Folder management
//!
//! Deleting a folder keeps its QR codes and clears their folder reference.
//! `DELETE /api/folders/{id}/with-qrs` removes the codes as well; see
//! [`crate::store::FolderRemoval`] for the per-backend atomicity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::handler::non_empty;
use crate::middleware::CurrentUser;
use crate::model::{CreateFolderRequest, Folder, RenameFolderRequest, User};
use crate::state::AppState;
use crate::store::FolderRemoval;

async fn load_visible(state: &AppState, user: &User, id: &str) -> Result<Folder, AppError> {
    match state.store.get::<Folder>(id).await? {
        Some(folder) if user.can_access(folder.user_id) => Ok(folder),
        _ => Err(AppError::not_found(format!("Folder with id {id} not found"))),
    }
}

pub async fn list_folders(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let mut folders: Vec<Folder> = state
        .store
        .list::<Folder>()
        .await?
        .into_iter()
        .filter(|folder| user.can_access(folder.user_id))
        .collect();
    folders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));

    Ok(Json(folders))
}

pub async fn create_folder(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateFolderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = non_empty(payload.name).ok_or_else(|| AppError::validation("name is required"))?;

    let parent_id = match non_empty(payload.parent_id) {
        Some(parent_id) => match state.store.get::<Folder>(&parent_id).await? {
            Some(parent) if user.can_access(parent.user_id) => Some(parent_id),
            _ => {
                return Err(AppError::validation(format!(
                    "parent folder {parent_id} does not exist"
                )))
            }
        },
        None => None,
    };

    let folder = Folder {
        id: Uuid::new_v4().to_string(),
        name,
        parent_id,
        user_id: Some(user.id),
        created_at: Utc::now(),
    };
    if !state.store.insert(&folder).await? {
        return Err(AppError::Conflict(format!("Folder {} already exists", folder.id)));
    }
    tracing::info!(folder_id = %folder.id, "folder created");

    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn rename_folder(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<RenameFolderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = non_empty(payload.name).ok_or_else(|| AppError::validation("name is required"))?;

    let mut folder = load_visible(&state, &user, &id).await?;
    folder.name = name;
    state.store.put(&folder).await?;

    Ok(Json(folder))
}

/// Deletes a folder; its QR codes become unfiled
pub async fn delete_folder(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    remove(&state, &user, &id, FolderRemoval::Unlink).await
}

/// Deletes a folder together with every QR code filed in it
pub async fn delete_folder_with_qrs(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    remove(&state, &user, &id, FolderRemoval::Cascade).await
}

async fn remove(
    state: &AppState,
    user: &User,
    id: &str,
    mode: FolderRemoval,
) -> Result<StatusCode, AppError> {
    load_visible(state, user, id).await?;

    if !state.store.remove_folder(id, mode).await? {
        return Err(AppError::not_found(format!("Folder with id {id} not found")));
    }
    tracing::info!(folder_id = %id, ?mode, "folder deleted");

    // Subfolders move up to the top level.
    let children = state.store.list::<Folder>().await?;
    for mut child in children.into_iter().filter(|f| f.parent_id.as_deref() == Some(id)) {
        child.parent_id = None;
        state.store.put(&child).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
