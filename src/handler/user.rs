//! User administration
//!
//! All routes here sit behind [`crate::middleware::require_admin`].

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::error::AppError;
use crate::handler::{auth::find_by_email, non_empty};
use crate::model::{
    CreateUserRequest, DeleteUserParams, Role, UpdateUserRequest, User, UserView,
};
use crate::session::hash_password;
use crate::state::AppState;

fn next_user_id(users: &[User]) -> u64 {
    users.iter().map(|user| user.id).max().unwrap_or(0) + 1
}

/// Hashes the password and stores a new user under the next free id
async fn register(
    state: &AppState,
    email: String,
    password: &str,
    role: Role,
    qr_limit: u32,
) -> Result<User, AppError> {
    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::Conflict(format!("A user with email {email} already exists")));
    }

    let users = state.store.list::<User>().await?;
    let user = User {
        id: next_user_id(&users),
        email,
        password_hash: hash_password(password)?,
        role,
        qr_limit,
        created_at: Utc::now(),
    };
    if !state.store.insert(&user).await? {
        return Err(AppError::Conflict(format!("User id {} is taken, retry", user.id)));
    }
    tracing::info!(user_id = user.id, role = ?user.role, "user created");

    Ok(user)
}

/// Creates the configured admin account when no user exists yet
///
/// Returns whether an account was created.
pub async fn bootstrap_admin(state: &AppState) -> Result<bool, AppError> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.clone(),
        state.config.admin_password.clone(),
    ) else {
        return Ok(false);
    };

    if !state.store.list::<User>().await?.is_empty() {
        return Ok(false);
    }

    let limit = state.config.default_qr_limit;
    register(state, email, &password, Role::Admin, limit).await?;
    Ok(true)
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut users = state.store.list::<User>().await?;
    users.sort_by_key(|user| user.id);

    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(Json(views))
}

/// Creates a user
///
/// # Request Body
///
/// ```json
/// { "email": "ana@example.com", "password": "...", "role": "user", "limit": 20 }
/// ```
///
/// A missing or zero `limit` falls back to the configured default quota.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = payload.password.filter(|p| !p.is_empty());
    let (Some(email), Some(password), Some(role)) =
        (non_empty(payload.email), password, non_empty(payload.role))
    else {
        return Err(AppError::validation("Email, password, and role are required"));
    };
    let role = Role::parse(&role)
        .ok_or_else(|| AppError::validation(format!("unknown role {role:?}")))?;
    let limit = payload
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(state.config.default_qr_limit);

    let user = register(&state, email.trim().to_string(), &password, role, limit).await?;

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// Changes a user's QR limit
///
/// # Request Body
///
/// ```json
/// { "id": 3, "limit": 100 }
/// ```
pub async fn update_user(
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(id), Some(limit)) = (payload.id, payload.limit.filter(|limit| *limit > 0)) else {
        return Err(AppError::validation("User ID and limit are required"));
    };

    let Some(mut user) = state.store.get::<User>(&id.to_string()).await? else {
        return Err(AppError::not_found("User not found"));
    };
    user.qr_limit = limit;
    state.store.put(&user).await?;
    tracing::info!(user_id = user.id, limit, "user limit changed");

    Ok(Json(UserView::from(&user)))
}

/// Deletes a user given as `?id=<n>`
///
/// QR codes and folders the user owned are kept.
pub async fn delete_user(
    State(state): State<AppState>,
    Query(params): Query<DeleteUserParams>,
) -> Result<impl IntoResponse, AppError> {
    let id: u64 = non_empty(params.id)
        .ok_or_else(|| AppError::validation("User ID is required"))?
        .trim()
        .parse()
        .map_err(|_| AppError::validation("User ID must be a number"))?;

    if !state.store.delete::<User>(&id.to_string()).await? {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!(user_id = id, "user deleted");

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_continue_after_the_highest() {
        assert_eq!(next_user_id(&[]), 1);

        let user = |id| User {
            id,
            email: format!("u{id}@example.com"),
            password_hash: String::new(),
            role: Role::User,
            qr_limit: 50,
            created_at: Utc::now(),
        };
        assert_eq!(next_user_id(&[user(1), user(7), user(3)]), 8);
    }
}
