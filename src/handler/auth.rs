use axum::{extract::State, response::IntoResponse, Extension, Json};

use crate::error::AppError;
use crate::handler::non_empty;
use crate::middleware::CurrentUser;
use crate::model::{LoginRequest, LoginResponse, User, UserView};
use crate::session::verify_password;
use crate::state::AppState;

pub(crate) async fn find_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let email = email.trim();
    Ok(state
        .store
        .list::<User>()
        .await?
        .into_iter()
        .find(|user| user.email.eq_ignore_ascii_case(email)))
}

/// Exchanges credentials for a session token
///
/// # Request Body
///
/// ```json
/// { "email": "admin@example.com", "password": "..." }
/// ```
///
/// # Response
///
/// - **200 OK** - `{ "accessToken", "tokenType": "Bearer", "expiresAt", "user" }`
/// - **400 Bad Request** - email or password missing
/// - **401 Unauthorized** - unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = payload.password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (non_empty(payload.email), password) else {
        return Err(AppError::validation("email and password are required"));
    };

    let Some(user) = find_by_email(&state, &email).await? else {
        tracing::warn!("login failed: unknown email");
        return Err(AppError::WrongCredentials);
    };
    if !verify_password(&password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "login failed: wrong password");
        return Err(AppError::WrongCredentials);
    }

    let (access_token, expires_at) = state.sessions.issue(&user)?;
    tracing::info!(user_id = user.id, "user signed in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_at,
        user: UserView::from(&user),
    }))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserView> {
    Json(UserView::from(&user))
}
