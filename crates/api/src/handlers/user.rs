//! Handlers for the `/users` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;
use coursemart_core::error::CoreError;
use coursemart_core::roles;
use coursemart_db::models::user::CreateUser;
use coursemart_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/me
pub async fn me(user: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let profile = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }))?;
    Ok(Json(DataResponse { data: profile }))
}

/// POST /api/v1/users
///
/// Admin-only provisioning. Sign-up flows live outside this service.
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(role) = &input.role {
        roles::validate_role(role).map_err(AppError::BadRequest)?;
    }

    let user = UserRepo::create(&state.pool, &input).await?;
    tracing::info!(user_id = user.id, role = %user.role, created_by = admin.user_id, "User created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}
