//! User management API handlers
//!
//! Listing and deletion are admin-only; a user may read and edit their
//! own account. Delegates to `UserService`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{ListUsersParams, UpdateUserRequest, UserDto};
use crate::application::UserService;
use crate::domain::GetUserDto;
use crate::interfaces::http::common::{
    api_error, ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = ApiResponse<PaginatedResponse<UserDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<PaginatedResponse<UserDto>> {
    caller.require_admin()?;

    let result = state
        .user_service
        .list_users(GetUserDto {
            search: params.search,
            page: Some(params.page),
            page_size: Some(params.page_size),
        })
        .await?;

    let items: Vec<UserDto> = result.items.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items,
        result.total,
        result.page,
        result.limit,
        result.total_pages,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<UserDto> {
    if !caller.can_access(&id) {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "You are not authorized to view this user",
        ));
    }
    let user = state.user_service.get_user(&id).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserDto> {
    let actor = state.user_service.get_user(&caller.user_id).await?;
    let user = state
        .user_service
        .update_user(
            &actor,
            &id,
            request.name.as_deref(),
            request.email.as_deref(),
            request.password.as_deref(),
        )
        .await?;

    Ok(Json(
        ApiResponse::success(UserDto::from(user)).with_message("User updated successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    caller.require_admin()?;
    state.user_service.delete_user(&id).await?;
    Ok(Json(ApiResponse::ok("User deleted successfully")))
}
