//! User CRUD request handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::USER_TAG;
use crate::api::dto::{
    CreateUserRequest, ErrorResponse, ListUsersQuery, UpdateUserRequest, UserResponse,
    UserSummaryResponse,
};
use crate::api::middleware::RequestContext;
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::validate::{ValidatedJson, ValidatedQuery};

/// Creates user-related routes.
pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_users, create_user))
        .routes(routes!(get_user, update_user, delete_user))
}

/// GET /api/users - List active users
#[utoipa::path(
    get,
    path = "/",
    tag = USER_TAG,
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Active users ordered by id", body = Vec<UserSummaryResponse>),
        (status = 400, description = "Invalid pagination parameters", body = ErrorResponse)
    )
)]
async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> AppResult<Json<Vec<UserSummaryResponse>>> {
    let users = state
        .services
        .users
        .list_users(ctx.token(), query.limit, query.offset)
        .await?;

    Ok(Json(users.into_iter().map(UserSummaryResponse::from).collect()))
}

/// POST /api/users - Create a new user
#[utoipa::path(
    post,
    path = "/",
    tag = USER_TAG,
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Malformed or invalid body", body = ErrorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse)
    )
)]
async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .services
        .users
        .create_user(ctx.token(), payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users/{id} - Get user by ID
///
/// Soft-deleted users are returned with `deleted_at` set.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = USER_TAG,
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users.get_user(ctx.token(), id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/users/{id} - Update user
///
/// Only the fields present in the body are changed.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = USER_TAG,
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Malformed or invalid body", body = ErrorResponse),
        (status = 404, description = "User not found or deleted", body = ErrorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse)
    )
)]
async fn update_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .users
        .update_user(ctx.token(), id, payload.into())
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/users/{id} - Soft-delete user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = USER_TAG,
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .users
        .delete_user(ctx.token(), id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
