use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ChangePasswordRequest, CreateUserRequest, PublicUser, UpdateUserRequest, UserListData},
    error::UserError,
    pagination::PageQuery,
};
use crate::{
    auth::jwt::AuthUser,
    response::{ApiError, ApiResponse},
    state::AppState,
};

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/getlist", get(list_users))
        .route("/getdetail/:id", get(get_user))
        .route("/add", post(create_user))
        .route("/update/:id", put(update_user))
        .route("/changepw/:id", put(change_password))
        .route("/delete/:id", delete(delete_user))
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        let status = match &err {
            UserError::TimedOut => StatusCode::REQUEST_TIMEOUT,
            UserError::EmailExists | UserError::PhoneExists => StatusCode::CONFLICT,
            UserError::IncompleteRequest | UserError::InvalidEmail => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Internal(e) => {
                error!(error = ?e, "internal error");
                return ApiError::internal();
            }
        };
        warn!(%status, reason = %err, "request failed");
        ApiError::new(status, err.to_string())
    }
}

/// A path id that is not a UUID cannot name any row.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| UserError::NotFound.into())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(v)) => Ok(v),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable request body");
            Err(UserError::IncompleteRequest.into())
        }
    }
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<UserListData> {
    let page = query.resolve();
    let result = state.users.list(page).await?;
    info!(page = page.page, limit = page.limit, total = result.total, "listed users");
    let data = UserListData {
        total_users: result.total,
        total_pages: page.total_pages(result.total),
        current_page: page.page,
        users: result.rows.into_iter().map(PublicUser::from).collect(),
    };
    Ok(ApiResponse::ok(
        format!("Success get all user in page {} and limit {}", page.page, page.limit),
        data,
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<PublicUser> {
    let id = parse_id(&raw_id)?;
    let user = state.users.get(id).await?.ok_or(UserError::NotFound)?;
    Ok(ApiResponse::ok(
        format!("Success get detail user with {id}"),
        PublicUser::from(user),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<PublicUser> {
    let input = body(payload)?.validate()?;
    let user = state.users.create(input).await?;
    Ok(ApiResponse::created("Success created user", PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<PublicUser> {
    let id = parse_id(&raw_id)?;
    let changes = body(payload)?.into_changes()?;
    let user = state.users.update(id, changes).await?;
    info!(%caller, user_id = %id, "update handled");
    Ok(ApiResponse::ok(
        format!("Success update user with {id}"),
        PublicUser::from(user),
    ))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(raw_id): Path<String>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<()> {
    let id = parse_id(&raw_id)?;
    let password = body(payload)?
        .password
        .filter(|p| !p.is_empty())
        .ok_or(UserError::IncompleteRequest)?;
    let message = state.users.change_password(id, &password).await?;
    info!(%caller, user_id = %id, "password change handled");
    Ok(ApiResponse::message(message))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(raw_id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&raw_id)?;
    let message = state.users.delete(id).await?;
    info!(%caller, user_id = %id, "delete handled");
    Ok(ApiResponse::message(message))
}
