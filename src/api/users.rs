use axum::extract::State;
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{hash_password, Caller};
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{AppJson, AppPath, AppQuery};
use super::policy::{authorize_user_admin, authorize_user_delete};
use super::response::{ApiResponse, ApiResult};
use super::validation::{validate_password, validate_username};
use crate::db::{
    now_timestamp, CreateUserRequest, PageParams, Pagination, Patch, UpdateUserRequest, User,
    UserListResponse, UserResponse, UserRole, UserWebsiteSummary, UserWithWebsites,
};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn username_conflict() -> ApiError {
    ApiError::conflict("Username is already taken")
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to hash password").with_detail(e.to_string())
    })
}

async fn with_websites(state: &AppState, user: User) -> Result<UserWithWebsites, ApiError> {
    let websites = UserWebsiteSummary::list_for_user(&state.db, user.id).await?;
    Ok(UserWithWebsites {
        user: UserResponse::from(user),
        websites,
    })
}

fn validate_create_request(req: &CreateUserRequest) -> Result<UserRole, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors.check("username", validate_username(req.username.as_deref().unwrap_or("")));
    match req.password.as_deref() {
        None | Some("") => {
            errors.add("password", "Password is required");
        }
        Some(password) => {
            errors.check("password", validate_password(password));
        }
    }

    let role = match req.level_role {
        Some(level) => match UserRole::try_from(level) {
            Ok(role) => role,
            Err(e) => {
                errors.add("levelRole", e);
                UserRole::Standard
            }
        },
        None => UserRole::Standard,
    };

    errors.finish()?;
    Ok(role)
}

/// Runs before any write so a rejected update leaves the row untouched.
fn validate_update_request(req: &UpdateUserRequest) -> Result<Option<UserRole>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    match &req.username {
        Patch::Value(username) => {
            errors.check("username", validate_username(username));
        }
        Patch::Null => {
            errors.add("username", "Username cannot be null");
        }
        Patch::Missing => {}
    }

    match &req.password {
        Patch::Value(password) => {
            errors.check("password", validate_password(password));
        }
        Patch::Null => {
            errors.add("password", "Password cannot be null");
        }
        Patch::Missing => {}
    }

    if req.status.is_null() {
        errors.add("status", "Status cannot be null");
    }

    let mut role = None;
    match &req.level_role {
        Patch::Value(level) => match UserRole::try_from(*level) {
            Ok(r) => role = Some(r),
            Err(e) => {
                errors.add("levelRole", e);
            }
        },
        Patch::Null => {
            errors.add("levelRole", "levelRole cannot be null");
        }
        Patch::Missing => {}
    }

    errors.finish()?;
    Ok(role)
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> ApiResult<UserListResponse> {
    authorize_user_admin(&caller)?;

    let page = PageParams::new(query.page, query.limit, DEFAULT_PAGE_SIZE)
        .map_err(ApiError::bad_request)?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
        .fetch_one(&state.db)
        .await?;

    let rows: Vec<User> = sqlx::query_as(
        r#"
        SELECT * FROM users
        WHERE deleted_at IS NULL
        ORDER BY id ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for user in rows {
        users.push(with_websites(&state, user).await?);
    }

    Ok(ApiResponse::success(
        "User list",
        UserListResponse {
            users,
            pagination: Pagination::new(page, total),
        },
    ))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(id): AppPath<i64>,
) -> ApiResult<UserWithWebsites> {
    authorize_user_admin(&caller)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(
        "User detail",
        with_websites(&state, user).await?,
    ))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppJson(req): AppJson<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    authorize_user_admin(&caller)?;
    let role = validate_create_request(&req)?;

    let username = req.username.unwrap_or_default();
    if User::username_taken(&state.db, &username, None).await? {
        return Err(username_conflict());
    }

    let password_hash = hash(req.password.as_deref().unwrap_or_default())?;
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, status, level_role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(req.status.unwrap_or(true))
    .bind(role.level())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::internal("User disappeared after insert"))?;

    tracing::info!(user_id = id, username = %username, role = %role, "User created");
    Ok(ApiResponse::created("User created", UserResponse::from(user)))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    authorize_user_admin(&caller)?;

    let existing = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let role = validate_update_request(&req)?;

    if let Patch::Value(username) = &req.username {
        if *username != existing.username
            && User::username_taken(&state.db, username, Some(existing.id)).await?
        {
            return Err(username_conflict());
        }
    }

    let password_hash = match &req.password {
        Patch::Value(password) => hash(password)?,
        _ => existing.password_hash.clone(),
    };
    let username = req.username.apply_or(existing.username);
    let status = req.status.apply_or(existing.status);
    let level_role = role.map(|r| r.level()).unwrap_or(existing.level_role);

    sqlx::query(
        r#"
        UPDATE users SET
            username = ?,
            password_hash = ?,
            status = ?,
            level_role = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(status)
    .bind(level_role)
    .bind(now_timestamp())
    .bind(existing.id)
    .execute(&state.db)
    .await?;

    let user = User::find_by_id(&state.db, existing.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(user_id = user.id, "User updated");
    Ok(ApiResponse::success("User updated", UserResponse::from(user)))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppPath(id): AppPath<i64>,
) -> ApiResult<()> {
    authorize_user_delete(&caller, id)?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    User::soft_delete_cascade(&state.db, user.id).await?;

    tracing::info!(user_id = user.id, deleted_by = caller.id, "User deleted");
    Ok(ApiResponse::success("User deleted", ()))
}
