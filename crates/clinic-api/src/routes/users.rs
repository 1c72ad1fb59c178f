//! 계정 관리 endpoint.
//!
//! 관리용 계정 CRUD와 역할 일괄 교체를 제공합니다.
//!
//! # 엔드포인트
//!
//! - `POST /adsweb/api/v1/users` - 계정 생성 (역할 지정)
//! - `GET /adsweb/api/v1/users` - 계정 목록
//! - `GET /adsweb/api/v1/users/{id}` - 계정 조회
//! - `PUT /adsweb/api/v1/users/{id}` - 계정 수정
//! - `DELETE /adsweb/api/v1/users/{id}` - 계정 삭제
//! - `PUT /adsweb/api/v1/users/{id}/roles` - 역할 일괄 교체

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use clinic_core::{ClinicError, Role, RoleBearer};

use crate::auth::hash_password;
use crate::error::ApiResult;
use crate::repository::users::{NewUser, UserRepository, UserUpdate, UserWithRoles};
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 계정 생성 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub role: Role,
}

/// 계정 수정 요청. 생략된 필드는 유지됩니다.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// 계정 응답. primary 역할 하나만 노출합니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: Option<Role>,
}

impl From<&UserWithRoles> for UserResponse {
    fn from(user: &UserWithRoles) -> Self {
        Self {
            id: user.user.id,
            email: user.user.email.clone(),
            username: user.user.username.clone(),
            role: user.primary_role(),
        }
    }
}

/// 역할 교체 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RolesUpdateResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

// ==================== Handler ====================

/// 계정 생성.
///
/// POST /adsweb/api/v1/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ClinicError::Internal(e.to_string()))?;

    let user = UserRepository::create(
        &state.db_pool,
        NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
        },
        payload.role,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// 계정 목록 조회.
///
/// GET /adsweb/api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = UserRepository::list(&state.db_pool).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// 계정 조회.
///
/// GET /adsweb/api/v1/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = UserRepository::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| ClinicError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&user)))
}

/// 계정 수정.
///
/// PUT /adsweb/api/v1/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let password_hash = match &payload.password {
        Some(password) if !password.is_empty() => Some(
            hash_password(password).map_err(|e| ClinicError::Internal(e.to_string()))?,
        ),
        _ => None,
    };

    let user = UserRepository::update(
        &state.db_pool,
        id,
        UserUpdate {
            username: payload.username,
            email: payload.email,
            password_hash,
            enabled: payload.enabled,
            role: payload.role,
        },
    )
    .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// 계정 삭제.
///
/// DELETE /adsweb/api/v1/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    UserRepository::delete(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 역할 일괄 교체.
///
/// PUT /adsweb/api/v1/users/{id}/roles
pub async fn update_user_roles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(roles): Json<Vec<String>>,
) -> ApiResult<Json<RolesUpdateResponse>> {
    let user = UserRepository::set_roles(&state.db_pool, id, &roles).await?;

    Ok(Json(RolesUpdateResponse {
        id: user.user.id,
        username: user.user.username,
        email: user.user.email,
        roles: user.roles,
    }))
}

/// 계정 관리 라우터 생성.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/{id}/roles", put(update_user_roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::users::UserRecord;
    use chrono::Utc;

    fn sample_user(roles: Vec<&str>) -> UserWithRoles {
        UserWithRoles {
            user: UserRecord {
                id: 7,
                username: "tsmith".to_string(),
                email: "tsmith@ads.com".to_string(),
                password_hash: String::new(),
                enabled: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            roles: roles.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_user_response_maps_primary_role() {
        let response = UserResponse::from(&sample_user(vec!["DENTIST", "PATIENT"]));
        assert_eq!(response.role, Some(Role::Dentist));
    }

    #[test]
    fn test_user_response_without_roles() {
        let response = UserResponse::from(&sample_user(vec![]));
        assert_eq!(response.role, None);
    }

    #[test]
    fn test_user_response_ignores_unknown_role_names() {
        let response = UserResponse::from(&sample_user(vec!["receptionist", "ADMIN"]));
        assert_eq!(response.role, Some(Role::Admin));
    }
}
