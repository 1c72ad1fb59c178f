//! 인증 endpoint.
//!
//! 로그인과 환자 자가 등록을 제공합니다.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/login` - 이메일/비밀번호 로그인, Bearer 토큰 발급
//! - `POST /api/v1/register` - 환자 자가 등록 (계정 + PATIENT 역할 + 프로필)

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use clinic_core::ClinicError;

use crate::auth::{create_token, hash_password, verify_password, Claims};
use crate::error::ApiResult;
use crate::repository::users::{RegisterPatient, UserRepository, UserWithRoles};
use crate::repository::{NewAddress, PatientRecord};
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 로그인 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// 계정 이메일
    #[validate(email)]
    pub email: String,
    /// 비밀번호
    #[validate(length(min = 1))]
    pub password: String,
}

/// 로그인 응답의 사용자 요약.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginUserSummary {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer 토큰
    pub access_token: String,
    /// 토큰 타입 (항상 "bearer")
    pub token_type: String,
    /// 로그인한 사용자 요약
    pub user: LoginUserSummary,
}

/// 환자 자가 등록 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterPatientRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    pub address: Option<NewAddress>,
}

// ==================== Handler ====================

/// 로그인.
///
/// POST /api/v1/login
///
/// 이메일 없음, 비밀번호 불일치, 해석 불가능한 저장 해시는 모두 동일한
/// 401 응답을 만듭니다.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = LoginResponse),
        (status = 401, description = "자격 증명 불일치", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    payload.validate()?;

    let user = UserRepository::find_by_email(&state.db_pool, &payload.email).await?;

    let user = match user {
        Some(user) if user.user.enabled => user,
        _ => return Err(invalid_credentials()),
    };

    if verify_password(&payload.password, &user.user.password_hash).is_err() {
        return Err(invalid_credentials());
    }

    let token = issue_token(&state, &user)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: LoginUserSummary {
            id: user.user.id,
            email: user.user.email,
            username: user.user.username,
            roles: user.roles,
        },
    }))
}

/// 환자 자가 등록.
///
/// POST /api/v1/register
#[utoipa::path(
    post,
    path = "/api/v1/register",
    tag = "auth",
    request_body = RegisterPatientRequest,
    responses(
        (status = 201, description = "등록 성공", body = PatientRecord),
        (status = 409, description = "이메일/사용자명 중복", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPatientRequest>,
) -> ApiResult<(StatusCode, Json<PatientRecord>)> {
    payload.validate()?;

    // 사용자명은 이메일의 로컬 파트에서 파생
    let username = payload
        .email
        .split('@')
        .next()
        .unwrap_or(payload.email.as_str())
        .to_string();

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ClinicError::Internal(e.to_string()))?;

    let patient = UserRepository::register_patient(
        &state.db_pool,
        RegisterPatient {
            username,
            email: payload.email,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            address: payload.address,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

fn invalid_credentials() -> crate::error::ApiError {
    ClinicError::Unauthenticated("Invalid credentials".to_string()).into()
}

/// 계정의 primary 역할로 토큰을 발급합니다.
fn issue_token(state: &AppState, user: &UserWithRoles) -> ApiResult<String> {
    let role = user.roles.first().cloned();
    let claims = Claims::new(
        &user.user.email,
        role,
        state.auth.access_token_expire_minutes,
    );

    create_token(&claims, &state.auth.secret)
        .map_err(|e| ClinicError::Internal(e.to_string()).into())
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register_patient))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn auth_app() -> Router {
        Router::new()
            .route("/login", post(login))
            .with_state(Arc::new(create_test_state()))
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let response = auth_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email": "not-an-email", "password": "pw"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_password() {
        let response = auth_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email": "a@b.com", "password": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_issue_token_uses_first_role() {
        use crate::auth::decode_token;
        use crate::repository::users::UserRecord;

        let state = create_test_state();
        let user = UserWithRoles {
            user: UserRecord {
                id: 1,
                username: "gwhite".to_string(),
                email: "gwhite@mail.com".to_string(),
                password_hash: String::new(),
                enabled: true,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            roles: vec!["PATIENT".to_string()],
        };

        let token = issue_token(&state, &user).unwrap();
        let decoded = decode_token(&token, &state.auth.secret).unwrap();
        assert_eq!(decoded.claims.sub, "gwhite@mail.com");
        assert_eq!(decoded.claims.role.as_deref(), Some("PATIENT"));
    }
}
