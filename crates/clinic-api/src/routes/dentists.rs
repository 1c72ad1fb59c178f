//! 치과의사 관리 endpoint.
//!
//! # 엔드포인트
//!
//! - `POST /adsweb/api/v1/dentists/register` - 치과의사 등록
//! - `GET /adsweb/api/v1/dentists` - 치과의사 목록

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use clinic_core::ClinicError;

use crate::auth::hash_password;
use crate::error::ApiResult;
use crate::repository::{DentistRecord, DentistRepository, RegisterDentist};
use crate::state::AppState;

/// 치과의사 등록 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterDentistRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub surgery_id: Option<i64>,
}

/// 치과의사 등록.
///
/// POST /adsweb/api/v1/dentists/register
///
/// 계정 + DENTIST 역할 + 프로필을 하나의 트랜잭션으로 생성합니다.
pub async fn register_dentist(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDentistRequest>,
) -> ApiResult<(StatusCode, Json<DentistRecord>)> {
    payload.validate()?;

    let username = payload
        .email
        .split('@')
        .next()
        .unwrap_or(payload.email.as_str())
        .to_string();

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ClinicError::Internal(e.to_string()))?;

    let dentist = DentistRepository::register(
        &state.db_pool,
        RegisterDentist {
            username,
            email: payload.email,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            specialization: payload.specialization,
            surgery_id: payload.surgery_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(dentist)))
}

/// 치과의사 목록 조회.
///
/// GET /adsweb/api/v1/dentists
pub async fn list_dentists(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DentistRecord>>> {
    let dentists = DentistRepository::list(&state.db_pool).await?;
    Ok(Json(dentists))
}

/// 치과의사 라우터 생성.
pub fn dentists_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dentists", get(list_dentists))
        .route("/dentists/register", post(register_dentist))
}
