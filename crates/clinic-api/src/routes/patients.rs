//! 환자 관리 endpoint.
//!
//! 환자 프로필 CRUD와 검색, 주소 목록을 제공합니다. 각 작업의 허용 역할
//! 집합은 토큰 클레임의 역할로 검사합니다.
//!
//! # 엔드포인트
//!
//! - `POST /adsweb/api/v1/patients` - 환자 생성 (PATIENT, ADMIN)
//! - `GET /adsweb/api/v1/patients` - 환자 목록 (ADMIN, DENTIST)
//! - `GET /adsweb/api/v1/patient/{id}` - 환자 조회 (ADMIN, DENTIST)
//! - `PUT /adsweb/api/v1/patient/{id}` - 환자 수정 (ADMIN, PATIENT)
//! - `DELETE /adsweb/api/v1/patient/{id}` - 환자 삭제 (ADMIN)
//! - `GET /adsweb/api/v1/patient/search/{s}` - 환자 검색 (ADMIN, DENTIST)
//! - `GET /adsweb/api/v1/addresses` - 주소 목록 (ADMIN)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use clinic_core::{ClinicError, Role};

use crate::auth::{require_role, JwtAuth};
use crate::error::ApiResult;
use crate::repository::{
    AddressRecord, AddressRepository, NewPatient, PatientRecord, PatientRepository, PatientUpdate,
};
use crate::state::AppState;

/// 환자 생성.
///
/// POST /adsweb/api/v1/patients
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Json(payload): Json<NewPatient>,
) -> ApiResult<(StatusCode, Json<PatientRecord>)> {
    require_role(&[Role::Patient, Role::Admin], &claims)?;

    let patient = PatientRepository::create(&state.db_pool, payload).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// 환자 목록 조회.
///
/// GET /adsweb/api/v1/patients
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
) -> ApiResult<Json<Vec<PatientRecord>>> {
    require_role(&[Role::Admin, Role::Dentist], &claims)?;

    let patients = PatientRepository::list(&state.db_pool).await?;
    Ok(Json(patients))
}

/// 환자 조회.
///
/// GET /adsweb/api/v1/patient/{id}
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Path(id): Path<i64>,
) -> ApiResult<Json<PatientRecord>> {
    require_role(&[Role::Admin, Role::Dentist], &claims)?;

    let patient = PatientRepository::find_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("Patient with id {} not found", id)))?;

    Ok(Json(patient))
}

/// 환자 수정.
///
/// PUT /adsweb/api/v1/patient/{id}
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Path(id): Path<i64>,
    Json(payload): Json<PatientUpdate>,
) -> ApiResult<Json<PatientRecord>> {
    require_role(&[Role::Admin, Role::Patient], &claims)?;

    let patient = PatientRepository::update(&state.db_pool, id, payload).await?;
    Ok(Json(patient))
}

/// 환자 삭제.
///
/// DELETE /adsweb/api/v1/patient/{id}
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    require_role(&[Role::Admin], &claims)?;

    PatientRepository::delete(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 환자 검색.
///
/// GET /adsweb/api/v1/patient/search/{search_string}
pub async fn search_patient(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Path(search_string): Path<String>,
) -> ApiResult<Json<Vec<PatientRecord>>> {
    require_role(&[Role::Admin, Role::Dentist], &claims)?;

    let patients = PatientRepository::search(&state.db_pool, &search_string).await?;
    Ok(Json(patients))
}

/// 주소 목록 조회.
///
/// GET /adsweb/api/v1/addresses
pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
) -> ApiResult<Json<Vec<AddressRecord>>> {
    require_role(&[Role::Admin], &claims)?;

    let addresses = AddressRepository::list(&state.db_pool).await?;
    Ok(Json(addresses))
}

/// 환자 관리 라우터 생성.
pub fn patients_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/patients", post(create_patient).get(list_patients))
        .route(
            "/patient/{id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patient/search/{search_string}", get(search_patient))
        .route("/addresses", get(list_addresses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_token, Claims};
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app_with_state() -> (Router, String) {
        let state = create_test_state();
        let secret = state.auth.secret.clone();
        let router = patients_router().with_state(Arc::new(state));
        (router, secret)
    }

    #[tokio::test]
    async fn test_list_patients_requires_token() {
        let (app, _) = app_with_state();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/patients")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_patients_forbidden_for_patient_role() {
        let (app, secret) = app_with_state();
        let claims = Claims::new("gwhite@mail.com", Some("PATIENT".to_string()), 60);
        let token = create_token(&claims, &secret).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/patients")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_patient_forbidden_for_dentist_role() {
        let (app, secret) = app_with_state();
        let claims = Claims::new("tsmith@ads.com", Some("DENTIST".to_string()), 60);
        let token = create_token(&claims, &secret).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/patient/3")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_addresses_forbidden_for_dentist_role() {
        let (app, secret) = app_with_state();
        let claims = Claims::new("tsmith@ads.com", Some("DENTIST".to_string()), 60);
        let token = create_token(&claims, &secret).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/addresses")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
