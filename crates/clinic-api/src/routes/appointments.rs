//! 예약 endpoint.
//!
//! 예약 생성과 역할 범위 조회, 상태 전환을 제공합니다.
//!
//! # 엔드포인트
//!
//! - `POST /api/v1/appointments` - 예약 생성 (환자 전용)
//! - `GET /api/v1/appointments` - 역할 범위 예약 조회
//! - `PATCH /api/v1/appointments/{id}/status` - 상태 전환 (ADMIN, DENTIST)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use clinic_core::{
    visibility_scope, AppointmentStatus, ClinicError, Role, VisibilityScope,
};

use crate::auth::{require_role, CurrentUser, JwtAuth, RequirePatient};
use crate::error::ApiResult;
use crate::metrics::record_booking;
use crate::repository::{
    AppointmentRecord, AppointmentRepository, DentistRepository, NewAppointment,
    PatientRepository,
};
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 예약 생성 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    pub dentist_id: i64,
    pub surgery_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

/// 예약 상태 전환 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

/// 예약 목록 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentsListResponse {
    pub appointments: Vec<AppointmentRecord>,
    pub total: usize,
}

// ==================== Handler ====================

/// 예약 생성 (환자 전용).
///
/// POST /api/v1/appointments
///
/// 호출자의 계정에 연결된 환자 프로필로 예약합니다. 슬롯 유일성은
/// 스토리지 제약이 판정하므로 동시 요청 중 정확히 하나만 성공합니다.
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    tag = "appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "예약 생성됨", body = AppointmentRecord),
        (status = 404, description = "환자 프로필 또는 참조 대상 없음", body = crate::error::ApiErrorResponse),
        (status = 409, description = "슬롯 중복", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    RequirePatient(user): RequirePatient,
    Json(payload): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<AppointmentRecord>)> {
    let patient = PatientRepository::find_by_user_id(&state.db_pool, user.user.id)
        .await?
        .ok_or_else(|| ClinicError::ProfileNotFound("Patient profile not found".to_string()))?;

    let result = AppointmentRepository::book(
        &state.db_pool,
        NewAppointment {
            dentist_id: payload.dentist_id,
            surgery_id: payload.surgery_id,
            patient_id: patient.id,
            appointment_date: payload.appointment_date,
            appointment_time: payload.appointment_time,
        },
    )
    .await;

    match result {
        Ok(appointment) => {
            record_booking("booked");
            Ok((StatusCode::CREATED, Json(appointment)))
        }
        Err(e) => {
            if matches!(e, ClinicError::SlotConflict(_)) {
                record_booking("conflict");
            }
            Err(e.into())
        }
    }
}

/// 역할 범위 예약 조회.
///
/// GET /api/v1/appointments
///
/// ADMIN은 전체, DENTIST는 본인 담당, PATIENT는 본인 예약만 봅니다.
/// 역할 판정은 ADMIN → DENTIST → PATIENT 순서입니다.
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    tag = "appointments",
    responses(
        (status = 200, description = "호출자에게 보이는 예약 목록", body = AppointmentsListResponse),
        (status = 403, description = "역할 없음", body = crate::error::ApiErrorResponse),
        (status = 404, description = "연결된 프로필 없음", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<AppointmentsListResponse>> {
    let appointments = match visibility_scope(&user) {
        Some(VisibilityScope::All) => AppointmentRepository::list_all(&state.db_pool).await?,
        Some(VisibilityScope::OwnDentist) => {
            let dentist = DentistRepository::find_by_user_id(&state.db_pool, user.user.id)
                .await?
                .ok_or_else(|| {
                    ClinicError::ProfileNotFound("Dentist profile not found".to_string())
                })?;
            AppointmentRepository::list_by_dentist(&state.db_pool, dentist.id).await?
        }
        Some(VisibilityScope::OwnPatient) => {
            let patient = PatientRepository::find_by_user_id(&state.db_pool, user.user.id)
                .await?
                .ok_or_else(|| {
                    ClinicError::ProfileNotFound("Patient profile not found".to_string())
                })?;
            AppointmentRepository::list_by_patient(&state.db_pool, patient.id).await?
        }
        None => {
            return Err(ClinicError::Forbidden(
                "You do not have permission to access this resource.".to_string(),
            )
            .into())
        }
    };

    let total = appointments.len();
    Ok(Json(AppointmentsListResponse {
        appointments,
        total,
    }))
}

/// 예약 상태 전환.
///
/// PATCH /api/v1/appointments/{id}/status
///
/// BOOKED 상태의 예약만 CANCELLED 또는 COMPLETED로 전환됩니다.
#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{id}/status",
    tag = "appointments",
    params(("id" = i64, Path, description = "예약 ID")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, description = "전환됨", body = AppointmentRecord),
        (status = 400, description = "허용되지 않는 전환", body = crate::error::ApiErrorResponse),
        (status = 404, description = "예약 없음", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAppointmentStatusRequest>,
) -> ApiResult<Json<AppointmentRecord>> {
    require_role(&[Role::Admin, Role::Dentist], &claims)?;

    let appointment =
        AppointmentRepository::update_status(&state.db_pool, id, payload.status).await?;

    Ok(Json(appointment))
}

/// 예약 라우터 생성.
pub fn appointments_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/{id}/status", patch(update_appointment_status))
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
        let router = appointments_router().with_state(Arc::new(state));
        (router, secret)
    }

    #[tokio::test]
    async fn test_list_appointments_requires_token() {
        let (app, _) = app_with_state();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_appointment_requires_token() {
        let (app, _) = app_with_state();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"dentist_id": 1, "surgery_id": 1, "appointment_date": "2024-01-10", "appointment_time": "09:00:00"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_status_forbidden_for_patient_claim() {
        let (app, secret) = app_with_state();
        let claims = Claims::new("gwhite@mail.com", Some("PATIENT".to_string()), 60);
        let token = create_token(&claims, &secret).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/5/status")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::from(r#"{"status": "CANCELLED"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let (app, secret) = app_with_state();
        let claims = Claims::new("gwhite@mail.com", Some("PATIENT".to_string()), -5);
        let token = create_token(&claims, &secret).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
