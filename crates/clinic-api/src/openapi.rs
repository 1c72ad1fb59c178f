//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 문서화할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiErrorResponse;
use crate::repository::{AppointmentRecord, NewAddress, PatientRecord};
use crate::routes::{
    AppointmentsListResponse, ComponentHealth, ComponentStatus, CreateAppointmentRequest,
    HealthResponse, LoginRequest, LoginResponse, LoginUserSummary, RegisterPatientRequest,
    UpdateAppointmentStatusRequest,
};
use clinic_core::{AppointmentStatus, Role};

/// Clinic API 문서.
///
/// 인증이 필요한 엔드포인트는 `Authorization: Bearer <token>` 헤더를
/// 요구합니다. 토큰은 `POST /api/v1/login`으로 발급받습니다.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dental Clinic API",
        version = "0.1.0",
        description = "환자/치과의사/지점/예약 관리를 위한 REST API",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 로그인 및 환자 등록"),
        (name = "appointments", description = "예약 - 생성/조회/상태 전환")
    ),
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Common =====
            ApiErrorResponse,
            Role,
            AppointmentStatus,

            // ===== Auth =====
            LoginRequest,
            LoginResponse,
            LoginUserSummary,
            RegisterPatientRequest,
            NewAddress,
            PatientRecord,

            // ===== Appointments =====
            AppointmentRecord,
            AppointmentsListResponse,
            CreateAppointmentRequest,
            UpdateAppointmentStatusRequest,
        )
    ),
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Auth =====
        crate::routes::auth::login,
        crate::routes::auth::register_patient,

        // ===== Appointments =====
        crate::routes::appointments::create_appointment,
        crate::routes::appointments::list_appointments,
        crate::routes::appointments::update_appointment_status,
    )
)]
pub struct ApiDoc;

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
