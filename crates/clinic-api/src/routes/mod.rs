//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness / readiness)
//! - `/api/v1/login`, `/api/v1/register` - 인증
//! - `/api/v1/appointments` - 예약 (생성/조회/상태 전환)
//! - `/adsweb/api/v1/users` - 계정 관리
//! - `/adsweb/api/v1/patients`, `/adsweb/api/v1/patient/...` - 환자 관리
//! - `/adsweb/api/v1/dentists` - 치과의사 관리
//! - `/adsweb/api/v1/surgeries` - 클리닉 지점
//! - `/adsweb/api/v1/addresses` - 주소 목록

pub mod appointments;
pub mod auth;
pub mod dentists;
pub mod health;
pub mod patients;
pub mod surgeries;
pub mod users;

pub use appointments::{
    appointments_router, AppointmentsListResponse, CreateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
pub use auth::{
    auth_router, LoginRequest, LoginResponse, LoginUserSummary, RegisterPatientRequest,
};
pub use dentists::{dentists_router, RegisterDentistRequest};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use patients::patients_router;
pub use surgeries::{surgeries_router, SurgeryResponse};
pub use users::{
    users_router, CreateUserRequest, RolesUpdateResponse, UpdateUserRequest, UserResponse,
};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 모든 서브 라우터를 조합하여 하나의 라우터로 반환합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // 헬스 체크 엔드포인트
        .nest("/health", health_router())
        // 인증 및 예약
        .nest("/api/v1", auth_router())
        .nest("/api/v1/appointments", appointments_router())
        // 관리용 엔드포인트
        .nest("/adsweb/api/v1/users", users_router())
        .nest(
            "/adsweb/api/v1",
            patients_router()
                .merge(dentists_router())
                .merge(surgeries_router()),
        )
}
