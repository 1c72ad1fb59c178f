//! 치과 클리닉 관리 시스템의 핵심 도메인 크레이트.
//!
//! API 크레이트에서 공유하는 타입들을 제공합니다:
//! - [`domain`]: 역할(RBAC), 예약 상태 등 도메인 타입
//! - [`error`]: 시스템 전역 에러 분류
//! - [`config`]: 애플리케이션 설정
//! - [`logging`]: tracing 기반 로깅 초기화
//!
//! # Feature Flags
//!
//! - `sqlx-support`: 도메인 타입에 sqlx 매핑 derive 추가
//! - `utoipa-support`: 도메인 타입에 OpenAPI 스키마 derive 추가

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::{AppConfig, AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig};
pub use domain::{
    visibility_scope, AppointmentStatus, Role, RoleBearer, Slot, VisibilityScope,
};
pub use error::{ClinicError, ClinicResult};
pub use logging::{init_logging, init_logging_from_env, LogConfig, LogFormat};
