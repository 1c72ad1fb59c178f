//! 클리닉 도메인 타입.
//!
//! 역할(RBAC)과 예약 관련 타입을 정의합니다.

mod appointment;
mod role;

pub use appointment::{visibility_scope, AppointmentStatus, Slot, VisibilityScope};
pub use role::{Role, RoleBearer};
