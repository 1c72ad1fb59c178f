//! 예약 도메인 타입.
//!
//! 예약 상태, 슬롯 식별, 역할별 조회 범위를 정의합니다.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::role::{Role, RoleBearer};

/// 예약 상태.
///
/// 예약은 `Booked`로 생성되고, 명시적 전환으로만 `Cancelled` 또는
/// `Completed`가 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx-support",
    sqlx(type_name = "appointment_status", rename_all = "UPPERCASE")
)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// DB에 저장되는 대문자 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "BOOKED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    /// 종결 상태 여부. 종결된 예약은 더 이상 전환되지 않습니다.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 예약 슬롯. 치과의사별 유일성의 단위입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub dentist_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dentist {} @ {} {}", self.dentist_id, self.date, self.time)
    }
}

/// 역할에 따른 예약 조회 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// 전체 예약
    All,
    /// 본인 치과의사 프로필에 연결된 예약
    OwnDentist,
    /// 본인 환자 프로필에 연결된 예약
    OwnPatient,
}

/// 호출자의 역할에서 조회 범위를 결정합니다.
///
/// ADMIN → DENTIST → PATIENT 순서로 판정하며, 여러 역할을 보유한 경우
/// 먼저 일치한 역할이 우선합니다. 어떤 역할도 없으면 `None`입니다.
pub fn visibility_scope(bearer: &dyn RoleBearer) -> Option<VisibilityScope> {
    if bearer.holds(Role::Admin) {
        Some(VisibilityScope::All)
    } else if bearer.holds(Role::Dentist) {
        Some(VisibilityScope::OwnDentist)
    } else if bearer.holds(Role::Patient) {
        Some(VisibilityScope::OwnPatient)
    } else {
        None
    }
}
