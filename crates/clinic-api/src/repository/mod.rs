//! Repository pattern for database operations.
//!
//! 데이터베이스 접근 로직을 라우트 핸들러에서 분리하여 관리합니다.
//! 모든 Repository는 static methods 패턴을 사용하며, 여러 단계의 쓰기는
//! 하나의 트랜잭션으로 묶어 중간 실패 시 전체를 롤백합니다.

pub mod addresses;
pub mod appointments;
pub mod bootstrap;
pub mod dentists;
pub mod patients;
pub mod surgeries;
pub mod users;

pub use addresses::{AddressRecord, AddressRepository, NewAddress};
pub use appointments::{AppointmentRecord, AppointmentRepository, NewAppointment};
pub use bootstrap::{init_schema, seed_roles, seed_sample_data};
pub use dentists::{DentistRecord, DentistRepository, RegisterDentist};
pub use patients::{NewPatient, PatientRecord, PatientRepository, PatientUpdate};
pub use surgeries::{SurgeryRecord, SurgeryRepository, SurgeryWithAddress};
pub use users::{
    NewUser, RegisterPatient, UserRecord, UserRepository, UserUpdate, UserWithRoles,
};

use clinic_core::ClinicError;

/// sqlx 에러를 도메인 에러로 변환합니다.
pub(crate) fn db_err(e: sqlx::Error) -> ClinicError {
    ClinicError::Database(e.to_string())
}

/// 유니크 제약 위반(23505)이면 위반된 제약/인덱스 이름을 반환합니다.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db) = e {
        if db.code().as_deref() == Some("23505") {
            return Some(db.constraint().unwrap_or_default().to_string());
        }
    }
    None
}

/// 외래 키 위반(23503)이면 위반된 제약 이름을 반환합니다.
pub(crate) fn foreign_key_violation(e: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db) = e {
        if db.code().as_deref() == Some("23503") {
            return Some(db.constraint().unwrap_or_default().to_string());
        }
    }
    None
}
