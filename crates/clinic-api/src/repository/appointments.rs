//! Appointment Repository
//!
//! 예약에 대한 데이터베이스 연산을 담당합니다. 슬롯 유일성
//! (치과의사, 날짜, 시각)은 애플리케이션 사전 검사가 아니라
//! `uq_dentist_slot` 부분 유니크 인덱스가 원자적으로 보장합니다.
//! 동시 예약 시 정확히 한 건만 삽입되고 나머지는 제약 위반으로
//! `SlotConflict`가 됩니다.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

use clinic_core::{AppointmentStatus, ClinicError, ClinicResult, Slot};

use super::{db_err, foreign_key_violation, unique_violation};

// ================================================================================================
// Types
// ================================================================================================

/// 예약 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AppointmentRecord {
    pub id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub patient_id: i64,
    pub dentist_id: i64,
    pub surgery_id: i64,
}

/// 새 예약 입력.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub dentist_id: i64,
    pub surgery_id: i64,
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

impl NewAppointment {
    fn slot(&self) -> Slot {
        Slot {
            dentist_id: self.dentist_id,
            date: self.appointment_date,
            time: self.appointment_time,
        }
    }
}

// ================================================================================================
// Repository
// ================================================================================================

/// Appointment Repository
pub struct AppointmentRepository;

impl AppointmentRepository {
    /// 예약 생성.
    ///
    /// 같은 슬롯에 취소되지 않은 예약이 이미 있으면 `SlotConflict`,
    /// 참조 대상(환자/치과의사/지점)이 없으면 `NotFound`를 반환합니다.
    pub async fn book(pool: &PgPool, input: NewAppointment) -> ClinicResult<AppointmentRecord> {
        sqlx::query_as::<_, AppointmentRecord>(
            r#"
            INSERT INTO appointments
                (appointment_date, appointment_time, status, patient_id, dentist_id, surgery_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(input.appointment_date)
        .bind(input.appointment_time)
        .bind(AppointmentStatus::Booked)
        .bind(input.patient_id)
        .bind(input.dentist_id)
        .bind(input.surgery_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Self::map_booking_error(e, &input))
    }

    /// 슬롯 점유 여부 확인.
    ///
    /// 취소된 예약은 슬롯을 점유하지 않습니다. 예약 경로는 이 검사에
    /// 의존하지 않으며, 상태 조회 용도로만 제공됩니다.
    pub async fn slot_taken(pool: &PgPool, slot: Slot) -> ClinicResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE dentist_id = $1
                  AND appointment_date = $2
                  AND appointment_time = $3
                  AND status <> 'CANCELLED'
            )
            "#,
        )
        .bind(slot.dentist_id)
        .bind(slot.date)
        .bind(slot.time)
        .fetch_one(pool)
        .await
        .map_err(db_err)
    }

    /// 전체 예약 목록.
    pub async fn list_all(pool: &PgPool) -> ClinicResult<Vec<AppointmentRecord>> {
        sqlx::query_as::<_, AppointmentRecord>(
            "SELECT * FROM appointments ORDER BY appointment_date, appointment_time, id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)
    }

    /// 특정 치과의사의 예약 목록.
    pub async fn list_by_dentist(
        pool: &PgPool,
        dentist_id: i64,
    ) -> ClinicResult<Vec<AppointmentRecord>> {
        sqlx::query_as::<_, AppointmentRecord>(
            r#"
            SELECT * FROM appointments
            WHERE dentist_id = $1
            ORDER BY appointment_date, appointment_time, id
            "#,
        )
        .bind(dentist_id)
        .fetch_all(pool)
        .await
        .map_err(db_err)
    }

    /// 특정 환자의 예약 목록.
    pub async fn list_by_patient(
        pool: &PgPool,
        patient_id: i64,
    ) -> ClinicResult<Vec<AppointmentRecord>> {
        sqlx::query_as::<_, AppointmentRecord>(
            r#"
            SELECT * FROM appointments
            WHERE patient_id = $1
            ORDER BY appointment_date, appointment_time, id
            "#,
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await
        .map_err(db_err)
    }

    /// ID로 예약 조회.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> ClinicResult<Option<AppointmentRecord>> {
        sqlx::query_as::<_, AppointmentRecord>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }

    /// 예약 상태 전환.
    ///
    /// BOOKED 상태의 예약만 CANCELLED 또는 COMPLETED로 전환할 수 있습니다.
    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: AppointmentStatus,
    ) -> ClinicResult<AppointmentRecord> {
        if status == AppointmentStatus::Booked {
            return Err(ClinicError::Validation(
                "appointments cannot be moved back to BOOKED".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, AppointmentRecord>(
            r#"
            UPDATE appointments
            SET status = $2
            WHERE id = $1 AND status = 'BOOKED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
        .map_err(db_err)?;

        match updated {
            Some(appointment) => Ok(appointment),
            None => match Self::find_by_id(pool, id).await? {
                Some(existing) => Err(ClinicError::Validation(format!(
                    "appointment {} is already {}",
                    id, existing.status
                ))),
                None => Err(ClinicError::NotFound(format!(
                    "Appointment with id {} not found",
                    id
                ))),
            },
        }
    }

    /// 예약 삽입 실패를 도메인 에러로 변환합니다.
    fn map_booking_error(e: sqlx::Error, input: &NewAppointment) -> ClinicError {
        if let Some(constraint) = unique_violation(&e) {
            if constraint == "uq_dentist_slot" {
                return ClinicError::SlotConflict(input.slot().to_string());
            }
        }

        if let Some(constraint) = foreign_key_violation(&e) {
            let entity = if constraint.contains("dentist") {
                format!("Dentist with id {} not found", input.dentist_id)
            } else if constraint.contains("patient") {
                format!("Patient with id {} not found", input.patient_id)
            } else if constraint.contains("surgery") {
                format!("Surgery with id {} not found", input.surgery_id)
            } else {
                "Referenced entity not found".to_string()
            };
            return ClinicError::NotFound(entity);
        }

        db_err(e)
    }
}
