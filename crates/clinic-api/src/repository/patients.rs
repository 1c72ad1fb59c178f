//! Patient Repository
//!
//! 환자 프로필에 대한 데이터베이스 연산을 담당합니다. 프로필은 계정보다
//! 먼저 존재할 수 있으며(관리자 생성), `user_id` 역참조로 계정과
//! 연결됩니다.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

use clinic_core::{ClinicError, ClinicResult};

use super::addresses::{AddressRepository, NewAddress};
use super::{db_err, unique_violation};

// ================================================================================================
// Types
// ================================================================================================

/// 환자 프로필 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PatientRecord {
    pub id: i64,
    #[sqlx(default)]
    pub user_id: Option<i64>,
    pub patient_no: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(default)]
    pub phone: Option<String>,
    #[sqlx(default)]
    pub email: Option<String>,
    #[sqlx(default)]
    pub address_id: Option<i64>,
}

/// 새 환자 프로필 입력 (관리자/환자 생성).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPatient {
    /// 환자 번호. 생략하면 자동 발번됩니다.
    #[serde(default)]
    pub patient_no: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub address: Option<NewAddress>,
}

/// 환자 프로필 업데이트 입력. None인 필드는 유지됩니다.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PatientUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<NewAddress>,
}

// ================================================================================================
// Repository
// ================================================================================================

/// Patient Repository
pub struct PatientRepository;

impl PatientRepository {
    /// 전체 환자 목록 (성 순).
    pub async fn list(pool: &PgPool) -> ClinicResult<Vec<PatientRecord>> {
        sqlx::query_as::<_, PatientRecord>("SELECT * FROM patients ORDER BY last_name, id")
            .fetch_all(pool)
            .await
            .map_err(db_err)
    }

    /// ID로 환자 조회.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> ClinicResult<Option<PatientRecord>> {
        sqlx::query_as::<_, PatientRecord>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }

    /// 계정 역참조로 환자 프로필 조회.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: i64,
    ) -> ClinicResult<Option<PatientRecord>> {
        sqlx::query_as::<_, PatientRecord>("SELECT * FROM patients WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }

    /// 환자 프로필 생성 (선택적 주소 포함, 단일 트랜잭션).
    pub async fn create(pool: &PgPool, input: NewPatient) -> ClinicResult<PatientRecord> {
        let mut tx = pool.begin().await.map_err(db_err)?;

        let address_id = match &input.address {
            Some(address) => Some(AddressRepository::create_or_get(&mut tx, address).await?.id),
            None => None,
        };

        // patient_no가 없으면 시퀀스 기본값으로 발번
        let patient = match &input.patient_no {
            Some(patient_no) => sqlx::query_as::<_, PatientRecord>(
                r#"
                INSERT INTO patients
                    (patient_no, first_name, last_name, phone, email, user_id, address_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(patient_no)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(input.user_id)
            .bind(address_id)
            .fetch_one(&mut *tx)
            .await,
            None => sqlx::query_as::<_, PatientRecord>(
                r#"
                INSERT INTO patients
                    (first_name, last_name, phone, email, user_id, address_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(input.user_id)
            .bind(address_id)
            .fetch_one(&mut *tx)
            .await,
        }
        .map_err(map_patient_unique)?;

        tx.commit().await.map_err(db_err)?;

        Ok(patient)
    }

    /// 환자 프로필 업데이트.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        input: PatientUpdate,
    ) -> ClinicResult<PatientRecord> {
        let mut tx = pool.begin().await.map_err(db_err)?;

        let address_id = match &input.address {
            Some(address) => Some(AddressRepository::create_or_get(&mut tx, address).await?.id),
            None => None,
        };

        let patient = sqlx::query_as::<_, PatientRecord>(
            r#"
            UPDATE patients
            SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address_id = COALESCE($6, address_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(address_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ClinicError::NotFound("Patient not found".to_string()))?;

        tx.commit().await.map_err(db_err)?;

        Ok(patient)
    }

    /// 환자 프로필 삭제.
    pub async fn delete(pool: &PgPool, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("Patient not found".to_string()));
        }

        Ok(())
    }

    /// 이름/환자번호/이메일/전화번호 부분 일치 검색 (성 순).
    pub async fn search(pool: &PgPool, term: &str) -> ClinicResult<Vec<PatientRecord>> {
        let like = format!("%{}%", term.trim());

        sqlx::query_as::<_, PatientRecord>(
            r#"
            SELECT * FROM patients
            WHERE first_name ILIKE $1
               OR last_name ILIKE $1
               OR patient_no ILIKE $1
               OR email ILIKE $1
               OR phone ILIKE $1
            ORDER BY last_name, id
            "#,
        )
        .bind(&like)
        .fetch_all(pool)
        .await
        .map_err(db_err)
    }
}

/// patients 테이블의 유니크 제약 위반을 도메인 에러로 변환합니다.
fn map_patient_unique(e: sqlx::Error) -> ClinicError {
    match unique_violation(&e).as_deref() {
        Some("patients_patient_no_key") => {
            ClinicError::AlreadyExists("Patient number already exists.".to_string())
        }
        _ => db_err(e),
    }
}
