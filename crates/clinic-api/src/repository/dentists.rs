//! Dentist Repository
//!
//! 치과의사 프로필에 대한 데이터베이스 연산을 담당합니다.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

use clinic_core::{ClinicResult, Role};

use super::users::{map_user_unique, UserRecord, UserRepository};
use super::db_err;

// ================================================================================================
// Types
// ================================================================================================

/// 치과의사 프로필 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DentistRecord {
    pub id: i64,
    #[sqlx(default)]
    pub user_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(default)]
    pub phone: Option<String>,
    #[sqlx(default)]
    pub email: Option<String>,
    #[sqlx(default)]
    pub specialization: Option<String>,
    #[sqlx(default)]
    pub surgery_id: Option<i64>,
}

/// 치과의사 등록 입력 (계정 + DENTIST 역할 + 프로필).
#[derive(Debug, Clone)]
pub struct RegisterDentist {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub surgery_id: Option<i64>,
}

// ================================================================================================
// Repository
// ================================================================================================

/// Dentist Repository
pub struct DentistRepository;

impl DentistRepository {
    /// 전체 치과의사 목록.
    pub async fn list(pool: &PgPool) -> ClinicResult<Vec<DentistRecord>> {
        sqlx::query_as::<_, DentistRecord>("SELECT * FROM dentists ORDER BY last_name, id")
            .fetch_all(pool)
            .await
            .map_err(db_err)
    }

    /// ID로 치과의사 조회.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> ClinicResult<Option<DentistRecord>> {
        sqlx::query_as::<_, DentistRecord>("SELECT * FROM dentists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }

    /// 계정 역참조로 치과의사 프로필 조회.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: i64,
    ) -> ClinicResult<Option<DentistRecord>> {
        sqlx::query_as::<_, DentistRecord>("SELECT * FROM dentists WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }

    /// 치과의사 등록.
    ///
    /// 계정 + DENTIST 역할 + 프로필을 하나의 트랜잭션으로 생성합니다.
    pub async fn register(pool: &PgPool, input: RegisterDentist) -> ClinicResult<DentistRecord> {
        let mut tx = pool.begin().await.map_err(db_err)?;

        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_user_unique)?;

        UserRepository::assign_role(&mut tx, user.id, Role::Dentist).await?;

        let dentist = sqlx::query_as::<_, DentistRecord>(
            r#"
            INSERT INTO dentists
                (user_id, first_name, last_name, phone, email, specialization, surgery_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.specialization)
        .bind(input.surgery_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(dentist)
    }
}
