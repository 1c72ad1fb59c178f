//! User Repository
//!
//! 계정과 역할 연결(users ↔ roles)에 대한 데이터베이스 연산을 담당합니다.
//! 계정 생성 + 역할 할당 + 프로필 생성처럼 여러 단계로 이루어진 쓰기는
//! 하나의 트랜잭션으로 수행됩니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use clinic_core::{ClinicError, ClinicResult, Role, RoleBearer};

use super::addresses::NewAddress;
use super::patients::PatientRecord;
use super::{db_err, unique_violation};

// ================================================================================================
// Types
// ================================================================================================

/// 계정 레코드.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 역할 이름 목록이 로드된 계정.
///
/// 역할 목록은 역할 id 순서로 정렬되며, 첫 항목이 primary 역할입니다.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user: UserRecord,
    pub roles: Vec<String>,
}

impl RoleBearer for UserWithRoles {
    fn role_names(&self) -> Vec<String> {
        self.roles.clone()
    }
}

/// 새 계정 입력.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// 계정 업데이트 입력. None인 필드는 유지됩니다.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub enabled: Option<bool>,
    pub role: Option<Role>,
}

/// 환자 자가 등록 입력 (계정 + PATIENT 역할 + 프로필 + 선택적 주소).
#[derive(Debug, Clone)]
pub struct RegisterPatient {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<NewAddress>,
}

// ================================================================================================
// Repository
// ================================================================================================

/// User Repository
pub struct UserRepository;

impl UserRepository {
    /// 이메일로 계정 조회 (역할 포함).
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> ClinicResult<Option<UserWithRoles>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(db_err)?;

        match user {
            Some(user) => {
                let roles = Self::roles_of(pool, user.id).await?;
                Ok(Some(UserWithRoles { user, roles }))
            }
            None => Ok(None),
        }
    }

    /// ID로 계정 조회 (역할 포함).
    pub async fn find_by_id(pool: &PgPool, id: i64) -> ClinicResult<Option<UserWithRoles>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)?;

        match user {
            Some(user) => {
                let roles = Self::roles_of(pool, user.id).await?;
                Ok(Some(UserWithRoles { user, roles }))
            }
            None => Ok(None),
        }
    }

    /// 계정의 역할 이름 목록 (역할 id 순).
    pub async fn roles_of(pool: &PgPool, user_id: i64) -> ClinicResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(db_err)
    }

    /// 전체 계정 목록 (역할 포함).
    pub async fn list(pool: &PgPool) -> ClinicResult<Vec<UserWithRoles>> {
        let users = sqlx::query_as::<_, UserRecord>("SELECT * FROM users ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(db_err)?;

        let mut result = Vec::with_capacity(users.len());
        for user in users {
            let roles = Self::roles_of(pool, user.id).await?;
            result.push(UserWithRoles { user, roles });
        }

        Ok(result)
    }

    /// 계정 생성 + 역할 할당 (단일 트랜잭션).
    pub async fn create(pool: &PgPool, input: NewUser, role: Role) -> ClinicResult<UserWithRoles> {
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

        Self::assign_role(&mut tx, user.id, role).await?;

        tx.commit().await.map_err(db_err)?;

        let roles = Self::roles_of(pool, user.id).await?;
        Ok(UserWithRoles { user, roles })
    }

    /// 계정 업데이트. 역할이 주어지면 기존 역할을 교체합니다.
    pub async fn update(pool: &PgPool, id: i64, input: UserUpdate) -> ClinicResult<UserWithRoles> {
        let mut tx = pool.begin().await.map_err(db_err)?;

        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                enabled = COALESCE($5, enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(input.enabled)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_user_unique)?
        .ok_or_else(|| ClinicError::NotFound("User not found".to_string()))?;

        if let Some(role) = input.role {
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(user.id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            Self::assign_role(&mut tx, user.id, role).await?;
        }

        tx.commit().await.map_err(db_err)?;

        let roles = Self::roles_of(pool, user.id).await?;
        Ok(UserWithRoles { user, roles })
    }

    /// 계정 삭제. 연결된 프로필은 분리(detach)되며 삭제되지 않습니다.
    pub async fn delete(pool: &PgPool, id: i64) -> ClinicResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    /// 역할 목록 일괄 교체.
    ///
    /// 유효한 역할 이름이 하나도 없으면 거부합니다.
    pub async fn set_roles(
        pool: &PgPool,
        id: i64,
        names: &[String],
    ) -> ClinicResult<UserWithRoles> {
        let normalized: Vec<String> = names.iter().map(|n| n.to_ascii_uppercase()).collect();

        let mut tx = pool.begin().await.map_err(db_err)?;

        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ClinicError::NotFound("User not found".to_string()))?;

        let role_ids: Vec<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM roles WHERE name = ANY($1) ORDER BY id",
        )
        .bind(&normalized)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        if role_ids.is_empty() {
            return Err(ClinicError::Validation("No valid roles provided".to_string()));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for role_id in role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user.id)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        let roles = Self::roles_of(pool, user.id).await?;
        Ok(UserWithRoles { user, roles })
    }

    /// 환자 자가 등록.
    ///
    /// 계정 + PATIENT 역할 + 선택적 주소 + 환자 프로필을 하나의
    /// 트랜잭션으로 생성합니다. 어느 단계가 실패하든 이전 쓰기는 전부
    /// 롤백되고 원래 실패가 보고됩니다.
    pub async fn register_patient(
        pool: &PgPool,
        input: RegisterPatient,
    ) -> ClinicResult<PatientRecord> {
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

        Self::assign_role(&mut tx, user.id, Role::Patient).await?;

        let address_id = match &input.address {
            Some(address) => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO addresses (street, city, state, zip_code)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                    "#,
                )
                .bind(&address.street)
                .bind(&address.city)
                .bind(&address.state)
                .bind(&address.zip_code)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
                Some(id)
            }
            None => None,
        };

        let patient = sqlx::query_as::<_, PatientRecord>(
            r#"
            INSERT INTO patients (user_id, first_name, last_name, phone, email, address_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(patient)
    }

    /// 계정에 역할 연결 (트랜잭션 내부용).
    pub(crate) async fn assign_role(
        conn: &mut PgConnection,
        user_id: i64,
        role: Role,
    ) -> ClinicResult<()> {
        let role_id: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
            .bind(role.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;

        let role_id = role_id.ok_or_else(|| {
            ClinicError::Internal(format!("role {} is not seeded", role))
        })?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}

/// users 테이블의 유니크 제약 위반을 도메인 에러로 변환합니다.
pub(crate) fn map_user_unique(e: sqlx::Error) -> ClinicError {
    match unique_violation(&e).as_deref() {
        Some("users_email_key") => ClinicError::AlreadyExists("Email already registered".to_string()),
        Some("users_username_key") => {
            ClinicError::AlreadyExists("Username already taken".to_string())
        }
        _ => db_err(e),
    }
}
