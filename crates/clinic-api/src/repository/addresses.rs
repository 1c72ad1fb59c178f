//! Address Repository
//!
//! 주소 레코드에 대한 데이터베이스 연산을 담당합니다. 주소는 환자와
//! 클리닉(surgery)이 참조합니다.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::ToSchema;

use clinic_core::ClinicResult;

use super::db_err;

/// 주소 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AddressRecord {
    pub id: i64,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// 새 주소 입력.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Address Repository
pub struct AddressRepository;

impl AddressRepository {
    /// 전체 주소 목록 (도시명 순).
    pub async fn list(pool: &PgPool) -> ClinicResult<Vec<AddressRecord>> {
        sqlx::query_as::<_, AddressRecord>("SELECT * FROM addresses ORDER BY city, id")
            .fetch_all(pool)
            .await
            .map_err(db_err)
    }

    /// ID로 주소 조회.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> ClinicResult<Option<AddressRecord>> {
        sqlx::query_as::<_, AddressRecord>("SELECT * FROM addresses WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }

    /// 모든 필드가 일치하는 주소를 찾고, 없으면 새로 만듭니다.
    ///
    /// 트랜잭션에 참여할 수 있도록 커넥션을 직접 받습니다.
    pub async fn create_or_get(
        conn: &mut PgConnection,
        input: &NewAddress,
    ) -> ClinicResult<AddressRecord> {
        let existing = sqlx::query_as::<_, AddressRecord>(
            r#"
            SELECT * FROM addresses
            WHERE street = $1 AND city = $2 AND state = $3 AND zip_code = $4
            LIMIT 1
            "#,
        )
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip_code)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;

        if let Some(address) = existing {
            return Ok(address);
        }

        sqlx::query_as::<_, AddressRecord>(
            r#"
            INSERT INTO addresses (street, city, state, zip_code)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip_code)
        .fetch_one(conn)
        .await
        .map_err(db_err)
    }
}
