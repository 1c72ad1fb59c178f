//! Surgery Repository
//!
//! 클리닉 지점(surgery)에 대한 데이터베이스 연산을 담당합니다. 지점은
//! 고유한 코드와 단일 주소를 가지며 여러 치과의사와 예약을 소유합니다.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

use clinic_core::ClinicResult;

use super::addresses::AddressRecord;
use super::db_err;

/// 클리닉 지점 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SurgeryRecord {
    pub id: i64,
    pub surgery_no: String,
    pub name: String,
    #[sqlx(default)]
    pub phone: Option<String>,
    #[sqlx(default)]
    pub address_id: Option<i64>,
}

/// 주소가 포함된 지점.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SurgeryWithAddress {
    pub id: i64,
    pub surgery_no: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<AddressRecord>,
}

/// LEFT JOIN 결과를 평평하게 받는 행.
#[derive(Debug, FromRow)]
struct SurgeryAddressRow {
    id: i64,
    surgery_no: String,
    name: String,
    phone: Option<String>,
    address_id: Option<i64>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
}

impl From<SurgeryAddressRow> for SurgeryWithAddress {
    fn from(row: SurgeryAddressRow) -> Self {
        let address = match (row.address_id, row.street, row.city, row.state, row.zip_code) {
            (Some(id), Some(street), Some(city), Some(state), Some(zip_code)) => {
                Some(AddressRecord {
                    id,
                    street,
                    city,
                    state,
                    zip_code,
                })
            }
            _ => None,
        };

        Self {
            id: row.id,
            surgery_no: row.surgery_no,
            name: row.name,
            phone: row.phone,
            address,
        }
    }
}

/// Surgery Repository
pub struct SurgeryRepository;

impl SurgeryRepository {
    /// 전체 지점 목록 (이름 순, 주소 포함).
    pub async fn list_with_address(pool: &PgPool) -> ClinicResult<Vec<SurgeryWithAddress>> {
        let rows = sqlx::query_as::<_, SurgeryAddressRow>(
            r#"
            SELECT
                s.id, s.surgery_no, s.name, s.phone, s.address_id,
                a.street, a.city, a.state, a.zip_code
            FROM surgeries s
            LEFT JOIN addresses a ON a.id = s.address_id
            ORDER BY s.name
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(SurgeryWithAddress::from).collect())
    }

    /// ID로 지점 조회.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> ClinicResult<Option<SurgeryRecord>> {
        sqlx::query_as::<_, SurgeryRecord>("SELECT * FROM surgeries WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_err)
    }
}
