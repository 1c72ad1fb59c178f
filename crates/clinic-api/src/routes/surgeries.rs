//! 클리닉 지점 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /adsweb/api/v1/surgeries` - 지점 목록 (PATIENT, ADMIN)

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use clinic_core::Role;

use crate::auth::{require_role, JwtAuth};
use crate::error::ApiResult;
use crate::repository::{
    AddressRecord, DentistRecord, DentistRepository, SurgeryRepository,
};
use crate::state::AppState;

/// 지점 응답 (주소와 소속 치과의사 포함).
#[derive(Debug, Serialize, ToSchema)]
pub struct SurgeryResponse {
    pub id: i64,
    pub surgery_no: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<AddressRecord>,
    pub dentists: Vec<DentistRecord>,
}

/// 지점 목록 조회.
///
/// GET /adsweb/api/v1/surgeries
pub async fn list_surgeries(
    State(state): State<Arc<AppState>>,
    JwtAuth(claims): JwtAuth,
) -> ApiResult<Json<Vec<SurgeryResponse>>> {
    require_role(&[Role::Patient, Role::Admin], &claims)?;

    let surgeries = SurgeryRepository::list_with_address(&state.db_pool).await?;
    let dentists = DentistRepository::list(&state.db_pool).await?;

    let response = surgeries
        .into_iter()
        .map(|surgery| {
            let own_dentists: Vec<DentistRecord> = dentists
                .iter()
                .filter(|d| d.surgery_id == Some(surgery.id))
                .cloned()
                .collect();
            SurgeryResponse {
                id: surgery.id,
                surgery_no: surgery.surgery_no,
                name: surgery.name,
                phone: surgery.phone,
                address: surgery.address,
                dentists: own_dentists,
            }
        })
        .collect();

    Ok(Json(response))
}

/// 지점 라우터 생성.
pub fn surgeries_router() -> Router<Arc<AppState>> {
    Router::new().route("/surgeries", get(list_surgeries))
}
