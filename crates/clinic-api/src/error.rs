//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 `{code, message}` 형태의 JSON을 반환합니다.
//! `code`는 기계 판독용으로 안정적이며, `message`는 사람이 읽는 설명입니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use clinic_core::ClinicError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "SLOT_CONFLICT",
///   "message": "dentist 5 @ 2024-01-10 09:00:00"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "UNAUTHENTICATED", "SLOT_CONFLICT")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 타임스탬프 없는 간단한 에러.
    pub fn simple(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: None,
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// [`ClinicError`]를 HTTP 응답으로 변환하는 래퍼.
///
/// 핸들러는 `ApiResult<T>`를 반환하고 `?`로 도메인 에러를 전파합니다.
#[derive(Debug)]
pub struct ApiError(pub ClinicError);

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        ApiError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError(ClinicError::Validation(err.to_string()))
    }
}

impl ApiError {
    /// 상태 코드와 기계 판독용 에러 코드.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            ClinicError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ClinicError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ClinicError::ProfileNotFound(_) => (StatusCode::NOT_FOUND, "PROFILE_NOT_FOUND"),
            ClinicError::SlotConflict(_) => (StatusCode::CONFLICT, "SLOT_CONFLICT"),
            ClinicError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            ClinicError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ClinicError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ClinicError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
            ClinicError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// 응답 본문에 들어갈 사람이 읽는 메시지 (분류 접두어 제외).
    fn message(&self) -> &str {
        match &self.0 {
            ClinicError::Unauthenticated(m)
            | ClinicError::Forbidden(m)
            | ClinicError::ProfileNotFound(m)
            | ClinicError::SlotConflict(m)
            | ClinicError::AlreadyExists(m)
            | ClinicError::NotFound(m)
            | ClinicError::Validation(m)
            | ClinicError::Database(m)
            | ClinicError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // 호출자가 복구 가능한 에러는 에러 레벨로 로깅하지 않는다
        if self.0.is_expected() {
            tracing::debug!(code, error = %self.0, "request failed");
        } else {
            tracing::error!(code, error = %self.0, "request failed");
        }

        let body = Json(ApiErrorResponse::new(code, self.message()));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ClinicError::Unauthenticated("x".into()),
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
            ),
            (
                ClinicError::Forbidden("x".into()),
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (
                ClinicError::ProfileNotFound("x".into()),
                StatusCode::NOT_FOUND,
                "PROFILE_NOT_FOUND",
            ),
            (
                ClinicError::SlotConflict("x".into()),
                StatusCode::CONFLICT,
                "SLOT_CONFLICT",
            ),
            (
                ClinicError::AlreadyExists("x".into()),
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
            ),
            (
                ClinicError::NotFound("x".into()),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                ClinicError::Validation("x".into()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                ClinicError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "DB_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let api_err = ApiError(err);
            let (s, c) = api_err.status_and_code();
            assert_eq!(s, status);
            assert_eq!(c, code);
        }
    }

    #[test]
    fn test_message_strips_classification_prefix() {
        let err = ApiError(ClinicError::SlotConflict("dentist 5 @ ...".into()));
        assert_eq!(err.message(), "dentist 5 @ ...");
    }

    #[test]
    fn test_simple_response_serialization() {
        let error = ApiErrorResponse::simple("NOT_FOUND", "Patient not found");
        let json = serde_json::to_string(&error).unwrap();

        assert!(!json.contains("timestamp"));
        assert!(!json.contains("details"));
        assert!(json.contains(r#""code":"NOT_FOUND""#));
        assert!(json.contains(r#""message":"Patient not found""#));
    }

    #[test]
    fn test_with_details_serialization() {
        let details = serde_json::json!({"field": "email"});
        let error = ApiErrorResponse::with_details("VALIDATION_ERROR", "Invalid input", details);
        assert!(error.details.is_some());
        assert!(error.timestamp.is_some());
    }
}
