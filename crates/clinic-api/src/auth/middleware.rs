//! Axum용 JWT 인증 추출기.
//!
//! 보호된 핸들러가 사용하는 인증/인가 단계:
//!
//! 1. [`JwtAuth`] - Bearer 토큰 검증, 클레임만 제공 (DB 접근 없음)
//! 2. [`CurrentUser`] - 클레임의 subject로 활성 계정을 조회
//! 3. [`RequirePatient`] - 환자 전용 엔드포인트 가드
//!
//! 허용 역할 집합 검사는 [`require_role`]로 수행합니다. 어느 단계도
//! 상태를 변경하지 않습니다.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use clinic_core::{ClinicError, Role, RoleBearer};

use super::jwt::{decode_token, Claims, JwtError};
use crate::error::ApiError;
use crate::repository::users::{UserRepository, UserWithRoles};
use crate::state::AppState;

/// 인증/인가 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("인증 토큰이 필요합니다")]
    MissingToken,
    #[error("잘못된 Authorization 헤더 형식")]
    InvalidAuthHeader,
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("유효하지 않은 토큰")]
    InvalidToken,
    #[error("Could not validate credentials")]
    UnknownAccount,
    #[error("You do not have permission to access this resource.")]
    InsufficientRole,
    #[error("Only patients can access this resource")]
    NotPatient,
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        let clinic_err = match err {
            AuthError::MissingToken
            | AuthError::InvalidAuthHeader
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::UnknownAccount => ClinicError::Unauthenticated(message),
            AuthError::InsufficientRole | AuthError::NotPatient => {
                ClinicError::Forbidden(message)
            }
            AuthError::Database(m) => ClinicError::Database(m),
        };
        ApiError(clinic_err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// JWT 인증 추출기.
///
/// `Authorization: Bearer <token>` 헤더를 검증하고 디코딩된 클레임을
/// 핸들러에 넘깁니다. 계정 조회는 하지 않습니다.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn protected_handler(JwtAuth(claims): JwtAuth) -> impl IntoResponse {
///     format!("Authenticated subject: {}", claims.sub)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JwtAuth(pub Claims);

impl FromRequestParts<Arc<AppState>> for JwtAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let token_data = decode_token(token, &state.auth.secret).map_err(|e| match e {
            JwtError::TokenExpired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Ok(JwtAuth(token_data.claims))
    }
}

/// 검증된 토큰의 subject를 활성 계정으로 해소하는 추출기.
///
/// 만료되지 않은 토큰이라도 계정이 삭제되었거나 비활성화되었으면
/// 여기서 거부됩니다.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserWithRoles);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let JwtAuth(claims) = JwtAuth::from_request_parts(parts, state).await?;

        let user = UserRepository::find_by_email(&state.db_pool, &claims.sub)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::UnknownAccount)?;

        if !user.user.enabled {
            return Err(AuthError::UnknownAccount);
        }

        Ok(CurrentUser(user))
    }
}

/// PATIENT 역할을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct RequirePatient(pub UserWithRoles);

impl FromRequestParts<Arc<AppState>> for RequirePatient {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        ensure_patient(&user)?;
        Ok(RequirePatient(user))
    }
}

/// PATIENT 역할 보유 검사.
///
/// 역할이 전혀 없는 계정과 다른 역할만 가진 계정 모두 동일한 에러로
/// 거부됩니다.
pub fn ensure_patient(bearer: &impl RoleBearer) -> Result<(), AuthError> {
    if bearer.holds(Role::Patient) {
        Ok(())
    } else {
        Err(AuthError::NotPatient)
    }
}

/// 허용 역할 집합과의 교집합 검사.
///
/// # Arguments
///
/// * `permitted` - 대상 작업의 허용 역할 집합
/// * `bearer` - 호출자의 역할 정보 (클레임 또는 계정)
pub fn require_role(permitted: &[Role], bearer: &impl RoleBearer) -> Result<(), AuthError> {
    if bearer.holds_any(permitted) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn protected(JwtAuth(claims): JwtAuth) -> String {
        claims.sub
    }

    fn protected_app() -> Router {
        Router::new()
            .route("/protected", get(protected))
            .with_state(Arc::new(create_test_state()))
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = protected_app()
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized() {
        let response = protected_app()
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("authorization", "Basic abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let response = protected_app()
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let state = create_test_state();
        let claims = Claims::new("gwhite@mail.com", Some("PATIENT".to_string()), 60);
        let token = create_token(&claims, &state.auth.secret).unwrap();

        let app = Router::new()
            .route("/protected", get(protected))
            .with_state(Arc::new(state));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"gwhite@mail.com");
    }

    #[test]
    fn test_require_role_with_scalar_claim() {
        let dentist = Claims::new("tsmith@ads.com", Some("DENTIST".to_string()), 60);
        assert!(require_role(&[Role::Admin, Role::Dentist], &dentist).is_ok());

        let patient = Claims::new("gwhite@mail.com", Some("PATIENT".to_string()), 60);
        let err = require_role(&[Role::Admin, Role::Dentist], &patient).unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole));
    }

    #[test]
    fn test_require_role_without_role_claim() {
        let nobody = Claims::new("x@y.com", None, 60);
        assert!(require_role(&[Role::Admin], &nobody).is_err());
    }

    #[test]
    fn test_ensure_patient_identical_message_for_both_rejections() {
        struct Roles(Vec<&'static str>);
        impl RoleBearer for Roles {
            fn role_names(&self) -> Vec<String> {
                self.0.iter().map(|s| s.to_string()).collect()
            }
        }

        let wrong_role = ensure_patient(&Roles(vec!["DENTIST"])).unwrap_err();
        let no_role = ensure_patient(&Roles(vec![])).unwrap_err();

        assert_eq!(wrong_role.to_string(), no_role.to_string());
        assert_eq!(wrong_role.to_string(), "Only patients can access this resource");
    }

    #[test]
    fn test_auth_error_status_codes() {
        let unauthorized = [
            AuthError::MissingToken,
            AuthError::InvalidAuthHeader,
            AuthError::TokenExpired,
            AuthError::InvalidToken,
            AuthError::UnknownAccount,
        ];
        for err in unauthorized {
            let (status, _) = ApiError::from(err).status_and_code();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let forbidden = [AuthError::InsufficientRole, AuthError::NotPatient];
        for err in forbidden {
            let (status, _) = ApiError::from(err).status_and_code();
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }
}
