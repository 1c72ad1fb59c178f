//! 예약 흐름 통합 테스트.
//!
//! 실제 PostgreSQL이 필요하므로 기본적으로 무시됩니다. 실행하려면:
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p clinic-api --test booking_flow -- --ignored
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sqlx::PgPool;
use tower::ServiceExt;

use clinic_api::auth::decode_token;
use clinic_api::repository::bootstrap;
use clinic_api::routes::create_api_router;
use clinic_api::state::AppState;
use clinic_core::AuthConfig;

const TEST_SECRET: &str = "integration-test-secret-key-minimum-32-chars";

async fn setup() -> (Router, PgPool) {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to PostgreSQL");

    bootstrap::init_schema(&pool).await.unwrap();

    // 이전 실행 잔여물 제거 (역할 시드는 유지)
    sqlx::raw_sql(
        r#"
        TRUNCATE appointments, patients, dentists, surgeries, addresses, user_roles, users
        RESTART IDENTITY CASCADE;
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    bootstrap::seed_roles(&pool).await.unwrap();

    let state = Arc::new(AppState::new(
        pool.clone(),
        AuthConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expire_minutes: 60,
        },
    ));

    (create_api_router().with_state(state), pool)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_and_login(app: &Router, email: &str, password: &str) -> String {
    let register_body = format!(
        r#"{{"first_name": "Test", "last_name": "Patient", "email": "{}", "password": "{}"}}"#,
        email, password
    );
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/register", None, &register_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let login_body = format!(r#"{{"email": "{}", "password": "{}"}}"#, email, password);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/login", None, &login_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["access_token"].as_str().unwrap().to_string()
}

async fn create_dentist_and_surgery(pool: &PgPool) -> (i64, i64) {
    let surgery_id: i64 = sqlx::query_scalar(
        "INSERT INTO surgeries (surgery_no, name) VALUES ('S001', 'Bells Court Dental') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let dentist_id: i64 = sqlx::query_scalar(
        "INSERT INTO dentists (first_name, last_name, surgery_id) VALUES ('Tony', 'Smith', $1) RETURNING id",
    )
    .bind(surgery_id)
    .fetch_one(pool)
    .await
    .unwrap();

    (dentist_id, surgery_id)
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn booking_flow_end_to_end() {
    let (app, pool) = setup().await;

    // 등록 → 로그인 → 토큰의 역할은 PATIENT
    let token = register_and_login(&app, "a@b.com", "pw").await;
    let decoded = decode_token(&token, TEST_SECRET).unwrap();
    assert_eq!(decoded.claims.sub, "a@b.com");
    assert_eq!(decoded.claims.role.as_deref(), Some("PATIENT"));

    let (dentist_id, surgery_id) = create_dentist_and_surgery(&pool).await;

    // 첫 예약은 성공
    let booking_body = format!(
        r#"{{"dentist_id": {}, "surgery_id": {}, "appointment_date": "2024-01-10", "appointment_time": "09:00:00"}}"#,
        dentist_id, surgery_id
    );
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/appointments",
            Some(&token),
            &booking_body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let appointment = body_json(response).await;
    assert_eq!(appointment["status"], "BOOKED");

    // 동일 슬롯 재시도는 409 + SLOT_CONFLICT
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/appointments",
            Some(&token),
            &booking_body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = body_json(response).await;
    assert_eq!(error["code"], "SLOT_CONFLICT");

    // 환자 범위 조회: 본인 예약만 보인다
    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/appointments", Some(&token), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["total"], 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn concurrent_booking_exactly_one_wins() {
    let (app, pool) = setup().await;

    let token1 = register_and_login(&app, "first@mail.com", "pw1").await;
    let token2 = register_and_login(&app, "second@mail.com", "pw2").await;

    let (dentist_id, surgery_id) = create_dentist_and_surgery(&pool).await;

    let booking_body = format!(
        r#"{{"dentist_id": {}, "surgery_id": {}, "appointment_date": "2024-01-10", "appointment_time": "09:00:00"}}"#,
        dentist_id, surgery_id
    );

    // 동일 슬롯에 대한 동시 예약: 정확히 하나만 성공해야 한다
    let (first, second) = tokio::join!(
        app.clone().oneshot(json_request(
            "POST",
            "/api/v1/appointments",
            Some(&token1),
            &booking_body,
        )),
        app.clone().oneshot(json_request(
            "POST",
            "/api/v1/appointments",
            Some(&token2),
            &booking_body,
        )),
    );

    let statuses = [first.unwrap().status(), second.unwrap().status()];
    assert!(statuses.contains(&StatusCode::CREATED), "{:?}", statuses);
    assert!(statuses.contains(&StatusCode::CONFLICT), "{:?}", statuses);

    let booked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE dentist_id = $1 AND status = 'BOOKED'",
    )
    .bind(dentist_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(booked, 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn dentist_sees_only_own_appointments() {
    let (app, pool) = setup().await;

    // 환자 둘, 치과의사 계정 하나
    let patient_token = register_and_login(&app, "gwhite@mail.com", "patientpass").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/adsweb/api/v1/dentists/register",
            None,
            r#"{"email": "tsmith@ads.com", "password": "dentistpass", "first_name": "Tony", "last_name": "Smith"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let own_dentist = body_json(response).await;
    let own_dentist_id = own_dentist["id"].as_i64().unwrap();

    let (other_dentist_id, surgery_id) = create_dentist_and_surgery(&pool).await;

    // 담당 치과의사가 다른 예약 두 건
    for (dentist_id, time) in [(own_dentist_id, "09:00:00"), (other_dentist_id, "10:00:00")] {
        let body = format!(
            r#"{{"dentist_id": {}, "surgery_id": {}, "appointment_date": "2024-01-10", "appointment_time": "{}"}}"#,
            dentist_id, surgery_id, time
        );
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/appointments",
                Some(&patient_token),
                &body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // 치과의사 계정으로 조회하면 본인 담당 예약만 보인다
    let login_body = r#"{"email": "tsmith@ads.com", "password": "dentistpass"}"#;
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/login", None, login_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let dentist_token = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/v1/appointments",
            Some(&dentist_token),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["total"], 1);
    assert_eq!(
        list["appointments"][0]["dentist_id"].as_i64().unwrap(),
        own_dentist_id
    );
}
