//! 클리닉 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다. 시작 시 스키마를 초기화하고
//! 고정 역할 집합을 시드합니다.
//!
//! # 환경변수
//!
//! - `DATABASE_URL`: PostgreSQL 연결 URL (필수)
//! - `CLINIC__AUTH__SECRET`: JWT 서명 비밀 키
//! - `CLINIC__SERVER__HOST` / `CLINIC__SERVER__PORT`: 바인딩 주소
//! - `CORS_ORIGINS`: 쉼표로 구분된 허용 origin 목록
//! - `CLINIC_SEED_SAMPLE`: "true"면 데모 데이터 시드

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use clinic_api::middleware::metrics_layer;
use clinic_api::repository::bootstrap;
use clinic_api::routes::create_api_router;
use clinic_api::setup_metrics_recorder;
use clinic_api::state::AppState;
use clinic_api::swagger_ui_router;
use clinic_core::{init_logging, AppConfig, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load_default().context("Failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // DATABASE_URL 환경변수가 설정 파일보다 우선
    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| config.database.url.clone())
        .context("DATABASE_URL is not set")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("Connected to PostgreSQL");

    bootstrap::init_schema(&pool).await?;
    bootstrap::seed_roles(&pool).await?;

    let seed_sample = std::env::var("CLINIC_SEED_SAMPLE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    if seed_sample {
        bootstrap::seed_sample_data(&pool).await?;
    }

    let state = Arc::new(AppState::new(pool, config.auth.clone()));

    let metrics_handle = setup_metrics_recorder();

    let app = Router::new()
        .route("/", get(root))
        .route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        )
        .merge(create_api_router())
        .merge(swagger_ui_router())
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Clinic API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// 루트 엔드포인트.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Dental Clinic API is running" }))
}

/// CORS 미들웨어 구성.
///
/// `CORS_ORIGINS` 환경변수가 설정되어 있으면 해당 origin만 허용하고,
/// 없으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// Graceful shutdown 신호 대기.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received");
}
