//! 주식 투자 백엔드 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 헬스 체크, KIS 시세 조회, DART 기업 정보 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use invest_api::routes::create_api_router;
use invest_api::state::AppState;
use invest_core::{init_logging_from_env, AppConfig};
use invest_dart::{DartClient, DartConfig};
use invest_kis::{KisClient, KisConfig, KisTokenManager};

/// KIS 클라이언트 생성.
///
/// 환경변수에 KIS 설정이 있으면 클라이언트를 생성합니다.
///
/// # 환경변수
/// - `KIS_APP_KEY`: 앱 키
/// - `KIS_APP_SECRET`: 앱 시크릿
/// - `KIS_ENV`: "real" | "paper" (기본값: paper)
fn create_kis_client() -> Option<Arc<KisClient>> {
    match KisConfig::from_env() {
        Some(config) => {
            info!(environment = ?config.environment, "KIS API configuration loaded");

            let auth = match KisTokenManager::new(config) {
                Ok(auth) => auth,
                Err(e) => {
                    error!(error = %e, "Failed to create KIS token manager");
                    return None;
                }
            };
            match KisClient::with_shared_auth(Arc::new(auth)) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    error!(error = %e, "Failed to create KIS client");
                    None
                }
            }
        }
        None => {
            warn!("KIS API not configured. Set KIS_APP_KEY, KIS_APP_SECRET to enable.");
            None
        }
    }
}

/// DART 클라이언트 생성.
///
/// # 환경변수
/// - `DART_API_KEY`: Open DART 인증키
fn create_dart_client() -> Option<Arc<DartClient>> {
    match DartConfig::from_env() {
        Some(config) => match DartClient::new(config) {
            Ok(client) => {
                info!("DART API configuration loaded");
                Some(Arc::new(client))
            }
            Err(e) => {
                error!(error = %e, "Failed to create DART client");
                None
            }
        },
        None => {
            warn!("DART API not configured. Set DART_API_KEY to enable.");
            None
        }
    }
}

/// DB 커넥션 풀 생성.
///
/// `DATABASE_URL`이 없으면 DB 없이 동작합니다.
async fn create_db_pool(config: &AppConfig) -> Option<PgPool> {
    let url = config.database.url.as_ref()?;

    match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(url)
        .await
    {
        Ok(pool) => {
            if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                info!("Connected to PostgreSQL successfully");
                Some(pool)
            } else {
                error!("Failed to verify database connection");
                None
            }
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            None
        }
    }
}

/// CORS 미들웨어 구성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
///
/// # 환경변수
///
/// - `CORS_ORIGINS`: 쉼표로 구분된 허용 origin 목록
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
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, request_timeout_secs: u64) -> Router {
    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // tracing 초기화
    init_logging_from_env()?;

    info!("Starting invest API server...");

    // 설정 로드
    let config = AppConfig::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                "소켓 주소 설정이 유효하지 않습니다. API_HOST, API_PORT 환경변수를 확인하세요."
            );
            e
        })?;

    // 외부 연동 클라이언트 생성 (환경변수 설정 시)
    let kis_client = create_kis_client();
    let dart_client = create_dart_client();
    let db_pool = create_db_pool(&config).await;

    if db_pool.is_none() {
        warn!("DATABASE_URL not set or unreachable, corp search will use in-memory snapshot");
    }

    let state = Arc::new(AppState::new(kis_client, dart_client, db_pool));

    info!(version = %state.version, "Application state initialized");
    info!(
        has_db = state.db_pool.is_some(),
        has_kis = state.kis_client.is_some(),
        has_dart = state.dart_client.is_some(),
        "Service connections status"
    );

    let app = create_router(state, config.server.request_timeout_secs);

    info!(%addr, "API server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 서버를 종료합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
