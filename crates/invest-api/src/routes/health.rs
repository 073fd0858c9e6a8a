//! 헬스 체크 endpoint.
//!
//! 서버 상태 확인을 위한 헬스 체크 엔드포인트를 제공합니다.
//! 로드밸런서나 오케스트레이션 시스템(Kubernetes 등)에서 사용됩니다.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 전체 서비스 상태 ("healthy" | "degraded")
    pub status: String,

    /// API 버전
    pub version: String,

    /// 서버 업타임(초)
    pub uptime_secs: i64,

    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
}

/// 상세 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// 전체 서비스 상태
    pub status: String,
    /// 개별 컴포넌트 상태
    pub components: ComponentHealth,
}

/// 개별 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// 데이터베이스 연결 상태
    pub database: ComponentStatus,

    /// KIS 연동 상태
    pub kis: ComponentStatus,

    /// DART 연동 상태
    pub dart: ComponentStatus,
}

/// 컴포넌트 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// 상태 ("up" | "down" | "not_configured")
    pub status: String,

    /// 추가 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    /// 정상 상태.
    pub fn up() -> Self {
        Self {
            status: "up".to_string(),
            message: None,
        }
    }

    /// 비정상 상태.
    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            message: Some(message.into()),
        }
    }

    /// 미설정 상태.
    pub fn not_configured() -> Self {
        Self {
            status: "not_configured".to_string(),
            message: None,
        }
    }

    fn is_down(&self) -> bool {
        self.status == "down"
    }
}

/// 단순 헬스 체크 (liveness).
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// 상세 헬스 체크 (readiness).
///
/// GET /health/ready
pub async fn readiness(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let database = match &state.db_pool {
        Some(pool) => match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
            Ok(_) => ComponentStatus::up(),
            Err(e) => ComponentStatus::down(e.to_string()),
        },
        None => ComponentStatus::not_configured(),
    };

    let kis = match &state.kis_client {
        Some(client) => {
            if client.auth().has_valid_token().await {
                ComponentStatus::up()
            } else {
                // 토큰이 없을 뿐 연동 자체는 살아있을 수 있음
                ComponentStatus {
                    status: "up".to_string(),
                    message: Some("no cached token".to_string()),
                }
            }
        }
        None => ComponentStatus::not_configured(),
    };

    let dart = match &state.dart_client {
        Some(_) => ComponentStatus::up(),
        None => ComponentStatus::not_configured(),
    };

    let degraded = database.is_down() || kis.is_down() || dart.is_down();

    Json(ReadinessResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        components: ComponentHealth {
            database,
            kis,
            dart,
        },
    })
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_returns_ok() {
        let state = Arc::new(AppState::new(None, None, None));
        let app = health_router().with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_reports_unconfigured_components() {
        let state = Arc::new(AppState::new(None, None, None));
        let app = health_router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let body: ReadinessResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.components.database.status, "not_configured");
        assert_eq!(body.components.kis.status, "not_configured");
    }
}
