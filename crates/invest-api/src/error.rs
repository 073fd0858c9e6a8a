//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다.
//! 업스트림(KIS/DART) 에러는 타입별로 HTTP 상태 코드에 매핑됩니다.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use invest_dart::DartError;
use invest_kis::KisError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "UPSTREAM_RATE_LIMITED",
///   "message": "Rate limited: 토큰 발급 한도 초과",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "NOT_FOUND", "UPSTREAM_ERROR")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    /// 기본 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// 핸들러 공용 에러 타입. HTTP 상태 + 응답 본문으로 변환됩니다.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorResponse,
}

/// 핸들러 공용 Result 타입.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorResponse::new(code, message),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 503 Service Unavailable (미설정 외부 연동).
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<KisError> for ApiError {
    fn from(err: KisError) -> Self {
        let (status, code) = match &err {
            KisError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "UPSTREAM_RATE_LIMITED"),
            KisError::Unauthorized(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_AUTH_FAILED"),
            KisError::Network(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_UNREACHABLE"),
            KisError::Parse(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_BAD_RESPONSE"),
            KisError::Api { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            KisError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        };

        warn!("KIS error -> {}: {}", status, err);
        ApiError::new(status, code, err.to_string())
    }
}

impl From<DartError> for ApiError {
    fn from(err: DartError) -> Self {
        let (status, code) = match &err {
            DartError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DartError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "UPSTREAM_RATE_LIMITED"),
            DartError::Unauthorized(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_AUTH_FAILED"),
            DartError::Network(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_UNREACHABLE"),
            DartError::Archive(_) | DartError::Parse(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_BAD_RESPONSE")
            }
            DartError::Api { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        };

        warn!("DART error -> {}: {}", status, err);
        ApiError::new(status, code, err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {}", err);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "DB_ERROR",
            "데이터베이스 오류가 발생했습니다",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kis_rate_limit_maps_to_429() {
        let err: ApiError = KisError::RateLimited("1분 1회".to_string()).into();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.body.code, "UPSTREAM_RATE_LIMITED");
    }

    #[test]
    fn test_kis_network_maps_to_504() {
        let err: ApiError = KisError::Network("timeout".to_string()).into();
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_dart_not_found_maps_to_404() {
        let err: ApiError = DartError::NotFound("조회된 데이타가 없습니다".to_string()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.code, "NOT_FOUND");
    }

    #[test]
    fn test_dart_api_maps_to_502() {
        let err: ApiError = DartError::Api {
            status: "800".to_string(),
            message: "시스템 점검".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }
}
