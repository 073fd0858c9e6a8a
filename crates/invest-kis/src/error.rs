//! KIS 연동 에러 타입.

use thiserror::Error;

/// KIS API 관련 에러.
#[derive(Debug, Error)]
pub enum KisError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 인증/권한 에러 (앱키 불일치, 토큰 거부 등)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과 (토큰 발급 1분 1회 등)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// API 에러 응답 (rt_cd != "0" 또는 HTTP 에러)
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 설정 에러
    #[error("Config error: {0}")]
    Config(String),
}

impl KisError {
    /// 재시도할 가치가 있는 일시적 에러인지 여부.
    ///
    /// 인증 실패와 한도 초과는 재시도해도 결과가 바뀌지 않습니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, KisError::Network(_) | KisError::Api { .. })
    }
}
