//! DART 연동 에러 타입.

use thiserror::Error;

/// DART API 관련 에러.
#[derive(Debug, Error)]
pub enum DartError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 인증 에러 (등록되지 않았거나 사용할 수 없는 인증키)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 일일 요청 한도 초과
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 조회 결과 없음 (status "013")
    #[error("Not found: {0}")]
    NotFound(String),

    /// API 에러 응답
    #[error("DART error {status}: {message}")]
    Api { status: String, message: String },

    /// ZIP 아카이브 처리 실패
    #[error("Archive error: {0}")]
    Archive(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DartError {
    /// DART status 코드를 타입 에러로 변환.
    ///
    /// 주요 코드: 000 정상, 010/011 인증키 문제, 013 조회 결과 없음,
    /// 020 요청 한도 초과, 800 시스템 점검.
    pub fn from_status(status: &str, message: &str) -> Self {
        match status {
            "010" | "011" => DartError::Unauthorized(format!("{} ({})", message, status)),
            "013" => DartError::NotFound(message.to_string()),
            "020" => DartError::RateLimited(message.to_string()),
            _ => DartError::Api {
                status: status.to_string(),
                message: message.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            DartError::from_status("010", "등록되지 않은 키입니다."),
            DartError::Unauthorized(_)
        ));
        assert!(matches!(
            DartError::from_status("013", "조회된 데이타가 없습니다."),
            DartError::NotFound(_)
        ));
        assert!(matches!(
            DartError::from_status("020", "요청 제한을 초과하였습니다."),
            DartError::RateLimited(_)
        ));
        assert!(matches!(
            DartError::from_status("800", "시스템 점검 중입니다."),
            DartError::Api { .. }
        ));
    }
}
