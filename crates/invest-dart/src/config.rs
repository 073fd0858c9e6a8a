//! DART Open API 설정.
//!
//! DART API는 발급받은 인증키(`crtfc_key`)를 모든 요청에 쿼리로 전달합니다.

use serde::{Deserialize, Serialize};

/// DART 운영 API 기본 URL.
const DART_BASE_URL: &str = "https://opendart.fss.or.kr";

/// DART API 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DartConfig {
    /// API 인증키
    pub api_key: String,
    /// 기본 URL 오버라이드 (테스트용)
    pub base_url: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl DartConfig {
    /// 새로운 DART 설정 생성.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: None,
            timeout_secs: 60,
        }
    }

    /// 기본 URL 직접 지정 (목 서버 테스트용).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// 실제 사용할 기본 URL 반환.
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DART_BASE_URL)
    }

    /// 환경 변수에서 설정 생성 (`DART_API_KEY`).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("DART_API_KEY").ok()?;
        Some(Self::new(api_key))
    }
}
