//! 한국투자증권 (KIS) API 설정.
//!
//! KIS API는 app_key와 app_secret을 사용한 OAuth 2.0 인증이 필요합니다.
//! 실전/모의 환경별로 기본 URL이 다르며, 테스트에서는 `base_url`을
//! 직접 지정해 목 서버로 대체할 수 있습니다.

use serde::{Deserialize, Serialize};

/// KIS API 환경 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KisEnvironment {
    /// 실전투자
    Real,
    /// 모의투자
    Paper,
}

impl KisEnvironment {
    /// 이 환경의 REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            KisEnvironment::Real => "https://openapi.koreainvestment.com:9443",
            KisEnvironment::Paper => "https://openapivts.koreainvestment.com:29443",
        }
    }

    /// 문자열에서 파싱.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "real" | "prod" => Some(KisEnvironment::Real),
            "paper" | "mock" | "vts" => Some(KisEnvironment::Paper),
            _ => None,
        }
    }
}

impl Default for KisEnvironment {
    fn default() -> Self {
        KisEnvironment::Paper
    }
}

/// KIS API 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KisConfig {
    /// 앱키
    pub app_key: String,
    /// 앱시크릿
    pub app_secret: String,
    /// 환경 (실전/모의)
    pub environment: KisEnvironment,
    /// 기본 URL 오버라이드 (테스트용, 없으면 환경 기본값 사용)
    pub base_url: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl KisConfig {
    /// 새로운 KIS 설정 생성.
    pub fn new(app_key: String, app_secret: String) -> Self {
        Self {
            app_key,
            app_secret,
            environment: KisEnvironment::default(),
            base_url: None,
            timeout_secs: 30,
        }
    }

    /// 환경 설정.
    pub fn with_environment(mut self, env: KisEnvironment) -> Self {
        self.environment = env;
        self
    }

    /// 기본 URL 직접 지정 (목 서버 테스트용).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// 실제 사용할 REST 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.rest_base_url())
    }

    /// 환경 변수에서 설정 생성.
    ///
    /// # 환경 변수
    /// - `KIS_APP_KEY`: 앱키
    /// - `KIS_APP_SECRET`: 앱시크릿
    /// - `KIS_ENV`: "real" | "paper" (기본값: paper)
    pub fn from_env() -> Option<Self> {
        let app_key = std::env::var("KIS_APP_KEY").ok()?;
        let app_secret = std::env::var("KIS_APP_SECRET").ok()?;
        let environment = std::env::var("KIS_ENV")
            .ok()
            .and_then(|s| KisEnvironment::from_str(&s))
            .unwrap_or_default();

        Some(Self {
            app_key,
            app_secret,
            environment,
            base_url: None,
            timeout_secs: 30,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_base_url() {
        assert!(KisEnvironment::Real.rest_base_url().contains("openapi."));
        assert!(KisEnvironment::Paper.rest_base_url().contains("openapivts."));
    }

    #[test]
    fn test_base_url_override() {
        let config = KisConfig::new("key".to_string(), "secret".to_string())
            .with_base_url("http://127.0.0.1:9999");
        assert_eq!(config.rest_base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!(KisEnvironment::from_str("real"), Some(KisEnvironment::Real));
        assert_eq!(
            KisEnvironment::from_str("PAPER"),
            Some(KisEnvironment::Paper)
        );
        assert_eq!(KisEnvironment::from_str("staging"), None);
    }
}
