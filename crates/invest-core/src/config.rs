//! 설정 관리.
//!
//! 애플리케이션 설정은 환경변수에서 로드됩니다. `.env` 파일은
//! 바이너리 진입점에서 `dotenvy`로 읽어들인 뒤 이 모듈을 호출합니다.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 설정 로드 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 필수 환경변수 누락
    #[error("필수 환경변수 누락: {0}")]
    MissingEnv(String),

    /// 값 파싱 실패
    #[error("환경변수 파싱 실패: {name}={value}")]
    InvalidValue { name: String, value: String },
}

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 환경변수에서 전체 설정 로드.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env(),
            logging: LoggingConfig::from_env(),
        })
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// 환경변수에서 로드 (`API_HOST`, `API_PORT`, `API_REQUEST_TIMEOUT_SECS`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = std::env::var("API_HOST").unwrap_or(defaults.host);
        let port = match std::env::var("API_PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "API_PORT".to_string(),
                value: v,
            })?,
            Err(_) => defaults.port,
        };
        let request_timeout_secs = std::env::var("API_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        Ok(Self {
            host,
            port,
            request_timeout_secs,
        })
    }
}

/// 데이터베이스 설정.
///
/// `DATABASE_URL`이 없으면 DB 없이 동작합니다 (기업 코드 검색은
/// 인메모리 스냅샷으로 대체).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// 연결 URL (없으면 DB 미사용)
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// 환경변수에서 로드 (`DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`).
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: std::env::var("DATABASE_URL").ok(),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            connection_timeout_secs: defaults.connection_timeout_secs,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 환경변수에서 로드 (`LOG_LEVEL`, `LOG_FORMAT`).
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or(defaults.level),
            format: std::env::var("LOG_FORMAT").unwrap_or(defaults.format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_database_config_defaults() {
        let config = DatabaseConfig::default();
        assert!(config.url.is_none());
        assert_eq!(config.max_connections, 10);
    }
}
