//! 한국투자증권 (KIS) 시세 연동 모듈.
//!
//! 이 크레이트는 한국투자증권 OpenAPI를 통해 국내 주식 시세를
//! 조회하는 클라이언트를 제공합니다.
//!
//! # 기능
//!
//! - OAuth 2.0 인증 및 자동 토큰 갱신 (발급 1분 1회 제한 준수)
//! - 현재가 / 기간별 시세 / 업종 지수 조회
//! - 모의투자 환경 지원
//!
//! # API 문서
//!
//! 공식 API 문서: <https://apiportal.koreainvestment.com/>
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use invest_kis::{KisClient, KisConfig, KisTokenManager};
//!
//! let config = KisConfig::from_env().expect("KIS credentials");
//! let auth = KisTokenManager::new(config)?;
//! let client = KisClient::new(auth)?;
//!
//! let quote = client.get_quote("005930").await?;
//! println!("삼성전자: {}", quote.price);
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use auth::{KisTokenManager, TokenState};
pub use client::{tr_id, KisClient};
pub use config::{KisConfig, KisEnvironment};
pub use error::KisError;
