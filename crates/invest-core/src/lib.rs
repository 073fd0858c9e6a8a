//! # Invest Core
//!
//! 주식 투자 백엔드의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시세/차트 도메인 타입 (Quote, Candle, IndexQuote)
//! - DART 기업 코드 타입 (CorpCode)
//! - 시장 및 차트 주기 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod logging;
pub mod types;

pub use config::*;
pub use logging::*;
pub use types::*;
