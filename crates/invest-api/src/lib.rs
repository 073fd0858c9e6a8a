//! 주식 투자 백엔드 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - KIS 시세 조회 엔드포인트
//! - DART 기업 정보 엔드포인트
//! - 헬스 체크 엔드포인트
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`repository`]: DB 접근 계층
//! - [`error`]: HTTP 에러 응답 변환

pub mod error;
pub mod repository;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiErrorResponse};
pub use routes::create_api_router;
pub use state::AppState;
