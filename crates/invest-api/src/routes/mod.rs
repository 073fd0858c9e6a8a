//! API 라우트 정의.
//!
//! ## 엔드포인트 목록
//!
//! ### Health
//! - `GET /health` - 단순 헬스 체크
//! - `GET /health/ready` - 컴포넌트별 상태 확인
//!
//! ### 주식 시세 (KIS)
//! - `GET /api/v1/stocks/{code}/quote` - 현재가
//! - `GET /api/v1/stocks/{code}/candles` - 기간별 차트
//! - `GET /api/v1/indices/{code}` - 업종 지수
//!
//! ### 기업 정보 (DART)
//! - `GET /api/v1/corps/search` - 기업명 검색
//! - `GET /api/v1/corps/{corp_code}/company` - 기업개황
//! - `GET /api/v1/corps/{corp_code}/financials` - 재무제표
//! - `GET /api/v1/corps/{corp_code}/disclosures` - 공시 목록
//! - `POST /api/v1/corps/sync` - 고유번호 마스터 동기화

pub mod corps;
pub mod health;
pub mod stocks;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::health_router())
        .nest(
            "/api/v1",
            Router::new()
                .merge(stocks::stocks_router())
                .merge(corps::corps_router()),
        )
}
