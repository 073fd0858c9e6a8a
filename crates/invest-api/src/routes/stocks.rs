//! 국내 주식 시세 라우트.
//!
//! KIS Open API를 통해 현재가, 기간별 차트, 업종 지수를 조회합니다.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use serde::Deserialize;
use std::sync::Arc;

use invest_core::{Candle, ChartPeriod, IndexQuote, Quote};

use crate::error::ApiError;
use crate::state::AppState;

/// 차트 조회 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct CandleQuery {
    /// 차트 주기 ("day" | "week" | "month" | "year", 기본값 day)
    pub period: Option<String>,

    /// 조회 건수 (from/to 미지정 시 사용, 기본값 100)
    pub count: Option<u32>,

    /// 조회 시작일 (YYYY-MM-DD)
    pub from: Option<NaiveDate>,

    /// 조회 종료일 (YYYY-MM-DD)
    pub to: Option<NaiveDate>,
}

/// 종목코드 형식 검증 (6자리 숫자).
fn validate_stock_code(code: &str) -> Result<(), ApiError> {
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "유효하지 않은 종목코드: {code}"
        )))
    }
}

/// 현재가 조회.
///
/// GET /api/v1/stocks/{code}/quote
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    validate_stock_code(&code)?;
    let quote = state.kis()?.get_quote(&code).await?;
    Ok(Json(quote))
}

/// 기간별 차트 조회.
///
/// GET /api/v1/stocks/{code}/candles?period=day&count=100
/// GET /api/v1/stocks/{code}/candles?period=week&from=2024-01-01&to=2024-06-30
pub async fn get_candles(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    validate_stock_code(&code)?;

    let period = match query.period.as_deref() {
        Some(raw) => ChartPeriod::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("유효하지 않은 주기: {raw}")))?,
        None => ChartPeriod::Day,
    };

    let count = query.count.unwrap_or(100).min(100).max(1);
    let today = Utc::now().with_timezone(&Seoul).date_naive();

    let (from, to) = match (query.from, query.to) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (from, today),
        (None, Some(to)) => (to - lookback(period, count), to),
        (None, None) => (today - lookback(period, count), today),
    };

    if from > to {
        return Err(ApiError::bad_request("조회 시작일이 종료일보다 늦습니다"));
    }

    let candles = state.kis()?.get_candles(&code, period, from, to).await?;
    Ok(Json(candles))
}

/// 조회 건수에 해당하는 달력 구간.
fn lookback(period: ChartPeriod, count: u32) -> Duration {
    let days = match period {
        ChartPeriod::Day => i64::from(count),
        ChartPeriod::Week => i64::from(count) * 7,
        ChartPeriod::Month => i64::from(count) * 31,
        ChartPeriod::Year => i64::from(count) * 366,
    };
    Duration::days(days)
}

/// 업종 지수 조회.
///
/// GET /api/v1/indices/{code}
pub async fn get_index(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<IndexQuote>, ApiError> {
    if code.is_empty() || code.len() > 4 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(format!(
            "유효하지 않은 업종 코드: {code}"
        )));
    }
    let quote = state.kis()?.get_index_quote(&code).await?;
    Ok(Json(quote))
}

/// 주식 시세 라우터 생성.
pub fn stocks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks/{code}/quote", get(get_quote))
        .route("/stocks/{code}/candles", get(get_candles))
        .route("/indices/{code}", get(get_index))
}
