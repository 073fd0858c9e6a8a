//! DART 기업 정보 라우트.
//!
//! 기업 검색, 기업개황, 재무제표, 공시 목록 조회와 고유번호 마스터
//! 동기화를 제공합니다. 검색은 DB가 설정되어 있으면 DB를, 아니면
//! 인메모리 스냅샷을 사용합니다.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use invest_core::CorpCode;
use invest_dart::{CompanyProfile, DisclosurePage, FinancialAccount, FsDiv, ReportCode};

use crate::error::ApiError;
use crate::repository::CorpCodeRepository;
use crate::state::AppState;

const SEARCH_LIMIT: i64 = 50;

/// 기업 검색 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// 기업명 검색어 (부분 일치)
    pub name: String,

    /// 상장사만 조회할지 여부 (기본값 false)
    #[serde(default)]
    pub listed_only: bool,
}

/// 재무제표 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct FinancialsQuery {
    /// 사업연도 (예: 2023)
    pub year: u16,

    /// 보고서 코드 ("11011" | "annual" | "half" | "q1" | "q3", 기본값 annual)
    pub report: Option<String>,

    /// 재무제표 구분 ("OFS" | "CFS", 기본값 CFS)
    pub fs_div: Option<String>,
}

/// 공시 목록 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct DisclosureQuery {
    /// 조회 시작일 (YYYY-MM-DD, 기본값 90일 전)
    pub from: Option<NaiveDate>,

    /// 조회 종료일 (YYYY-MM-DD, 기본값 오늘)
    pub to: Option<NaiveDate>,

    /// 페이지 번호 (기본값 1)
    pub page: Option<u32>,
}

/// 고유번호 동기화 결과.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    /// 수신한 기업 수
    pub total: usize,

    /// DB에 반영된 건수 (DB 미설정 시 0)
    pub upserted: usize,
}

/// 종목코드 형태 여부 (6자리 숫자).
fn is_stock_code(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_digit())
}

/// 고유번호 형식 검증 (8자리 숫자).
fn validate_corp_code(code: &str) -> Result<(), ApiError> {
    if code.len() == 8 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "유효하지 않은 고유번호: {code}"
        )))
    }
}

/// 기업명 검색.
///
/// GET /api/v1/corps/search?name=삼성&listed_only=true
pub async fn search_corps(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CorpCode>>, ApiError> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("검색어가 비어 있습니다"));
    }

    if let Some(pool) = &state.db_pool {
        // 6자리 숫자는 종목코드로 간주해 단건 조회
        if is_stock_code(name) {
            let corps = CorpCodeRepository::find_by_stock_code(pool, name)
                .await?
                .into_iter()
                .collect();
            return Ok(Json(corps));
        }

        let corps =
            CorpCodeRepository::search_by_name(pool, name, query.listed_only, SEARCH_LIMIT).await?;
        return Ok(Json(corps));
    }

    // DB 미설정 시 마지막 동기화 스냅샷에서 검색 (종목코드 조회 포함)
    let snapshot = state.corp_snapshot.read().await;
    if is_stock_code(name) {
        let corps: Vec<CorpCode> = snapshot
            .iter()
            .filter(|c| c.stock_code.as_deref() == Some(name))
            .cloned()
            .collect();
        return Ok(Json(corps));
    }

    let corps: Vec<CorpCode> = snapshot
        .iter()
        .filter(|c| c.corp_name.contains(name))
        .filter(|c| !query.listed_only || c.is_listed())
        .take(SEARCH_LIMIT as usize)
        .cloned()
        .collect();
    Ok(Json(corps))
}

/// 기업개황 조회.
///
/// GET /api/v1/corps/{corp_code}/company
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(corp_code): Path<String>,
) -> Result<Json<CompanyProfile>, ApiError> {
    validate_corp_code(&corp_code)?;
    let profile = state.dart()?.get_company(&corp_code).await?;
    Ok(Json(profile))
}

/// 재무제표 조회.
///
/// GET /api/v1/corps/{corp_code}/financials?year=2023&report=annual&fs_div=CFS
pub async fn get_financials(
    State(state): State<Arc<AppState>>,
    Path(corp_code): Path<String>,
    Query(query): Query<FinancialsQuery>,
) -> Result<Json<Vec<FinancialAccount>>, ApiError> {
    validate_corp_code(&corp_code)?;

    if query.year < 2015 {
        // 전체 재무제표 API는 2015년 이후 보고서만 제공
        return Err(ApiError::bad_request("2015년 이후 사업연도만 조회 가능합니다"));
    }

    let report = match query.report.as_deref() {
        Some(raw) => ReportCode::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("유효하지 않은 보고서 코드: {raw}")))?,
        None => ReportCode::Annual,
    };
    let fs_div = match query.fs_div.as_deref() {
        Some(raw) => FsDiv::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("유효하지 않은 재무제표 구분: {raw}")))?,
        None => FsDiv::default(),
    };

    let accounts = state
        .dart()?
        .get_financials(&corp_code, query.year, report, fs_div)
        .await?;
    Ok(Json(accounts))
}

/// 공시 목록 조회.
///
/// GET /api/v1/corps/{corp_code}/disclosures?from=2024-01-01&to=2024-03-31
pub async fn get_disclosures(
    State(state): State<Arc<AppState>>,
    Path(corp_code): Path<String>,
    Query(query): Query<DisclosureQuery>,
) -> Result<Json<DisclosurePage>, ApiError> {
    validate_corp_code(&corp_code)?;

    let to = query.to.unwrap_or_else(|| Utc::now().date_naive());
    let from = query.from.unwrap_or(to - Duration::days(90));
    if from > to {
        return Err(ApiError::bad_request("조회 시작일이 종료일보다 늦습니다"));
    }

    let page = state
        .dart()?
        .get_disclosures(&corp_code, from, to, query.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

/// 고유번호 마스터 동기화.
///
/// POST /api/v1/corps/sync
///
/// DART에서 전체 고유번호 파일을 내려받아 DB에 반영합니다.
/// DB가 설정되지 않은 경우 인메모리 스냅샷만 갱신합니다.
pub async fn sync_corps(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncResponse>, ApiError> {
    let corps = state.dart()?.download_corp_codes().await?;
    let total = corps.len();

    let upserted = match &state.db_pool {
        Some(pool) => {
            let upserted = CorpCodeRepository::upsert_all(pool, &corps).await?;
            let stored = CorpCodeRepository::count(pool).await?;
            info!(stored, "Corp codes in database after sync");
            upserted
        }
        None => 0,
    };

    info!(total, upserted, "Corp code master synced");

    let mut snapshot = state.corp_snapshot.write().await;
    *snapshot = corps;

    Ok(Json(SyncResponse { total, upserted }))
}

/// 기업 정보 라우터 생성.
pub fn corps_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/corps/search", get(search_corps))
        .route("/corps/sync", post(sync_corps))
        .route("/corps/{corp_code}/company", get(get_company))
        .route("/corps/{corp_code}/financials", get(get_financials))
        .route("/corps/{corp_code}/disclosures", get(get_disclosures))
}
