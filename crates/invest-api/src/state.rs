//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use invest_core::CorpCode;
use invest_dart::DartClient;
use invest_kis::KisClient;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 애플리케이션 공유 상태.
///
/// KIS/DART 클라이언트는 서버 기동 시 한 번 생성되어 모든 핸들러가
/// 공유합니다. KIS는 토큰 발급을 1분에 1회로 제한하므로 요청마다 새
/// 클라이언트를 만들면 한도에 걸립니다. 토큰 관리자 공유가 필수입니다.
#[derive(Clone)]
pub struct AppState {
    /// KIS 시세 클라이언트 (미설정 시 None)
    pub kis_client: Option<Arc<KisClient>>,

    /// DART 공시 클라이언트 (미설정 시 None)
    pub dart_client: Option<Arc<DartClient>>,

    /// 데이터베이스 연결 풀 (PostgreSQL, 선택적)
    pub db_pool: Option<sqlx::PgPool>,

    /// 기업 코드 인메모리 스냅샷.
    ///
    /// DB가 없는 환경에서 기업 코드 동기화 결과를 보관해
    /// 검색 엔드포인트가 동작하도록 합니다.
    pub corp_snapshot: Arc<RwLock<Vec<CorpCode>>>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(
        kis_client: Option<Arc<KisClient>>,
        dart_client: Option<Arc<DartClient>>,
        db_pool: Option<sqlx::PgPool>,
    ) -> Self {
        Self {
            kis_client,
            dart_client,
            db_pool,
            corp_snapshot: Arc::new(RwLock::new(Vec::new())),
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// KIS 클라이언트 반환, 미설정이면 503.
    pub fn kis(&self) -> Result<&Arc<KisClient>, ApiError> {
        self.kis_client
            .as_ref()
            .ok_or_else(|| ApiError::not_configured("KIS 연동이 설정되지 않았습니다"))
    }

    /// DART 클라이언트 반환, 미설정이면 503.
    pub fn dart(&self) -> Result<&Arc<DartClient>, ApiError> {
        self.dart_client
            .as_ref()
            .ok_or_else(|| ApiError::not_configured("DART 연동이 설정되지 않았습니다"))
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
