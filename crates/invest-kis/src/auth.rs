//! KIS OAuth 2.0 토큰 수명 주기 관리.
//!
//! 처리 기능:
//! - 접근 토큰 발급 및 갱신 (POST /oauth2/tokenP)
//! - 동시 갱신 직렬화 (요청 병합)
//! - 토큰 발급 1분 1회 제한 준수
//! - 발급 실패 시 만료 임박 토큰으로 폴백
//! - 토큰 폐기 (POST /oauth2/revokeP)

use crate::config::KisConfig;
use crate::error::KisError;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// 토큰 갱신 임계값 (만료까지 남은 시간이 이 값보다 적으면 갱신 시도).
const TOKEN_REFRESH_THRESHOLD_MINUTES: i64 = 10;

/// 토큰 발급 최소 간격 (KIS는 발급을 1분 1회로 제한).
const TOKEN_ISSUE_WINDOW_SECS: i64 = 60;

/// 일시적 실패 시 재시도 전 대기 시간 (밀리초).
const RETRY_DELAY_MS: u64 = 500;

/// KIS OAuth 토큰 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// 접근 토큰
    pub access_token: String,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
    /// 토큰 만료 시간 (초)
    pub expires_in: i64,
    /// 접근 토큰 만료 시각 (KIS 형식: "YYYY-MM-DD HH:MM:SS", KST)
    pub access_token_token_expired: String,
}

/// KIS OAuth 오류 응답 (토큰 발급 실패 시).
#[derive(Debug, Clone, Deserialize)]
pub struct KisOAuthErrorResponse {
    /// 에러 코드 (예: "EGW00103")
    pub error_code: String,
    /// 에러 설명
    pub error_description: String,
}

/// 만료 추적이 포함된 토큰 상태.
#[derive(Debug, Clone)]
pub struct TokenState {
    /// 접근 토큰
    pub access_token: String,
    /// 토큰 타입
    pub token_type: String,
    /// 만료 시각
    pub expires_at: DateTime<Utc>,
    /// 발급 시각
    pub issued_at: DateTime<Utc>,
}

impl TokenState {
    /// 새 토큰 상태 생성.
    pub fn new(access_token: String, token_type: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            token_type,
            expires_at,
            issued_at: Utc::now(),
        }
    }

    /// 토큰이 아직 만료되지 않았는지 확인.
    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }

    /// 갱신 없이 그대로 사용해도 되는지 확인 (임계값 이전).
    pub fn is_fresh(&self) -> bool {
        let threshold = Utc::now() + Duration::minutes(TOKEN_REFRESH_THRESHOLD_MINUTES);
        self.expires_at > threshold
    }

    /// 인증 헤더 값 반환.
    pub fn auth_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// KIS OAuth 토큰 관리자.
///
/// 토큰을 캐시하고 갱신을 조율합니다. KIS는 토큰 발급을 1분에 1회로
/// 제한하므로 동일 `app_key`를 사용하는 모든 호출자는 이 관리자를
/// `Arc`로 공유해야 합니다.
///
/// 갱신 규칙:
/// 1. 캐시된 토큰이 신선하면 (임계값 이전) 그대로 반환
/// 2. 갱신은 `refresh_gate`로 직렬화 - 대기자는 게이트를 잡은 뒤
///    캐시를 재확인하고 앞선 갱신 결과를 재사용 (요청 병합)
/// 3. 직전 발급 시도 후 60초가 지나지 않았으면 업스트림을 호출하지
///    않음 - 아직 유효한 토큰이 있으면 그대로 반환하고, 없으면
///    윈도우가 열릴 때까지 대기
/// 4. 업스트림 한도 초과(EGW00133) 응답 시 유효한 기존 토큰으로 폴백
/// 5. 일시적 실패(네트워크, 5xx)는 1회 재시도 후 에러 전파
pub struct KisTokenManager {
    config: KisConfig,
    client: Client,
    token: RwLock<Option<TokenState>>,
    refresh_gate: Mutex<()>,
    last_issue_attempt: RwLock<Option<DateTime<Utc>>>,
    issue_window: Duration,
}

impl KisTokenManager {
    /// 새로운 토큰 관리자 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `KisError::Network`를 반환합니다.
    pub fn new(config: KisConfig) -> Result<Self, KisError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KisError::Network(format!("HTTP client 생성 실패: {}", e)))?;

        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            last_issue_attempt: RwLock::new(None),
            issue_window: Duration::seconds(TOKEN_ISSUE_WINDOW_SECS),
        })
    }

    /// 발급 윈도우 길이 변경 (테스트용).
    pub fn with_issue_window(mut self, window: Duration) -> Self {
        self.issue_window = window;
        self
    }

    /// 초기 토큰 설정 (DB 등 외부 저장소에서 로드한 토큰 재사용).
    ///
    /// 유효한 토큰이면 API 호출 없이 캐시에 올립니다.
    pub async fn set_cached_token(&self, token: TokenState) {
        if token.is_valid() {
            info!("Setting cached KIS token (expires at: {})", token.expires_at);
            *self.token.write().await = Some(token);
        } else {
            debug!("Ignoring expired cached token");
        }
    }

    /// 현재 캐시된 토큰 반환 (API 호출 없이, 외부 저장용).
    pub async fn cached_token(&self) -> Option<TokenState> {
        self.token.read().await.clone()
    }

    /// 유효한 토큰이 있는지 확인.
    pub async fn has_valid_token(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.is_valid())
            .unwrap_or(false)
    }

    /// 캐시된 토큰 무효화 (업스트림이 토큰을 거부한 경우 호출).
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    /// 유효한 접근 토큰 반환, 필요시 갱신.
    pub async fn get_token(&self) -> Result<TokenState, KisError> {
        // 빠른 경로: 신선한 토큰은 게이트 없이 반환
        {
            let token_guard = self.token.read().await;
            if let Some(ref token) = *token_guard {
                if token.is_fresh() {
                    debug!("Using cached KIS token (expires at: {})", token.expires_at);
                    return Ok(token.clone());
                }
            }
        }

        // 갱신 경로: 한 번에 하나의 갱신만 진행
        let _gate = self.refresh_gate.lock().await;

        // 게이트 대기 중 다른 태스크가 갱신을 마쳤을 수 있으므로 재확인
        {
            let token_guard = self.token.read().await;
            if let Some(ref token) = *token_guard {
                if token.is_fresh() {
                    debug!("Reusing token refreshed by concurrent task");
                    return Ok(token.clone());
                }
            }
        }

        self.refresh_locked().await
    }

    /// 접근 토큰 강제 갱신 (게이트 획득 포함).
    pub async fn refresh_token(&self) -> Result<TokenState, KisError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// 갱신 본체. 호출자는 `refresh_gate`를 잡고 있어야 합니다.
    async fn refresh_locked(&self) -> Result<TokenState, KisError> {
        self.validate_credentials()?;

        // 발급 윈도우 확인: 직전 시도 후 60초가 지나지 않았으면
        // 업스트림을 호출하지 않는다
        if let Some(wait) = self.issue_window_remaining().await {
            let stale = self.token.read().await.clone();
            if let Some(token) = stale.filter(|t| t.is_valid()) {
                warn!(
                    "Token issue window closed for {}s more, serving stale token (expires at: {})",
                    wait.num_seconds(),
                    token.expires_at
                );
                return Ok(token);
            }

            let sleep_for = wait
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(TOKEN_ISSUE_WINDOW_SECS as u64));
            info!(
                "No usable token and issue window closed, waiting {:?} before refresh",
                sleep_for
            );
            tokio::time::sleep(sleep_for).await;
        }

        match self.issue_token().await {
            Ok(token) => Ok(token),
            Err(KisError::RateLimited(msg)) => {
                // 업스트림 한도 초과: 유효한 기존 토큰이 있으면 폴백
                let stale = self.token.read().await.clone();
                if let Some(token) = stale.filter(|t| t.is_valid()) {
                    warn!(
                        "Upstream rate limit on token issue, falling back to stale token \
                         (expires at: {})",
                        token.expires_at
                    );
                    Ok(token)
                } else {
                    Err(KisError::RateLimited(msg))
                }
            }
            Err(e) if e.is_transient() => {
                warn!("Token issue failed ({}), retrying once...", e);
                tokio::time::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                self.issue_token().await
            }
            Err(e) => Err(e),
        }
    }

    /// 발급 윈도우가 닫혀 있으면 남은 시간 반환.
    async fn issue_window_remaining(&self) -> Option<Duration> {
        let last = (*self.last_issue_attempt.read().await)?;
        let reopen = last + self.issue_window;
        let now = Utc::now();
        if now < reopen {
            Some(reopen - now)
        } else {
            None
        }
    }

    /// 앱키/시크릿 형식 검증.
    fn validate_credentials(&self) -> Result<(), KisError> {
        if self.config.app_key.is_empty() || self.config.app_key.len() < 20 {
            error!(
                "유효하지 않은 AppKey (길이: {})",
                self.config.app_key.len()
            );
            return Err(KisError::Config(
                "KIS_APP_KEY 환경변수가 올바르게 설정되지 않았습니다. \
                 한국투자증권에서 발급받은 AppKey를 설정하세요."
                    .to_string(),
            ));
        }
        if self.config.app_secret.is_empty() || self.config.app_secret.len() < 20 {
            error!(
                "유효하지 않은 AppSecret (길이: {})",
                self.config.app_secret.len()
            );
            return Err(KisError::Config(
                "KIS_APP_SECRET 환경변수가 올바르게 설정되지 않았습니다.".to_string(),
            ));
        }
        Ok(())
    }

    /// 업스트림에 토큰 발급 요청.
    ///
    /// 성공 시 캐시를 교체합니다. 요청 전송 시점이 발급 시도로 기록됩니다.
    async fn issue_token(&self) -> Result<TokenState, KisError> {
        info!(
            "Requesting new KIS access token... (AppKey: {}...)",
            &self.config.app_key.chars().take(8).collect::<String>()
        );

        *self.last_issue_attempt.write().await = Some(Utc::now());

        let url = format!("{}/oauth2/tokenP", self.config.rest_base_url());

        #[derive(Serialize)]
        struct TokenRequest {
            grant_type: String,
            appkey: String,
            appsecret: String,
        }

        let request_body = TokenRequest {
            grant_type: "client_credentials".to_string(),
            appkey: self.config.app_key.clone(),
            appsecret: self.config.app_secret.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| KisError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KisError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Token request failed: {} - {}", status, body);
            return Err(map_oauth_error(&self.config.app_key, status, &body));
        }

        let token_resp: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| KisError::Parse(format!("Failed to parse token response: {}", e)))?;

        // KIS 형식 만료 시각 파싱, 실패 시 expires_in으로 계산
        let expires_at = parse_kis_datetime(&token_resp.access_token_token_expired)
            .unwrap_or_else(|| Utc::now() + Duration::seconds(token_resp.expires_in));

        let token_state = TokenState::new(
            token_resp.access_token,
            token_resp.token_type,
            expires_at,
        );

        *self.token.write().await = Some(token_state.clone());

        info!(
            "KIS access token obtained, expires at: {}",
            token_state.expires_at
        );

        Ok(token_state)
    }

    /// 현재 접근 토큰 폐기.
    pub async fn revoke_token(&self) -> Result<(), KisError> {
        let token = {
            let token_guard = self.token.read().await;
            match &*token_guard {
                Some(t) => t.access_token.clone(),
                None => return Ok(()), // No token to revoke
            }
        };

        info!("Revoking KIS access token...");

        let url = format!("{}/oauth2/revokeP", self.config.rest_base_url());

        #[derive(Serialize)]
        struct RevokeRequest {
            appkey: String,
            appsecret: String,
            token: String,
        }

        let request_body = RevokeRequest {
            appkey: self.config.app_key.clone(),
            appsecret: self.config.app_secret.clone(),
            token,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| KisError::Network(e.to_string()))?;

        if !response.status().is_success() {
            warn!("Token revocation may have failed, clearing local state anyway");
        }
        *self.token.write().await = None;

        Ok(())
    }

    /// 인증된 요청을 위한 공통 헤더 생성.
    ///
    /// # Errors
    /// 헤더 값 파싱에 실패하면 `KisError::Parse`를 반환합니다.
    pub async fn build_headers(
        &self,
        tr_id: &str,
    ) -> Result<reqwest::header::HeaderMap, KisError> {
        let token = self.get_token().await?;

        let mut headers = reqwest::header::HeaderMap::new();

        // 상수 문자열은 컴파일 타임에 검증되므로 unwrap() 안전
        headers.insert(
            "Content-Type",
            "application/json; charset=utf-8".parse().unwrap(),
        );
        headers.insert("custtype", "P".parse().unwrap());

        headers.insert(
            "authorization",
            token.auth_header().parse().map_err(|_| {
                KisError::Parse("authorization 헤더에 유효하지 않은 문자 포함".to_string())
            })?,
        );
        headers.insert(
            "appkey",
            self.config.app_key.parse().map_err(|_| {
                KisError::Parse("app_key에 유효하지 않은 문자 포함".to_string())
            })?,
        );
        headers.insert(
            "appsecret",
            self.config.app_secret.parse().map_err(|_| {
                KisError::Parse("app_secret에 유효하지 않은 문자 포함".to_string())
            })?,
        );
        headers.insert(
            "tr_id",
            tr_id.parse().map_err(|_| {
                KisError::Parse(format!("tr_id에 유효하지 않은 문자 포함: {}", tr_id))
            })?,
        );

        Ok(headers)
    }

    /// 설정 반환.
    pub fn config(&self) -> &KisConfig {
        &self.config
    }
}

/// OAuth 실패 응답을 타입 에러로 변환.
fn map_oauth_error(app_key: &str, status: reqwest::StatusCode, body: &str) -> KisError {
    if let Ok(oauth_error) = serde_json::from_str::<KisOAuthErrorResponse>(body) {
        return match oauth_error.error_code.as_str() {
            "EGW00133" => KisError::RateLimited(format!(
                "토큰 발급 한도 초과 (1분 1회): {}",
                oauth_error.error_description
            )),
            "EGW00103" => KisError::Unauthorized(format!(
                "유효하지 않은 AppKey입니다. 환경변수(KIS_APP_KEY, KIS_APP_SECRET)를 \
                 확인하세요. AppKey: {}...",
                &app_key.chars().take(8).collect::<String>()
            )),
            "EGW00102" => KisError::Unauthorized(
                "AppKey가 만료되었습니다. 한국투자증권에서 새 AppKey를 발급받으세요."
                    .to_string(),
            ),
            "EGW00101" => {
                KisError::Unauthorized("AppSecret이 일치하지 않습니다.".to_string())
            }
            _ => KisError::Api {
                code: oauth_error.error_code,
                message: oauth_error.error_description,
            },
        };
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return KisError::RateLimited(body.to_string());
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return KisError::Unauthorized(format!("Token request failed: {}", body));
    }

    KisError::Api {
        code: status.as_u16().to_string(),
        message: body.to_string(),
    }
}

/// KIS 날짜시간 형식 파싱 ("YYYY-MM-DD HH:MM:SS").
///
/// KIS는 KST (한국 표준시, UTC+9)를 사용합니다.
pub(crate) fn parse_kis_datetime(s: &str) -> Option<DateTime<Utc>> {
    use chrono::{NaiveDateTime, TimeZone};
    use chrono_tz::Asia::Seoul;

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()?;
    let kst = Seoul.from_local_datetime(&naive).single()?;
    Some(kst.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn token_expiring_in(minutes: i64) -> TokenState {
        TokenState::new(
            "test".to_string(),
            "Bearer".to_string(),
            Utc::now() + Duration::minutes(minutes),
        )
    }

    #[test]
    fn test_token_state_fresh() {
        let token = token_expiring_in(24 * 60);
        assert!(token.is_valid());
        assert!(token.is_fresh());
    }

    #[test]
    fn test_token_state_stale_but_valid() {
        // 임계값(10분) 이내로 만료가 다가온 토큰
        let token = token_expiring_in(5);
        assert!(token.is_valid());
        assert!(!token.is_fresh());
    }

    #[test]
    fn test_token_state_expired() {
        let token = token_expiring_in(-1);
        assert!(!token.is_valid());
        assert!(!token.is_fresh());
    }

    #[test]
    fn test_token_auth_header() {
        let token = TokenState::new(
            "abc123".to_string(),
            "Bearer".to_string(),
            Utc::now() + Duration::hours(24),
        );
        assert_eq!(token.auth_header(), "Bearer abc123");
    }

    #[test]
    fn test_parse_kis_datetime() {
        let result = parse_kis_datetime("2026-01-28 15:30:00");
        assert!(result.is_some());

        let dt = result.unwrap();
        // KST is UTC+9, so 15:30 KST = 06:30 UTC
        assert_eq!(dt.hour(), 6);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_map_oauth_error_rate_limit() {
        let body = r#"{"error_code":"EGW00133","error_description":"접근토큰 발급 잠시 후 다시 시도하세요"}"#;
        let err = map_oauth_error("PSABCDEFGH", reqwest::StatusCode::FORBIDDEN, body);
        assert!(matches!(err, KisError::RateLimited(_)));
    }

    #[test]
    fn test_map_oauth_error_bad_app_key() {
        let body = r#"{"error_code":"EGW00103","error_description":"유효하지 않은 AppKey입니다."}"#;
        let err = map_oauth_error("PSABCDEFGH", reqwest::StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, KisError::Unauthorized(_)));
    }

    #[test]
    fn test_map_oauth_error_unknown_body() {
        let err = map_oauth_error("key", reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, KisError::Api { .. }));
    }
}
