//! KIS 토큰 수명 주기 통합 테스트.
//!
//! mockito 목 서버로 토큰 발급 엔드포인트를 대체하여
//! 갱신 직렬화, 발급 윈도우, 폴백 동작을 검증합니다.

use chrono::{Duration, Utc};
use invest_kis::{KisConfig, KisError, KisTokenManager, TokenState};
use std::sync::Arc;

const APP_KEY: &str = "PSTESTAPPKEY01234567890";
const APP_SECRET: &str = "TESTAPPSECRET01234567890TESTAPPSECRET";

fn test_config(base_url: &str) -> KisConfig {
    KisConfig::new(APP_KEY.to_string(), APP_SECRET.to_string()).with_base_url(base_url)
}

/// 만료 시각 문자열을 비워 보내면 expires_in으로 만료를 계산한다.
fn token_body(access_token: &str, expires_in: i64) -> String {
    format!(
        r#"{{"access_token":"{}","token_type":"Bearer","expires_in":{},"access_token_token_expired":""}}"#,
        access_token, expires_in
    )
}

const RATE_LIMIT_BODY: &str =
    r#"{"error_code":"EGW00133","error_description":"접근토큰 발급 잠시 후 다시 시도하세요(1분당 1회)"}"#;

#[tokio::test]
async fn concurrent_get_token_issues_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("tok-1", 86400))
        .expect(1)
        .create_async()
        .await;

    let manager = Arc::new(KisTokenManager::new(test_config(&server.url())).unwrap());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let m = Arc::clone(&manager);
        handles.push(tokio::spawn(async move { m.get_token().await }));
    }

    for handle in handles {
        let token = handle.await.unwrap().expect("token");
        assert_eq!(token.access_token, "tok-1");
    }

    // 8개 동시 요청이 업스트림 호출 1회로 병합되어야 한다
    mock.assert_async().await;
}

#[tokio::test]
async fn fresh_cached_token_skips_upstream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let manager = KisTokenManager::new(test_config(&server.url())).unwrap();
    manager
        .set_cached_token(TokenState::new(
            "cached".to_string(),
            "Bearer".to_string(),
            Utc::now() + Duration::hours(12),
        ))
        .await;

    let token = manager.get_token().await.expect("token");
    assert_eq!(token.access_token, "cached");
    mock.assert_async().await;
}

#[tokio::test]
async fn upstream_rate_limit_falls_back_to_stale_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(RATE_LIMIT_BODY)
        .expect(1)
        .create_async()
        .await;

    let manager = KisTokenManager::new(test_config(&server.url())).unwrap();

    // 임계값(10분) 이내로 만료가 다가왔지만 아직 유효한 토큰
    manager
        .set_cached_token(TokenState::new(
            "stale".to_string(),
            "Bearer".to_string(),
            Utc::now() + Duration::minutes(5),
        ))
        .await;

    let token = manager.get_token().await.expect("stale fallback");
    assert_eq!(token.access_token, "stale");
    mock.assert_async().await;
}

#[tokio::test]
async fn upstream_rate_limit_without_token_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(RATE_LIMIT_BODY)
        .expect(1)
        .create_async()
        .await;

    let manager = KisTokenManager::new(test_config(&server.url())).unwrap();

    let err = manager.get_token().await.unwrap_err();
    assert!(matches!(err, KisError::RateLimited(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn issue_window_serves_stale_without_upstream_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("tok-1", 86400))
        .expect(1)
        .create_async()
        .await;

    // 윈도우를 10분으로 늘려 두 번째 발급이 확실히 윈도우 안에 들게 한다
    let manager = KisTokenManager::new(test_config(&server.url()))
        .unwrap()
        .with_issue_window(Duration::minutes(10));

    let first = manager.get_token().await.expect("initial token");
    assert_eq!(first.access_token, "tok-1");

    // 첫 토큰을 만료 임박 토큰으로 교체하면 갱신 경로를 타지만,
    // 발급 윈도우가 닫혀 있으므로 업스트림 호출 없이 그대로 반환되어야 한다
    manager
        .set_cached_token(TokenState::new(
            "stale".to_string(),
            "Bearer".to_string(),
            Utc::now() + Duration::minutes(5),
        ))
        .await;

    let second = manager.get_token().await.expect("stale within window");
    assert_eq!(second.access_token, "stale");

    mock.assert_async().await;
}

#[tokio::test]
async fn issue_window_without_token_waits_then_refreshes() {
    let mut server = mockito::Server::new_async().await;

    // 첫 시도는 재시도 포함 2회 모두 실패시켜 토큰 없이 윈도우만 닫는다
    let fail_mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(500)
        .with_body("internal error")
        .expect(2)
        .create_async()
        .await;

    let manager = KisTokenManager::new(test_config(&server.url()))
        .unwrap()
        .with_issue_window(Duration::seconds(3));

    let err = manager.get_token().await.unwrap_err();
    assert!(matches!(err, KisError::Api { .. }));
    fail_mock.assert_async().await;
    fail_mock.remove_async().await;

    let success_mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_body("tok-after-wait", 86400))
        .expect(1)
        .create_async()
        .await;

    // 토큰이 없고 윈도우가 닫혀 있으므로 윈도우가 열릴 때까지 기다린 뒤
    // 정확히 1회 발급해야 한다
    let started = std::time::Instant::now();
    let token = manager.get_token().await.expect("token after window");
    let elapsed = started.elapsed();

    assert_eq!(token.access_token, "tok-after-wait");
    assert!(
        elapsed >= std::time::Duration::from_secs(2),
        "expected to wait out the issue window, waited {:?}",
        elapsed
    );
    success_mock.assert_async().await;
}

#[tokio::test]
async fn transient_failure_retries_once_then_errors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(500)
        .with_body("internal error")
        .expect(2)
        .create_async()
        .await;

    let manager = KisTokenManager::new(test_config(&server.url())).unwrap();

    let err = manager.get_token().await.unwrap_err();
    assert!(matches!(err, KisError::Api { .. }));

    // 1회 재시도까지 총 2회 호출
    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_fails_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error_code":"EGW00103","error_description":"유효하지 않은 AppKey입니다."}"#)
        .expect(1)
        .create_async()
        .await;

    let manager = KisTokenManager::new(test_config(&server.url())).unwrap();

    let err = manager.get_token().await.unwrap_err();
    assert!(matches!(err, KisError::Unauthorized(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn invalid_app_key_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth2/tokenP")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let config = KisConfig::new("short".to_string(), APP_SECRET.to_string())
        .with_base_url(server.url());
    let manager = KisTokenManager::new(config).unwrap();

    let err = manager.get_token().await.unwrap_err();
    assert!(matches!(err, KisError::Config(_)));
    mock.assert_async().await;
}
