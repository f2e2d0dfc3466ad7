use aivis_browser::testing::{PageScript, ScriptedLauncher};
use aivis_browser::{BrowserPool, PoolSettings, SessionCookie};
use aivis_core::{Credential, Engine, ScanCredentials};
use aivis_session::{
    InMemoryTokenStatusStore, LoginStatus, Platform, SessionCapture, SessionError, SessionState,
    TokenValidator,
};
use std::sync::Arc;
use std::time::Duration;

fn pool(launcher: ScriptedLauncher) -> BrowserPool<ScriptedLauncher> {
    BrowserPool::new(
        launcher,
        PoolSettings {
            capacity: 1,
            max_uses: 50,
            acquire_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(5),
        },
    )
}

fn validator(launcher: ScriptedLauncher) -> TokenValidator<ScriptedLauncher> {
    TokenValidator::new(pool(launcher), Arc::new(InMemoryTokenStatusStore::new()))
        .with_settle_delay(Duration::ZERO)
}

fn token() -> Credential {
    Credential::new("tok").unwrap()
}

#[tokio::test]
async fn test_capture_chatgpt_session() {
    let launcher = ScriptedLauncher::new(
        PageScript {
            redirect_to: Some("https://chat.openai.com/".to_string()),
            cookies: vec![SessionCookie::secure(
                "__Secure-next-auth.session-token",
                "captured-value",
                ".chatgpt.com",
            )],
            ..PageScript::default()
        }
        .with_selectors(&["#prompt-textarea"]),
    );
    let log = launcher.log();
    let capture = SessionCapture::new(launcher);

    let started = capture.start_login_session("u1", Platform::ChatGpt).await.unwrap();
    assert_eq!(started.session_key, "u1-chatgpt");
    assert!(log.contains("navigate:https://chat.openai.com/auth/login"));

    let sessions = capture.active_sessions("u1").await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].state, SessionState::LoginOpened);

    assert_eq!(
        capture.check_login_status("u1", Platform::ChatGpt).await,
        LoginStatus::LoggedIn
    );
    assert_eq!(capture.active_sessions("u1").await[0].state, SessionState::LoggedIn);

    let captured = capture.complete_login("u1", Platform::ChatGpt).await.unwrap();
    assert_eq!(captured.token.expose(), "captured-value");
    assert!(log.contains("browser_close"));
    assert!(capture.active_sessions("u1").await.is_empty());
}

#[tokio::test]
async fn test_pending_until_marker_present() {
    let launcher = ScriptedLauncher::new(PageScript::default());
    let capture = SessionCapture::new(launcher);

    capture.start_login_session("u1", Platform::Perplexity).await.unwrap();
    // Login page is on the success host but has no ask box yet
    assert!(matches!(
        capture.check_login_status("u1", Platform::Perplexity).await,
        LoginStatus::Pending(_)
    ));
    assert_eq!(
        capture.check_login_status("u2", Platform::Perplexity).await,
        LoginStatus::NoSession
    );
}

#[tokio::test]
async fn test_status_check_does_not_block_other_sessions() {
    let launcher = ScriptedLauncher::new(PageScript {
        selector_wait: Duration::from_millis(400),
        ..PageScript::default()
    });
    let capture = Arc::new(SessionCapture::new(launcher));
    capture.start_login_session("u1", Platform::Perplexity).await.unwrap();

    let checking = {
        let capture = Arc::clone(&capture);
        tokio::spawn(async move { capture.check_login_status("u1", Platform::Perplexity).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let listed = tokio::time::timeout(Duration::from_millis(200), capture.active_sessions("u1"))
        .await
        .expect("session map stayed locked during the status check");
    assert_eq!(listed.len(), 1);

    assert!(matches!(checking.await.unwrap(), LoginStatus::Pending(_)));
}

#[tokio::test]
async fn test_complete_without_credentials_fails_and_cleans_up() {
    let launcher = ScriptedLauncher::new(PageScript {
        cookies: vec![SessionCookie::secure("_cfuvid", "x", ".chatgpt.com")],
        ..PageScript::default()
    });
    let log = launcher.log();
    let capture = SessionCapture::new(launcher);

    capture.start_login_session("u1", Platform::ChatGpt).await.unwrap();
    let err = capture.complete_login("u1", Platform::ChatGpt).await.unwrap_err();
    assert!(matches!(err, SessionError::CaptureFailed(_)));
    assert!(log.contains("browser_close"));
    assert!(matches!(
        capture.complete_login("u1", Platform::ChatGpt).await,
        Err(SessionError::NoSession)
    ));
}

#[tokio::test]
async fn test_restart_replaces_previous_session() {
    let launcher = ScriptedLauncher::new(PageScript::default());
    let observer = launcher.clone();
    let capture = SessionCapture::new(launcher);

    capture.start_login_session("u1", Platform::ChatGpt).await.unwrap();
    capture.start_login_session("u1", Platform::ChatGpt).await.unwrap();
    capture.start_login_session("u1", Platform::Perplexity).await.unwrap();
    capture.start_login_session("u10", Platform::ChatGpt).await.unwrap();

    assert_eq!(observer.launches(), 4);
    let sessions = capture.active_sessions("u1").await;
    assert_eq!(sessions.len(), 2);

    capture.close_login_session("u1", Platform::ChatGpt).await;
    capture.close_login_session("u1", Platform::ChatGpt).await;
    assert_eq!(capture.active_sessions("u1").await.len(), 1);
}

#[tokio::test]
async fn test_validate_chatgpt_valid_and_expired() {
    let valid = validator(ScriptedLauncher::new(
        PageScript::default().with_selectors(&["#prompt-textarea"]),
    ));
    let result = valid.validate(Engine::ChatGpt, Some(&token())).await;
    assert!(result.valid, "{}", result.message);

    let expired = validator(ScriptedLauncher::new(PageScript {
        redirect_to: Some("https://chatgpt.com/auth/login".to_string()),
        ..PageScript::default()
    }));
    let result = expired.validate(Engine::ChatGpt, Some(&token())).await;
    assert!(!result.valid);
    assert!(result.message.contains("expired"));
}

#[tokio::test]
async fn test_validate_perplexity() {
    let signed_in = validator(ScriptedLauncher::new(
        PageScript::default().with_selectors(&["textarea[placeholder*=\"Ask\"]"]),
    ));
    assert!(signed_in.validate(Engine::Perplexity, Some(&token())).await.valid);

    let signed_out = validator(ScriptedLauncher::new(PageScript::default().with_selectors(&[
        "textarea[placeholder*=\"Ask\"]",
        "button[data-testid=\"sign-in-button\"]",
    ])));
    assert!(!signed_out.validate(Engine::Perplexity, Some(&token())).await.valid);
}

#[tokio::test]
async fn test_page_error_is_invalid() {
    let launcher = ScriptedLauncher::new(PageScript {
        fail_navigation: true,
        ..PageScript::default()
    });
    let result = validator(launcher).validate(Engine::ChatGpt, Some(&token())).await;
    assert!(!result.valid);
    assert!(result.message.starts_with("Validation error:"));
}

#[tokio::test]
async fn test_validate_all_records_status() {
    let validator = validator(ScriptedLauncher::new(
        PageScript::default().with_selectors(&["#prompt-textarea"]),
    ));
    let credentials = ScanCredentials {
        chatgpt_session: Some(token()),
        serp_api_key: Credential::new("serp"),
        ..ScanCredentials::default()
    };

    let before = validator.cached_status("u1").await.unwrap();
    assert!(before.last_validation.is_none());
    assert!(before.engines.iter().all(|e| e.valid.is_none()));

    let results = validator.validate_all("u1", &credentials).await.unwrap();
    assert_eq!(results.len(), 3);

    let status = validator.cached_status("u1").await.unwrap();
    let by_engine = |engine: Engine| {
        status
            .engines
            .iter()
            .find(|e| e.engine == engine)
            .and_then(|e| e.valid)
    };
    assert_eq!(by_engine(Engine::ChatGpt), Some(true));
    assert_eq!(by_engine(Engine::Perplexity), Some(false));
    assert_eq!(by_engine(Engine::GoogleAio), Some(true));
    assert!(status.last_validation.is_some());
}

#[tokio::test]
async fn test_missing_credential_message() {
    let validator = validator(ScriptedLauncher::new(PageScript::default()));
    let result = validator.validate(Engine::ChatGpt, None).await;
    assert!(!result.valid);
    assert_eq!(result.message, "No session token provided");
}
