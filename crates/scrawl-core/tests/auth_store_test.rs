#![allow(clippy::unwrap_used)]
// Integration tests for the auth state machine and route guard against a
// wiremock server.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrawl_api::{ApiClient, AuthUser, ClientConfig, Credentials};
use scrawl_core::{
    evaluate, install_login_redirect, AuthStatus, AuthStore, Environment, Location,
    MemoryEnvironment, RouteDecision, RouteGuard,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<ApiClient>, Arc<MemoryEnvironment>) {
    let server = MockServer::start().await;
    let base_url = url::Url::parse(&server.uri()).unwrap();
    let api = Arc::new(ApiClient::new(ClientConfig::new(base_url)).unwrap());
    let env = Arc::new(MemoryEnvironment::new());
    (server, api, env)
}

fn alice() -> AuthUser {
    AuthUser {
        username: "alice".into(),
        email: None,
        authorities: vec!["ROLE_USER".into()],
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "alice".into(),
        password: SecretString::from("x".to_string()),
        remember_me: false,
    }
}

fn store(api: &Arc<ApiClient>, env: &Arc<MemoryEnvironment>) -> AuthStore {
    AuthStore::new(Arc::clone(api), Arc::clone(env) as Arc<dyn Environment>)
}

// ── State machine ───────────────────────────────────────────────────

#[tokio::test]
async fn successful_login_persists_the_user() {
    let (server, api, env) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "alice", "authorities": ["ROLE_USER"]})),
        )
        .mount(&server)
        .await;

    let store = store(&api, &env);
    store.login_user(&credentials()).await.unwrap();

    let state = store.state();
    assert_eq!(state.user, Some(alice()));
    assert_eq!(state.status, AuthStatus::Succeeded);
    assert!(state.session_checked);
    assert_eq!(state.error, None);
    assert_eq!(env.load_user(), Some(alice()));
}

#[tokio::test]
async fn failed_login_records_the_normalized_message() {
    let (server, api, env) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Bad credentials"})))
        .mount(&server)
        .await;

    let store = store(&api, &env);
    store.login_user(&credentials()).await.unwrap_err();

    let state = store.state();
    assert_eq!(state.user, None);
    assert_eq!(state.status, AuthStatus::Failed);
    assert!(state.session_checked);
    assert_eq!(state.error.as_deref(), Some("Bad credentials"));
}

#[tokio::test]
async fn hydrated_user_starts_unchecked() {
    let (_server, api, env) = setup().await;
    env.store_user(&alice());

    let store = store(&api, &env);
    let state = store.state();
    assert_eq!(state.user, Some(alice()));
    assert_eq!(state.status, AuthStatus::Idle);
    assert!(!state.session_checked);
}

#[tokio::test]
async fn verify_failure_is_logged_out_not_an_error() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = store(&api, &env);
    assert_eq!(store.verify_session().await, None);

    let state = store.state();
    assert_eq!(state.user, None);
    assert_eq!(state.status, AuthStatus::Idle);
    assert!(state.session_checked);
    assert_eq!(state.error, None);
    assert_eq!(env.load_user(), None);
}

#[tokio::test]
async fn verify_success_confirms_and_repersists() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "alice", "authorities": ["ROLE_USER"]})),
        )
        .mount(&server)
        .await;

    let store = store(&api, &env);
    assert_eq!(store.verify_session().await, Some(alice()));

    let state = store.state();
    assert_eq!(state.status, AuthStatus::Succeeded);
    assert!(state.session_checked);
}

#[tokio::test]
async fn logout_clears_state_even_when_the_server_call_fails() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = store(&api, &env);
    store.logout_user().await;

    let state = store.state();
    assert_eq!(state.user, None);
    assert_eq!(state.status, AuthStatus::Idle);
    assert!(state.session_checked);
    assert_eq!(env.load_user(), None);
}

#[tokio::test]
async fn change_password_forces_reauthentication() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("POST"))
        .and(path("/api/auth/change-password"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = store(&api, &env);
    store
        .change_password(
            &SecretString::from("old".to_string()),
            &SecretString::from("new".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(store.state().user, None);
    assert_eq!(env.load_user(), None);
}

#[tokio::test]
async fn expired_session_clears_the_live_store_state() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "alice", "authorities": ["ROLE_USER"]})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let auth = Arc::new(store(&api, &env));
    install_login_redirect(
        &auth,
        Arc::clone(&env) as Arc<dyn Environment>,
        vec!["en".into()],
    );

    assert_eq!(auth.verify_session().await, Some(alice()));

    // The server revokes the session; the next call runs the doomed
    // refresh, which fires the expiry sink.
    api.current_user().await.unwrap_err();

    // Both the live state and storage are logged out, so a navigation
    // back to a protected route redirects instead of rendering.
    let state = auth.state();
    assert_eq!(state.user, None);
    assert_eq!(env.load_user(), None);
    assert_eq!(
        evaluate(&state, &Location::new("/notes"), &["en".to_string()]),
        RouteDecision::Redirect("/login?redirect=%2Fnotes".into())
    );
}

// ── Route guard ─────────────────────────────────────────────────────

#[tokio::test]
async fn guard_redirects_anonymous_visitors_with_the_target_preserved() {
    let (_server, api, env) = setup().await;
    let guard = RouteGuard::new(Arc::new(store(&api, &env)), vec!["en".into()]);

    let decision = guard
        .resolve(&Location::new("/shared-links").with_query("page=2"))
        .await;
    assert_eq!(
        decision,
        RouteDecision::Redirect("/login?redirect=%2Fshared-links%3Fpage%3D2".into())
    );
}

#[tokio::test]
async fn guard_verifies_a_stored_user_before_rendering() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "alice", "authorities": ["ROLE_USER"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let auth = Arc::new(store(&api, &env));
    let guard = RouteGuard::new(Arc::clone(&auth), vec!["en".into()]);

    assert_eq!(guard.resolve(&Location::new("/")).await, RouteDecision::Render);

    // Confirmed once for this run: a second navigation renders without
    // another round trip.
    assert_eq!(
        guard.resolve(&Location::new("/notes")).await,
        RouteDecision::Render
    );
    server.verify().await;
}

#[tokio::test]
async fn guard_redirects_when_a_stale_session_fails_verification() {
    let (server, api, env) = setup().await;
    env.store_user(&alice());

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let guard = RouteGuard::new(Arc::new(store(&api, &env)), vec!["en".into()]);

    let decision = guard.resolve(&Location::new("/en/notes")).await;
    assert_eq!(
        decision,
        RouteDecision::Redirect("/en/login?redirect=%2Fen%2Fnotes".into())
    );
}
