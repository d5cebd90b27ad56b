use std::sync::Arc;

use cd_auth::controller::{CONNECTION_FALLBACK_MESSAGE, LOGIN_FALLBACK_MESSAGE};
use cd_auth::{
    ApiClient, ClientConfig, Credentials, FileTokenStore, FlagNavigator, MemoryTokenStore,
    SessionController,
    SessionState, SessionStatus, TokenSlot, TokenStore, User, UserPatch, roles,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    store: MemoryTokenStore,
    navigator: Arc<FlagNavigator>,
    session: SessionController,
}

async fn harness(slots: &[(TokenSlot, &str)]) -> Harness {
    let server = MockServer::start().await;
    let store = MemoryTokenStore::with_slots(slots.iter().copied());
    let navigator = Arc::new(FlagNavigator::new());
    let config = ClientConfig::from_base_url(&server.uri()).unwrap();
    let api = ApiClient::new(config, Arc::new(store.clone()), navigator.clone()).unwrap();
    Harness {
        server,
        store,
        navigator,
        session: SessionController::new(api),
    }
}

fn testuser() -> Credentials {
    Credentials::new("testuser", "password123")
}

async fn mount_login_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"usuario": "testuser", "contrasena": "password123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": true,
            "mensaje": "Autenticación exitosa",
            "datos": {
                "accessToken": "A1",
                "refreshToken": "R1",
                "tipoToken": "Bearer",
                "usuario": {"usuario": "testuser", "roles": ["Contador"]}
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_success_authenticates_and_persists() {
    let h = harness(&[]).await;
    mount_login_success(&h.server).await;

    let outcome = h.session.login(&testuser()).await;

    assert!(outcome.is_success());
    assert!(h.session.is_authenticated());
    assert!(h.session.has_role(roles::CONTADOR));
    assert!(!h.session.has_role(roles::ADMIN));
    assert_eq!(h.store.get(TokenSlot::AccessToken).await.as_deref(), Some("A1"));
    assert_eq!(h.store.get(TokenSlot::RefreshToken).await.as_deref(), Some("R1"));

    let cached: User = serde_json::from_str(&h.store.get(TokenSlot::User).await.unwrap()).unwrap();
    assert_eq!(cached.usuario, "testuser");

    let state = h.session.snapshot();
    assert_eq!(state.access_token.as_deref(), Some("A1"));
    assert_eq!(state.refresh_token.as_deref(), Some("R1"));
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_login_rejection_leaves_store_untouched() {
    let h = harness(&[]).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": false,
            "error": "credenciales inválidas"
        })))
        .mount(&h.server)
        .await;

    let outcome = h.session.login(&testuser()).await;

    assert_eq!(outcome.error(), Some("credenciales inválidas"));
    let state = h.session.snapshot();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert_eq!(state.error.as_deref(), Some("credenciales inválidas"));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_login_rejection_without_message_uses_fallback() {
    let h = harness(&[]).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exito": false})))
        .mount(&h.server)
        .await;

    let outcome = h.session.login(&testuser()).await;
    assert_eq!(outcome.error(), Some(LOGIN_FALLBACK_MESSAGE));
    assert_eq!(h.session.snapshot().error.as_deref(), Some(LOGIN_FALLBACK_MESSAGE));
}

#[tokio::test]
async fn test_login_unauthorized_uses_server_message_without_refresh() {
    let h = harness(&[(TokenSlot::RefreshToken, "STALE")]).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "exito": false,
            "error": "Usuario o contraseña incorrectos",
            "codigoError": "AUTH_ERROR"
        })))
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/renovar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let outcome = h.session.login(&testuser()).await;

    assert_eq!(outcome.error(), Some("Usuario o contraseña incorrectos"));
    assert!(!h.session.is_authenticated());
    assert_eq!(h.navigator.pending(), 0);
}

#[tokio::test]
async fn test_login_transport_failure_is_reported() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let store = MemoryTokenStore::new();
    let config = ClientConfig::from_base_url(&uri).unwrap();
    let api = ApiClient::new(config, Arc::new(store.clone()), Arc::new(FlagNavigator::new())).unwrap();
    let session = SessionController::new(api);

    let outcome = session.login(&testuser()).await;

    let message = outcome.error().unwrap();
    assert_eq!(message, CONNECTION_FALLBACK_MESSAGE);
    let state = session.snapshot();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert_eq!(state.error.as_deref(), Some(message));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_logout_clears_everything_even_when_endpoint_fails() {
    let h = harness(&[]).await;
    mount_login_success(&h.server).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    assert!(h.session.login(&testuser()).await.is_success());
    h.session.logout().await;

    assert_eq!(h.session.snapshot(), SessionState::unauthenticated());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_logout_with_unreachable_backend() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let store = MemoryTokenStore::with_slots([
        (TokenSlot::AccessToken, "A1"),
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, r#"{"usuario":"ana"}"#),
    ]);
    let config = ClientConfig::from_base_url(&uri).unwrap();
    let api = ApiClient::new(config, Arc::new(store.clone()), Arc::new(FlagNavigator::new())).unwrap();
    let session = SessionController::new(api);

    session.logout().await;

    assert!(!session.is_authenticated());
    assert!(!session.is_loading());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_update_user_after_login_preserves_roles() {
    let h = harness(&[]).await;
    mount_login_success(&h.server).await;
    h.session.login(&testuser()).await;

    let merged = h.session.update_user(UserPatch::email("x")).await.unwrap();

    assert_eq!(merged.email.as_deref(), Some("x"));
    assert_eq!(merged.roles, vec!["Contador"]);
    assert!(h.session.has_role(roles::CONTADOR));

    let cached: User = serde_json::from_str(&h.store.get(TokenSlot::User).await.unwrap()).unwrap();
    assert_eq!(cached.email.as_deref(), Some("x"));
    assert_eq!(cached.roles, vec!["Contador"]);
}

#[tokio::test]
async fn test_bootstrap_without_access_token_makes_no_request() {
    let h = harness(&[
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, r#"{"usuario":"ana"}"#),
    ])
    .await;

    let state = h.session.bootstrap().await;

    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bootstrap_without_cached_user_makes_no_request() {
    let h = harness(&[(TokenSlot::AccessToken, "A1")]).await;

    let state = h.session.bootstrap().await;

    assert!(!state.is_authenticated());
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bootstrap_prefers_server_user() {
    let h = harness(&[
        (TokenSlot::AccessToken, "A1"),
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, r#"{"usuario":"ana","roles":["Empleado"]}"#),
    ])
    .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": true,
            "datos": {"usuario": {
                "usuario": "ana",
                "roles": ["Administrador"],
                "puedeVerTodosClientes": 1
            }}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.session.bootstrap().await;

    assert!(state.is_authenticated());
    assert!(state.has_role(roles::ADMIN));
    assert!(!state.has_role(roles::EMPLEADO));
    assert!(state.can_view_all_clients());
    assert_eq!(state.access_token.as_deref(), Some("A1"));
    assert_eq!(state.refresh_token.as_deref(), Some("R1"));

    let cached: User = serde_json::from_str(&h.store.get(TokenSlot::User).await.unwrap()).unwrap();
    assert_eq!(cached.roles, vec!["Administrador"]);
}

#[tokio::test]
async fn test_bootstrap_falls_back_to_cached_user() {
    let h = harness(&[
        (TokenSlot::AccessToken, "A1"),
        (TokenSlot::User, r#"{"usuario":"ana","roles":["Empleado"]}"#),
    ])
    .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "exito": false,
            "error": "Error al obtener perfil"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.session.bootstrap().await;

    assert!(state.is_authenticated());
    assert!(state.has_role(roles::EMPLEADO));
    assert_eq!(state.access_token.as_deref(), Some("A1"));
    assert!(state.refresh_token.is_none());
}

#[tokio::test]
async fn test_bootstrap_discards_corrupt_cache() {
    let h = harness(&[
        (TokenSlot::AccessToken, "A1"),
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, "{not json"),
    ])
    .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    let state = h.session.bootstrap().await;

    assert_eq!(state, SessionState::unauthenticated());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_bootstrap_renews_expired_token() {
    let h = harness(&[
        (TokenSlot::AccessToken, "OLD"),
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, r#"{"usuario":"ana"}"#),
    ])
    .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .and(header("Authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/renovar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": true,
            "datos": {"accessToken": "NEW"}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .and(header("Authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": true,
            "datos": {"usuario": {"usuario": "ana", "roles": ["Contador"]}}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.session.bootstrap().await;

    assert!(state.is_authenticated());
    assert_eq!(state.access_token.as_deref(), Some("NEW"));
    assert!(state.has_role(roles::CONTADOR));
}

#[tokio::test]
async fn test_bootstrap_with_revoked_session_logs_out() {
    let h = harness(&[
        (TokenSlot::AccessToken, "OLD"),
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, r#"{"usuario":"ana"}"#),
    ])
    .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/renovar"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.session.bootstrap().await;

    assert_eq!(state, SessionState::unauthenticated());
    assert!(h.store.is_empty());
    assert_eq!(h.navigator.pending(), 1);
}

#[tokio::test]
async fn test_bootstrap_cached_fallback_keeps_renewed_token() {
    let h = harness(&[
        (TokenSlot::AccessToken, "OLD"),
        (TokenSlot::RefreshToken, "R1"),
        (TokenSlot::User, r#"{"usuario":"ana","roles":["Empleado"]}"#),
    ])
    .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .and(header("Authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/renovar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": true,
            "datos": {"accessToken": "NEW"}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/perfil"))
        .and(header("Authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h.session.bootstrap().await;

    assert!(state.is_authenticated());
    assert!(state.has_role(roles::EMPLEADO));
    assert_eq!(state.access_token.as_deref(), Some("NEW"));
    assert_eq!(h.store.get(TokenSlot::AccessToken).await.as_deref(), Some("NEW"));
    assert_eq!(state.refresh_token.as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_concurrent_logins_over_file_store_both_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exito": true,
            "datos": {
                "accessToken": "A1",
                "refreshToken": "R1",
                "usuario": {"usuario": "testuser", "roles": ["Contador"]}
            }
        })))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(temp.path().join("session")).await.unwrap();
    let config = ClientConfig::from_base_url(&server.uri()).unwrap();
    let api = ApiClient::new(config, Arc::new(store.clone()), Arc::new(FlagNavigator::new())).unwrap();
    let session = SessionController::new(api);
    let credentials = testuser();

    for _ in 0..10 {
        let (a, b) = tokio::join!(session.login(&credentials), session.login(&credentials));
        assert!(a.is_success(), "{:?}", a.error());
        assert!(b.is_success(), "{:?}", b.error());
        assert!(session.is_authenticated());
    }
    assert_eq!(store.get(TokenSlot::AccessToken).await.as_deref(), Some("A1"));
}
