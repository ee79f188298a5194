use axum::http::Request;

use super::*;

fn session(is_logged_in: bool, user_id: Option<Uuid>) -> SessionRecord {
    let mut record = SessionRecord::fresh(time::Duration::hours(1));
    record.is_logged_in = is_logged_in;
    record.user_id = user_id;
    record
}

// =============================================================================
// AuthState::from_session
// =============================================================================

#[test]
fn logged_in_session_is_authenticated() {
    let user_id = Uuid::new_v4();
    let record = session(true, Some(user_id));
    let first = AuthState::from_session(Some(&record));
    let second = AuthState::from_session(Some(&record));
    assert_eq!(first, AuthState::Authenticated { user_id });
    assert_eq!(first, second);
    assert!(first.is_logged_in());
    assert_eq!(first.user_id(), Some(user_id));
}

#[test]
fn logged_out_session_is_anonymous() {
    let record = session(false, Some(Uuid::new_v4()));
    assert_eq!(AuthState::from_session(Some(&record)), AuthState::Anonymous);
    assert_eq!(AuthState::from_session(Some(&record)), AuthState::Anonymous);
}

#[test]
fn absent_session_is_anonymous() {
    assert_eq!(AuthState::from_session(None), AuthState::Anonymous);
    assert!(!AuthState::from_session(None).is_logged_in());
    assert_eq!(AuthState::from_session(None).user_id(), None);
}

#[test]
fn flag_without_user_is_anonymous() {
    let record = session(true, None);
    assert_eq!(AuthState::from_session(Some(&record)), AuthState::Anonymous);
}

#[test]
fn default_is_anonymous() {
    assert_eq!(AuthState::default(), AuthState::Anonymous);
}

// =============================================================================
// gate
// =============================================================================

#[test]
fn gate_allows_authenticated() {
    let auth = AuthState::Authenticated { user_id: Uuid::nil() };
    assert_eq!(gate(auth), GateDecision::Allowed);
    assert_eq!(gate(auth), GateDecision::Allowed);
}

#[test]
fn gate_denies_anonymous() {
    assert_eq!(gate(AuthState::Anonymous), GateDecision::Denied);
    assert_eq!(gate(AuthState::Anonymous), GateDecision::Denied);
}

#[test]
fn found_is_302_with_location() {
    let response = found("/login");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/login");
}

// =============================================================================
// extractors
// =============================================================================

fn parts_with(auth: Option<AuthState>) -> Parts {
    let mut request = Request::builder().uri("/favourites").body(()).unwrap();
    if let Some(auth) = auth {
        request.extensions_mut().insert(auth);
    }
    request.into_parts().0
}

#[tokio::test]
async fn auth_state_extractor_defaults_to_anonymous() {
    let mut parts = parts_with(None);
    let auth = AuthState::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(auth, AuthState::Anonymous);
}

#[tokio::test]
async fn logged_in_extractor_yields_user() {
    let user_id = Uuid::new_v4();
    let mut parts = parts_with(Some(AuthState::Authenticated { user_id }));
    let Ok(logged_in) = LoggedIn::from_request_parts(&mut parts, &()).await else {
        panic!("expected authenticated user");
    };
    assert_eq!(logged_in.user_id, user_id);
}

#[tokio::test]
async fn session_extractor_without_session_is_unavailable() {
    let mut parts = parts_with(None);
    let result = <SessionHandle as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
    assert_eq!(result.err(), Some(StatusCode::SERVICE_UNAVAILABLE));

    let optional = <SessionHandle as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
    assert!(matches!(optional, Ok(None)));
}

#[tokio::test]
async fn logged_in_extractor_redirects_anonymous() {
    let mut parts = parts_with(Some(AuthState::Anonymous));
    let Err(response) = LoggedIn::from_request_parts(&mut parts, &()).await else {
        panic!("expected redirect");
    };
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], LOGIN_PATH);
}

// =============================================================================
// SessionHandle
// =============================================================================

#[tokio::test]
async fn session_handle_log_in_rotates_id() {
    use crate::services::session::MemorySessionStore;

    let store = Arc::new(MemorySessionStore::new());
    let record = session(false, None);
    store.save(&record).await.unwrap();
    let handle = SessionHandle::new(record.clone(), store.clone());

    let user_id = Uuid::new_v4();
    let rotated = handle.log_in(user_id, time::Duration::hours(1)).await.unwrap();

    assert_ne!(rotated.id, record.id);
    let stored = store.load(&rotated.id).await.unwrap().unwrap();
    assert!(stored.is_logged_in);
    assert_eq!(stored.user_id, Some(user_id));
    assert!(store.load(&record.id).await.unwrap().is_none());
    assert_eq!(store.len(), 1);
    // The handle keeps the snapshot taken when the request started.
    assert!(!handle.record().is_logged_in);
}

#[tokio::test]
async fn session_handle_destroy_removes_record() {
    use crate::services::session::MemorySessionStore;

    let store = Arc::new(MemorySessionStore::new());
    let record = session(false, None);
    store.save(&record).await.unwrap();
    let handle = SessionHandle::new(record.clone(), store.clone());

    handle.destroy().await.unwrap();
    assert!(store.load(handle.id()).await.unwrap().is_none());
}

// =============================================================================
// sets_session_cookie
// =============================================================================

fn response_with_cookies(cookies: &[&str]) -> Response {
    let mut response = StatusCode::OK.into_response();
    for cookie in cookies {
        response.headers_mut().append(SET_COOKIE, cookie.parse().unwrap());
    }
    response
}

#[test]
fn detects_handler_written_session_cookie() {
    assert!(sets_session_cookie(&response_with_cookies(&["sid=abc; Path=/"])));
    assert!(sets_session_cookie(&response_with_cookies(&["other=1", "sid=; Max-Age=0"])));
}

#[test]
fn ignores_other_cookies() {
    assert!(!sets_session_cookie(&response_with_cookies(&[])));
    assert!(!sets_session_cookie(&response_with_cookies(&["sidebar=open", "theme=dark"])));
}
