//! Integration tests for the authenticated transport's refresh coordination.
//!
//! Each test stands up a wiremock server that rejects the stale token and
//! accepts the fresh one, so a passing request proves the full
//! 401 -> refresh -> replay path rather than just the happy case.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use turnout_core::api::{ApiRequest, MultipartField, Transport, TransportError};
use turnout_core::auth::{SessionError, SessionStore};
use turnout_core::host::{NavigationHandle, NotificationSink};

const STALE: &str = "stale-token";
const FRESH: &str = "fresh-token";

/// Session store double: hands out a scripted token, counts refreshes and
/// logouts, and can be told to fail or stall its refresh.
struct TestStore {
    access: Mutex<Option<String>>,
    next_token: Mutex<Option<String>>,
    fail_refresh: AtomicBool,
    refresh_delay_ms: u64,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl TestStore {
    fn new(access: &str) -> Self {
        Self {
            access: Mutex::new(Some(access.to_string())),
            next_token: Mutex::new(Some(FRESH.to_string())),
            fail_refresh: AtomicBool::new(false),
            refresh_delay_ms: 0,
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    /// Stall the refresh so concurrently failing requests are certain to
    /// observe it in flight.
    fn with_refresh_delay(mut self, delay_ms: u64) -> Self {
        self.refresh_delay_ms = delay_ms;
        self
    }

    fn failing(self) -> Self {
        self.fail_refresh.store(true, Ordering::SeqCst);
        self
    }

    /// Token the next successful refresh installs; `None` simulates a refresh
    /// that "succeeds" without storing a token.
    fn set_next_token(&self, token: Option<&str>) {
        *self.next_token.lock().unwrap() = token.map(String::from);
    }

    fn set_access(&self, token: &str) {
        *self.access.lock().unwrap() = Some(token.to_string());
    }

    fn set_fail(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for TestStore {
    fn access_token(&self) -> Option<String> {
        self.access.lock().unwrap().clone()
    }

    fn refresh_token(&self) -> Option<String> {
        Some("refresh-token".to_string())
    }

    async fn refresh(&self) -> Result<(), SessionError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.refresh_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.refresh_delay_ms)).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(SessionError::RefreshRejected {
                status: 401,
                body: "refresh token revoked".to_string(),
            });
        }
        *self.access.lock().unwrap() = self.next_token.lock().unwrap().clone();
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.access.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNavigation {
    resets: Mutex<Vec<String>>,
}

impl NavigationHandle for RecordingNavigation {
    fn reset_to(&self, route: &str) {
        self.resets.lock().unwrap().push(route.to_string());
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn transport_with(server: &MockServer, store: Arc<TestStore>) -> Transport {
    let transport = Transport::new(&server.uri()).unwrap();
    transport.set_session_store(store);
    transport
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn mount_token_gate(server: &MockServer, get_path: &str, payload: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(get_path))
        .and(header("authorization", bearer(STALE).as_str()))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"message": "Token is expired"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(get_path))
        .and(header("authorization", bearer(FRESH).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(server)
        .await;
}

// ===== Happy path and fan-in =====

#[tokio::test]
async fn expired_token_is_refreshed_transparently() {
    let server = MockServer::start().await;
    mount_token_gate(&server, "/leads", serde_json::json!({"ok": true})).await;

    let store = Arc::new(TestStore::new(STALE));
    let transport = transport_with(&server, store.clone());

    let response = transport.execute(ApiRequest::get("/leads")).await.unwrap();
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body, serde_json::json!({"ok": true}));
    assert_eq!(store.refresh_calls(), 1);
    assert_eq!(store.logout_calls(), 0);
}

#[tokio::test]
async fn concurrent_failures_share_one_refresh() {
    let server = MockServer::start().await;
    mount_token_gate(&server, "/leads", serde_json::json!({"resource": "leads"})).await;
    mount_token_gate(&server, "/gear", serde_json::json!({"resource": "gear"})).await;
    mount_token_gate(&server, "/roster", serde_json::json!({"resource": "roster"})).await;

    let store = Arc::new(TestStore::new(STALE).with_refresh_delay(150));
    let transport = transport_with(&server, store.clone());

    let results = join_all(["/leads", "/gear", "/roster"].map(|p| {
        let transport = transport.clone();
        async move { transport.execute(ApiRequest::get(p)).await }
    }))
    .await;

    // each caller gets its own payload back, not someone else's
    for (result, resource) in results.into_iter().zip(["leads", "gear", "roster"]) {
        let body: serde_json::Value = result.unwrap().json().await.unwrap();
        assert_eq!(body["resource"], resource);
    }
    assert_eq!(store.refresh_calls(), 1);
}

#[tokio::test]
async fn ten_concurrent_failures_still_one_refresh() {
    let server = MockServer::start().await;
    mount_token_gate(&server, "/leads", serde_json::json!({"ok": true})).await;

    let store = Arc::new(TestStore::new(STALE).with_refresh_delay(150));
    let transport = transport_with(&server, store.clone());

    let results = join_all((0..10).map(|_| {
        let transport = transport.clone();
        async move { transport.execute(ApiRequest::get("/leads")).await }
    }))
    .await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(store.refresh_calls(), 1);
}

#[tokio::test]
async fn two_concurrent_failures_still_one_refresh() {
    let server = MockServer::start().await;
    mount_token_gate(&server, "/leads", serde_json::json!({"ok": true})).await;

    let store = Arc::new(TestStore::new(STALE).with_refresh_delay(150));
    let transport = transport_with(&server, store.clone());

    let (a, b) = tokio::join!(
        transport.execute(ApiRequest::get("/leads")),
        transport.execute(ApiRequest::get("/leads")),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(store.refresh_calls(), 1);
}

#[tokio::test]
async fn forbidden_also_triggers_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .and(header("authorization", bearer(STALE).as_str()))
        .respond_with(ResponseTemplate::new(403).set_body_string("expired"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .and(header("authorization", bearer(FRESH).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE));
    let transport = transport_with(&server, store.clone());

    transport.execute(ApiRequest::get("/leads")).await.unwrap();
    assert_eq!(store.refresh_calls(), 1);
}

// ===== Queue drain =====

#[tokio::test]
async fn drained_requests_settle_with_their_own_outcome() {
    let server = MockServer::start().await;
    mount_token_gate(&server, "/leads", serde_json::json!({"ok": true})).await;

    // /missing 401s on the stale token and 404s on the fresh one: the replay
    // must surface the 404, not hang and not get someone else's response.
    Mock::given(method("GET"))
        .and(path("/missing"))
        .and(header("authorization", bearer(STALE).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .and(header("authorization", bearer(FRESH).as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such lead"))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE).with_refresh_delay(150));
    let transport = transport_with(&server, store.clone());

    let (ok, missing) = tokio::join!(
        transport.execute(ApiRequest::get("/leads")),
        transport.execute(ApiRequest::get("/missing")),
    );

    assert!(ok.is_ok());
    assert!(matches!(missing.unwrap_err(), TransportError::NotFound(_)));
    assert_eq!(store.refresh_calls(), 1);
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter_with_the_refresh_error() {
    let server = MockServer::start().await;
    for p in ["/leads", "/gear", "/roster"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
    }

    let store = Arc::new(TestStore::new(STALE).with_refresh_delay(150).failing());
    let transport = transport_with(&server, store.clone());

    let results = join_all(["/leads", "/gear", "/roster"].map(|p| {
        let transport = transport.clone();
        async move { transport.execute(ApiRequest::get(p)).await }
    }))
    .await;

    for result in results {
        let err = result.unwrap_err();
        assert!(
            matches!(err, TransportError::RefreshFailed(_)),
            "expected the refresh error, got: {}",
            err
        );
        assert!(err.to_string().contains("refresh token revoked"));
    }
    assert_eq!(store.refresh_calls(), 1);
    assert_eq!(store.logout_calls(), 1);
}

// ===== Loop prevention =====

#[tokio::test]
async fn retried_request_does_not_start_a_second_refresh() {
    let server = MockServer::start().await;
    // Refresh "succeeds" but the server rejects the new token too.
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(401).set_body_string("still expired"))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE));
    store.set_next_token(Some("also-stale"));
    let transport = transport_with(&server, store.clone());

    let err = transport
        .execute(ApiRequest::get("/leads"))
        .await
        .unwrap_err();

    // The caller sees the second 401, and exactly one refresh happened.
    assert!(matches!(err, TransportError::Unauthorized(_)));
    assert_eq!(store.refresh_calls(), 1);
}

#[tokio::test]
async fn refresh_endpoint_failures_never_recurse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad refresh token"))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE));
    let transport = transport_with(&server, store.clone());

    let err = transport
        .execute(ApiRequest::post("/auth/refresh"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Unauthorized(_)));
    assert_eq!(store.refresh_calls(), 0);
}

// ===== Pass-through =====

#[tokio::test]
async fn non_auth_errors_pass_through_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE));
    let transport = transport_with(&server, store.clone());

    let err = transport
        .execute(ApiRequest::get("/leads"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Server { status: 500, .. }));
    assert_eq!(store.refresh_calls(), 0);
    assert_eq!(store.logout_calls(), 0);
}

#[tokio::test]
async fn timeouts_pass_through_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE));
    let transport = transport_with(&server, store.clone());

    let request = ApiRequest::get("/leads").timeout(Duration::from_millis(100));
    let err = transport.execute(request).await.unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
    assert_eq!(store.refresh_calls(), 0);
}

#[tokio::test]
async fn auth_failures_without_a_store_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let transport = Transport::new(&server.uri()).unwrap();
    let err = transport
        .execute(ApiRequest::get("/leads"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Unauthorized(_)));
}

// ===== Flag lifecycle =====

#[tokio::test]
async fn a_failed_cycle_does_not_lock_out_the_next_one() {
    let server = MockServer::start().await;
    mount_token_gate(&server, "/leads", serde_json::json!({"ok": true})).await;

    let store = Arc::new(TestStore::new(STALE).failing());
    let transport = transport_with(&server, store.clone());

    let err = transport
        .execute(ApiRequest::get("/leads"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::RefreshFailed(_)));
    assert_eq!(store.refresh_calls(), 1);

    // The user logs back in; a later expiry must start a brand-new cycle.
    store.set_access(STALE);
    store.set_fail(false);

    let response = transport.execute(ApiRequest::get("/leads")).await.unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"ok": true}));
    assert_eq!(store.refresh_calls(), 2);
}

#[tokio::test]
async fn refresh_that_stores_no_token_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE));
    store.set_next_token(None);
    let transport = transport_with(&server, store.clone());

    let err = transport
        .execute(ApiRequest::get("/leads"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::RefreshFailed(_)));
    assert_eq!(store.logout_calls(), 1);
}

// ===== Escalation =====

#[tokio::test]
async fn fatal_session_loss_escalates_exactly_once() {
    let server = MockServer::start().await;
    for p in ["/leads", "/gear", "/roster"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
    }

    let store = Arc::new(TestStore::new(STALE).with_refresh_delay(150).failing());
    let navigation = Arc::new(RecordingNavigation::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let transport = transport_with(&server, store.clone());
    transport.set_navigation(navigation.clone());
    transport.set_notifier(notifier.clone());

    let results = join_all(["/leads", "/gear", "/roster"].map(|p| {
        let transport = transport.clone();
        async move { transport.execute(ApiRequest::get(p)).await }
    }))
    .await;

    assert!(results
        .iter()
        .all(|r| matches!(r, Err(TransportError::RefreshFailed(_)))));

    // One failure cycle: one logout, one toast, one navigation reset.
    assert_eq!(store.logout_calls(), 1);

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].to_lowercase().contains("session expired"));

    let resets = navigation.resets.lock().unwrap();
    assert_eq!(resets.as_slice(), ["Login"]);
}

#[tokio::test]
async fn escalation_survives_an_unset_navigation_handle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(STALE).failing());
    let transport = transport_with(&server, store.clone());
    // No navigation handle, no notifier: logout must still run.

    let err = transport
        .execute(ApiRequest::get("/leads"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::RefreshFailed(_)));
    assert_eq!(store.logout_calls(), 1);
}

// ===== Interceptor details =====

/// Matches a request whose content type is a well-formed multipart form with
/// a generated boundary.
struct MultipartContentType;

impl wiremock::Match for MultipartContentType {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("multipart/form-data") && v.contains("boundary="))
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn multipart_uploads_get_a_generated_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/inspections/12/photos"))
        .and(MultipartContentType)
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new(FRESH));
    let transport = transport_with(&server, store);

    // A caller-set content type must be replaced, not sent as-is.
    let request = ApiRequest::post("/inspections/12/photos")
        .header("Content-Type", "application/json")
        .multipart(vec![MultipartField {
            name: "photo".into(),
            file_name: Some("coat.jpg".into()),
            mime_type: Some("image/jpeg".into()),
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }]);

    transport.execute(request).await.unwrap();
}

#[tokio::test]
async fn requests_without_a_session_go_out_unauthenticated() {
    let server = MockServer::start().await;

    struct NoAuthHeader;
    impl wiremock::Match for NoAuthHeader {
        fn matches(&self, request: &Request) -> bool {
            !request.headers.contains_key("authorization")
        }
    }

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(NoAuthHeader)
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"up": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::new(&server.uri()).unwrap();
    transport.execute(ApiRequest::get("/health")).await.unwrap();
}
