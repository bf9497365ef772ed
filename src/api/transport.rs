//! Authenticated HTTP transport with automatic token refresh.
//!
//! Every API call goes through [`Transport::execute`]. The transport attaches
//! the current bearer token to outgoing requests and classifies failures: an
//! expired-token response triggers a session refresh, and requests that fail
//! while that refresh is running are queued and replayed once it settles.
//! Exactly one refresh round-trip happens per expiry, no matter how many
//! requests are in flight. If the refresh itself fails, every waiting caller
//! gets the refresh error, the session is logged out, and the host is told to
//! route the user back to the login screen.
//!
//! Callers never observe the intermediate 401 - a recovered request looks like
//! a slow success.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{self, HeaderValue};
use reqwest::multipart;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{SessionError, SharedSessionStore};
use crate::host::{NavigationHandle, NotificationSink, LOGIN_ROUTE};

use super::error::TransportError;
use super::request::{ApiRequest, MultipartField, RequestAttempt, RequestBody};

/// HTTP request timeout in seconds.
/// 30s allows for slow responses from station wifi while failing fast enough
/// for field use.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the token refresh endpoint. An auth failure from this path must
/// never trigger another refresh.
const REFRESH_PATH: &str = "/auth/refresh";

/// Message surfaced to the user when the session cannot be recovered.
const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please log in again";

type RequestResult = Result<reqwest::Response, TransportError>;

/// A request that hit an expired token while a refresh was already running.
/// Replayed with the new token or rejected with the refresh error once the
/// refresh settles.
struct Waiter {
    attempt: RequestAttempt,
    done: oneshot::Sender<RequestResult>,
}

/// Refresh coordination state: the in-flight flag and the queue of blocked
/// requests. Only the transport touches this, always under the one mutex.
#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<Waiter>,
}

/// Authenticated transport over the gear service API.
/// Clone is cheap - clones share the connection pool and refresh coordination.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    http: Client,
    base_url: Url,
    timeout: Duration,
    // Late-bound host references: the session store and UI handles are wired
    // up after construction, during app startup.
    session: RwLock<Option<SharedSessionStore>>,
    navigation: RwLock<Option<Arc<dyn NavigationHandle>>>,
    notifier: RwLock<Option<Arc<dyn NotificationSink>>>,
    refresh: Mutex<RefreshState>,
}

impl Transport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid base URL: {}", e)))?;
        // Url::join drops the last path segment without this.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let timeout = Duration::from_secs(REQUEST_TIMEOUT_SECS);
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(TransportInner {
                http,
                base_url,
                timeout,
                session: RwLock::new(None),
                navigation: RwLock::new(None),
                notifier: RwLock::new(None),
                refresh: Mutex::new(RefreshState::default()),
            }),
        })
    }

    /// Wire up the session store. Until this is set, requests go out
    /// unauthenticated and auth failures pass through unhandled.
    pub fn set_session_store(&self, store: SharedSessionStore) {
        *self.inner.session.write().unwrap() = Some(store);
    }

    /// Wire up the navigation handle once the UI has mounted.
    pub fn set_navigation(&self, navigation: Arc<dyn NavigationHandle>) {
        *self.inner.navigation.write().unwrap() = Some(navigation);
    }

    /// Wire up the user-facing notification sink.
    pub fn set_notifier(&self, notifier: Arc<dyn NotificationSink>) {
        *self.inner.notifier.write().unwrap() = Some(notifier);
    }

    fn session_store(&self) -> Option<SharedSessionStore> {
        self.inner.session.read().unwrap().clone()
    }

    fn navigation(&self) -> Option<Arc<dyn NavigationHandle>> {
        self.inner.navigation.read().unwrap().clone()
    }

    fn notifier(&self) -> Option<Arc<dyn NotificationSink>> {
        self.inner.notifier.read().unwrap().clone()
    }

    // ===== Request entry point =====

    /// Issue a request, transparently recovering from an expired token.
    pub async fn execute(&self, request: ApiRequest) -> RequestResult {
        let mut attempt = RequestAttempt::new(request);

        match self.send_once(&attempt.request).await {
            Ok(response) => Ok(response),
            Err(err) if self.should_attempt_refresh(&attempt, &err) => {
                debug!(path = %attempt.request.path, error = %err, "Access token rejected");
                attempt.retried = true;
                self.recover(attempt).await
            }
            Err(err) => Err(err),
        }
    }

    /// Issue a GET and parse the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        Ok(response.json().await?)
    }

    /// Issue a POST with a JSON body and parse the JSON response.
    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::post(path).json(body)?;
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// Issue a PUT with a JSON body and parse the JSON response.
    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::put(path).json(body)?;
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// Issue a DELETE, discarding the response body.
    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    // ===== Outbound leg =====

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                TransportError::InvalidRequest(format!("invalid request path {}: {}", path, e))
            })
    }

    /// Send a single attempt: attach the bearer token, normalize headers,
    /// classify the status. No retries happen here.
    async fn send_once(&self, request: &ApiRequest) -> RequestResult {
        let url = self.url(&request.path)?;
        let mut headers = request.headers.clone();

        // A multipart body must not carry a caller-set content type: the
        // client computes one bearing the part boundary, and overriding it
        // corrupts uploads on mobile network stacks.
        if request.is_multipart() {
            headers.remove(header::CONTENT_TYPE);
        }

        // Token attachment must never fail a request; a token that cannot
        // form a header value just goes unattached and the server answers 401.
        if let Some(store) = self.session_store() {
            if let Some(token) = store.access_token() {
                match HeaderValue::from_str(&format!("Bearer {}", token)) {
                    Ok(value) => {
                        headers.insert(header::AUTHORIZATION, value);
                    }
                    Err(_) => warn!("Access token is not a valid header value, sending without it"),
                }
            }
        }

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .headers(headers)
            .timeout(request.timeout.unwrap_or(self.inner.timeout));

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::from_status(status, &body))
        }
    }

    // ===== Refresh coordination =====

    fn is_refresh_path(&self, path: &str) -> bool {
        path.trim_start_matches('/') == REFRESH_PATH.trim_start_matches('/')
    }

    /// Gatekeeper for the refresh cycle: only an unretried, non-refresh-path
    /// auth failure with a session store configured may start or join one.
    fn should_attempt_refresh(&self, attempt: &RequestAttempt, err: &TransportError) -> bool {
        if !err.is_auth_failure() {
            return false;
        }
        if attempt.retried {
            debug!(path = %attempt.request.path, "Request already retried once, passing failure through");
            return false;
        }
        if self.is_refresh_path(&attempt.request.path) {
            debug!("Auth failure from the refresh endpoint itself, passing through");
            return false;
        }
        if self.session_store().is_none() {
            debug!("No session store configured, passing auth failure through");
            return false;
        }
        true
    }

    /// Join the in-flight refresh if there is one, otherwise lead a new cycle.
    ///
    /// The check-and-set on the in-flight flag happens in one critical
    /// section, so exactly one caller per cycle becomes the leader.
    async fn recover(&self, attempt: RequestAttempt) -> RequestResult {
        let waiting = {
            let mut state = self.inner.refresh.lock().await;
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(Waiter { attempt, done: tx });
                Ok(rx)
            } else {
                state.in_flight = true;
                Err(attempt)
            }
        };

        match waiting {
            Ok(rx) => {
                debug!("Refresh already in flight, queueing request");
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::InvalidRequest(
                        "request dropped during token refresh".into(),
                    )),
                }
            }
            Err(attempt) => {
                // The cycle runs on its own task: a leader whose caller gives
                // up must still settle the queue and clear the flag.
                let transport = self.clone();
                let (tx, rx) = oneshot::channel();
                tokio::spawn(async move {
                    let result = transport.lead_refresh(attempt).await;
                    let _ = tx.send(result);
                });
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::InvalidRequest(
                        "request dropped during token refresh".into(),
                    )),
                }
            }
        }
    }

    /// Run one refresh cycle as the leader, then drain the queue.
    async fn lead_refresh(&self, attempt: RequestAttempt) -> RequestResult {
        debug!("Refreshing session");
        let refresh_result = self.run_refresh().await;

        // Take the queue and clear the in-flight flag in one critical
        // section, before any replay or rejection I/O. The flag is down
        // whatever happened, so the next expiry can start a fresh cycle.
        let waiters = {
            let mut state = self.inner.refresh.lock().await;
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        match refresh_result {
            Ok(()) => {
                debug!(queued = waiters.len(), "Session refreshed, replaying requests");
                // FIFO re-issue; completion order is up to the network.
                for waiter in waiters {
                    let transport = self.clone();
                    tokio::spawn(async move {
                        let result = transport.send_once(&waiter.attempt.request).await;
                        let _ = waiter.done.send(result);
                    });
                }
                // The leader's own single allowed retry.
                self.send_once(&attempt.request).await
            }
            Err(err) => {
                warn!(
                    error = %err,
                    queued = waiters.len(),
                    "Session refresh failed, rejecting queued requests"
                );
                let err = Arc::new(err);
                // Waiters are answered first, then the host-facing side
                // effects run, then the leader's caller gets its error.
                for waiter in waiters {
                    let _ = waiter
                        .done
                        .send(Err(TransportError::RefreshFailed(Arc::clone(&err))));
                }
                self.escalate().await;
                Err(TransportError::RefreshFailed(err))
            }
        }
    }

    async fn run_refresh(&self) -> Result<(), SessionError> {
        let store = self
            .session_store()
            .ok_or(SessionError::NotAuthenticated)?;
        store.refresh().await?;
        // A "successful" refresh that stored no access token cannot recover
        // anything; treat it as a failed refresh.
        if store.access_token().is_none() {
            return Err(SessionError::MissingToken);
        }
        Ok(())
    }

    /// Terminate the session after a failed refresh: best-effort logout, one
    /// notification, one navigation reset. Each step is independent of the
    /// others and of whether the host handles are set.
    async fn escalate(&self) {
        if let Some(store) = self.session_store() {
            if let Err(err) = store.logout().await {
                warn!(error = %err, "Logout after failed refresh did not complete");
            }
        }

        if let Some(notifier) = self.notifier() {
            notifier.notify(SESSION_EXPIRED_MESSAGE);
        }

        match self.navigation() {
            Some(navigation) => navigation.reset_to(LOGIN_ROUTE),
            None => debug!("No navigation handle set, skipping login redirect"),
        }
    }
}

fn build_form(fields: &[MultipartField]) -> Result<multipart::Form, TransportError> {
    let mut form = multipart::Form::new();
    for field in fields {
        let mut part = multipart::Part::bytes(field.data.clone());
        if let Some(ref file_name) = field.file_name {
            part = part.file_name(file_name.clone());
        }
        if let Some(ref mime) = field.mime_type {
            part = part.mime_str(mime).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid mime type {}: {}", mime, e))
            })?;
        }
        form = form.part(field.name.clone(), part);
    }
    Ok(form)
}
