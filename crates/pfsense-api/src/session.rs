// Session client
//
// Owns one authenticated conversation with the management interface:
// the HTTP client and its private cookie jar, the credentials, and the
// retry policy. Subsystem clients share it through an `Arc` and never
// touch the jar or the anti-forgery token directly.

use std::future::Future;
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::markup;
use crate::retry::{self, RetryPolicy};
use crate::transport::TransportConfig;

pub const DEFAULT_URL: &str = "https://192.168.1.1";
pub const DEFAULT_USERNAME: &str = "admin";

/// Username/password pair for the web interface.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// A request relative to the backend base URL.
///
/// Anything other than `GET`/`HEAD` is token-bearing: the session fetches
/// a fresh anti-forgery token from the target page and adds it to the
/// form before submitting.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    headers: HeaderMap,
}

impl SessionRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a form field. Order is preserved on the wire.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD)
    }
}

/// A fully-read response page.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub url: Url,
    pub body: String,
}

impl Page {
    /// Turn a non-2xx page into [`Error::UnexpectedStatus`].
    pub fn error_for_status(self, context: &str) -> Result<Self, Error> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::UnexpectedStatus {
                status: self.status.as_u16(),
                context: context.to_owned(),
            })
        }
    }

    /// Turn rendered input errors into [`Error::Validation`].
    pub fn error_for_input(self) -> Result<Self, Error> {
        let messages = markup::input_errors(&self.body);
        if messages.is_empty() {
            Ok(self)
        } else {
            Err(Error::Validation { messages })
        }
    }
}

pub(crate) struct SessionState {
    pub(crate) http: reqwest::Client,
    pub(crate) jar: Arc<Jar>,
    pub(crate) phase: SessionPhase,
}

/// Authenticated client for the management interface.
///
/// Login happens on demand. Token-bearing requests are serialized so a
/// token fetched for one submission is never consumed by another; reads
/// run concurrently once the session is established.
pub struct SessionClient {
    base_url: Url,
    credentials: Credentials,
    transport: TransportConfig,
    retry: RetryPolicy,
    pub(crate) state: Mutex<SessionState>,
    submit_gate: Mutex<()>,
}

impl SessionClient {
    /// Build a session. Nothing is sent until the first request.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: TransportConfig,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(Error::Configuration {
                message: format!("base URL must be an http(s) address, got {base_url}"),
            });
        }
        if credentials.username.is_empty() {
            return Err(Error::Configuration {
                message: "username required".into(),
            });
        }
        if credentials.password.expose_secret().is_empty() {
            return Err(Error::Configuration {
                message: "password required".into(),
            });
        }

        let (http, jar) = transport.build_client()?;
        Ok(Self {
            base_url,
            credentials,
            transport,
            retry,
            state: Mutex::new(SessionState {
                http,
                jar,
                phase: SessionPhase::Unauthenticated,
            }),
            submit_gate: Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    /// Whether the jar currently holds any cookie for the backend.
    pub async fn has_session_cookie(&self) -> bool {
        let state = self.state.lock().await;
        state.jar.cookies(&self.base_url).is_some()
    }

    /// Resolve a backend path against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Authenticated execution ─────────────────────────────────────

    /// Execute one authenticated request and read the resulting page.
    ///
    /// Logs in first if needed. If the backend answers with its login
    /// form, the session drops back to unauthenticated and the call fails
    /// with [`Error::SessionExpired`]; it is not retried here.
    pub async fn send(
        &self,
        request: SessionRequest,
        cancel: &CancellationToken,
    ) -> Result<Page, Error> {
        if request.is_mutating() {
            let _gate = self.submit_gate.lock().await;
            let http = self.ensure_authenticated(cancel).await?;
            self.submit(&http, request, cancel).await
        } else {
            let http = self.ensure_authenticated(cancel).await?;
            let page = self.exchange(&http, &request, None, cancel).await?;
            self.check_session(page).await
        }
    }

    /// Log in unless the session is already established.
    ///
    /// Returns a handle to the session's HTTP client. Concurrent callers
    /// wait on the state lock, so only one login is ever in flight.
    pub async fn ensure_authenticated(
        &self,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Client, Error> {
        let mut state = self.state.lock().await;
        if state.phase == SessionPhase::Authenticated {
            return Ok(state.http.clone());
        }

        state.phase = SessionPhase::Authenticating;
        let http = state.http.clone();
        match self.login(&http, cancel).await {
            Ok(()) => {
                state.phase = SessionPhase::Authenticated;
                Ok(http)
            }
            Err(e) => {
                state.phase = SessionPhase::Unauthenticated;
                Err(e)
            }
        }
    }

    /// Fetch a fresh token from the target page, then submit the form.
    async fn submit(
        &self,
        http: &reqwest::Client,
        request: SessionRequest,
        cancel: &CancellationToken,
    ) -> Result<Page, Error> {
        let token_page = self
            .exchange(http, &SessionRequest::get(request.path()), None, cancel)
            .await?;
        let token_page = self.check_session(token_page).await?;
        let token = markup::csrf_token(&token_page.body).ok_or_else(|| Error::MissingToken {
            page: request.path().to_owned(),
        })?;
        trace!(path = request.path(), "fetched anti-forgery token");

        let page = self.exchange(http, &request, Some(&token), cancel).await?;
        self.check_session(page).await
    }

    /// One exchange through the retry executor, body fully read.
    pub(crate) async fn exchange(
        &self,
        http: &reqwest::Client,
        request: &SessionRequest,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Page, Error> {
        let url = self.url(&request.path)?;
        let mut builder = http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if request.is_mutating() {
            let mut form: Vec<(&str, &str)> = Vec::with_capacity(request.form.len() + 1);
            if let Some(token) = token {
                form.push((markup::CSRF_FIELD, token));
            }
            form.extend(request.form.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            builder = builder.form(&form);
        }
        let built = builder.build()?;

        debug!(method = %request.method, path = %request.path, "session exchange");
        let resp = retry::execute(http, built, &self.retry, cancel).await?;
        let status = resp.status();
        let url = resp.url().clone();
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            body = resp.text() => body?,
        };
        Ok(Page { status, url, body })
    }

    /// Detect a lapsed session: the login form where data was expected.
    async fn check_session(&self, page: Page) -> Result<Page, Error> {
        if markup::is_login_form(&page.body) {
            warn!(url = %page.url, "login form returned, session lapsed");
            self.state.lock().await.phase = SessionPhase::Unauthenticated;
            return Err(Error::SessionExpired);
        }
        Ok(page)
    }
}

/// Run `op`, and if it fails with [`Error::SessionExpired`], run it once
/// more. The session has already dropped to unauthenticated at that
/// point, so the second run logs in again. Never loops further.
pub async fn reauth_once<T, F, Fut>(mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    match op().await {
        Err(Error::SessionExpired) => {
            warn!("session expired, re-authenticating once");
            op().await
        }
        other => other,
    }
}
