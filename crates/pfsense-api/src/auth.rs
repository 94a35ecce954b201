// Session authentication
//
// Form-based login and logout. The entry page hands out the pre-auth
// anti-forgery token; posting the credentials with it sets the session
// cookie in the client's jar. Success is confirmed by the login form no
// longer being rendered.

use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Error;
use crate::markup;
use crate::session::{SessionClient, SessionPhase, SessionRequest};

const ENTRY_PATH: &str = "/index.php";

impl SessionClient {
    /// Authenticate with the username/password pair.
    ///
    /// Called with the state lock held by `ensure_authenticated`, so it
    /// must only use the raw exchange path. Transport failures are retried
    /// by the executor; a rejected login is terminal.
    pub(crate) async fn login(
        &self,
        http: &reqwest::Client,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        debug!(url = %self.base_url(), user = %self.credentials().username, "logging in");

        let entry = self
            .exchange(http, &SessionRequest::get(ENTRY_PATH), None, cancel)
            .await?
            .error_for_status(ENTRY_PATH)?;

        let token = markup::csrf_token(&entry.body).ok_or_else(|| Error::MissingToken {
            page: ENTRY_PATH.into(),
        })?;

        let credentials = self.credentials();
        let request = SessionRequest::post(ENTRY_PATH)
            .field("usernamefld", credentials.username.as_str())
            .field("passwordfld", credentials.password.expose_secret())
            .field("login", "Sign In");

        let page = self.exchange(http, &request, Some(&token), cancel).await?;

        if markup::is_login_form(&page.body) {
            let message = markup::danger_alert(&page.body)
                .unwrap_or_else(|| "credentials rejected".into());
            return Err(Error::Authentication { message });
        }

        let status = page.status;
        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status})"),
            });
        }

        info!(user = %credentials.username, "session established");
        Ok(())
    }

    /// End the session and discard the cookie jar.
    ///
    /// The backend logout is only posted when a session is established.
    /// Whatever the backend says, the local client is rebuilt with an
    /// empty jar and the session returns to unauthenticated.
    pub async fn logout(&self, cancel: &CancellationToken) -> Result<(), Error> {
        let mut state = self.state.lock().await;

        let result = if state.phase == SessionPhase::Authenticated {
            debug!("logging out");
            let http = state.http.clone();
            self.post_logout(&http, cancel).await
        } else {
            Ok(())
        };

        let (http, jar) = self.transport().build_client()?;
        state.http = http;
        state.jar = jar;
        state.phase = SessionPhase::Unauthenticated;
        debug!("session torn down");

        result
    }

    async fn post_logout(
        &self,
        http: &reqwest::Client,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let entry = self
            .exchange(http, &SessionRequest::get(ENTRY_PATH), None, cancel)
            .await?;
        let Some(token) = markup::csrf_token(&entry.body) else {
            // Already logged out server-side.
            return Ok(());
        };
        let request = SessionRequest::post(ENTRY_PATH).query("logout", "");
        self.exchange(http, &request, Some(&token), cancel).await?;
        Ok(())
    }
}
