#![allow(dead_code, clippy::unwrap_used)]
// Fake management interface shared by the integration tests.

use std::sync::Arc;

use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pfsense_api::{Credentials, RetryPolicy, SessionClient, TransportConfig};

pub const TOKEN: &str = "sid:0123abcd,1700000000";
/// `TOKEN` as it appears in a urlencoded form body.
pub const TOKEN_FORM: &str = "__csrf_magic=sid%3A0123abcd%2C1700000000";

pub fn login_page(alert: Option<&str>) -> String {
    let alert = alert
        .map(|a| format!(r#"<div class="col-sm-offset-3 alert alert-danger">{a}</div>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body>{alert}<form class="login" method="post">
        <input type="hidden" name="__csrf_magic" value="{TOKEN}" />
        <input type="text" name="usernamefld" id="usernamefld" />
        <input type="password" name="passwordfld" id="passwordfld" />
        </form></body></html>"#
    )
}

pub fn form_page() -> String {
    format!(
        r#"<html><head><script>var csrfMagicToken = "{TOKEN}";</script></head>
        <body><form method="post"><input type="hidden" name="__csrf_magic" value="{TOKEN}" /></form></body></html>"#
    )
}

pub fn input_errors_page(messages: &[&str]) -> String {
    let items: String = messages.iter().map(|m| format!("<li>{m}</li>")).collect();
    format!(
        r#"<html><body><div class="alert alert-danger input-errors">
        <p>The following input errors were detected:</p><ul>{items}</ul></div></body></html>"#
    )
}

pub fn command_page(json: &str) -> String {
    let escaped = json
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;");
    format!(
        r#"<html><body><pre class="output">PFSENSE_API_RESULT:{escaped}</pre></body></html>"#
    )
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

/// Entry page plus a login POST that accepts `admin` and sets a cookie.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(html(login_page(None)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index.php"))
        .and(body_string_contains("usernamefld=admin"))
        .respond_with(
            html("<html><body>Dashboard</body></html>".into())
                .insert_header("set-cookie", "PHPSESSID=deadbeef; Path=/; HttpOnly"),
        )
        .mount(server)
        .await;
}

/// Token source for a form page.
pub async fn mount_form(server: &MockServer, page: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(form_page()))
        .mount(server)
        .await;
}

/// A PHP evaluation whose script contains `marker` answers with `json`.
pub fn command(marker: &str, json: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/diag_command.php"))
        .and(body_string_contains(marker))
        .respond_with(html(command_page(json)))
}

/// Logout POST on the entry page.
pub fn logout() -> Mock {
    Mock::given(method("POST"))
        .and(path("/index.php"))
        .and(query_param("logout", ""))
        .respond_with(html(login_page(None)))
        .with_priority(1)
}

/// A logged-in-ready backend: login plus the command page token source.
pub async fn backend() -> MockServer {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_form(&server, "/diag_command.php").await;
    server
}

pub fn session(server: &MockServer) -> Arc<SessionClient> {
    session_with(server, RetryPolicy::immediate(2))
}

pub fn session_with(server: &MockServer, retry: RetryPolicy) -> Arc<SessionClient> {
    let credentials = Credentials {
        username: "admin".into(),
        password: SecretString::from("pfsense".to_owned()),
    };
    Arc::new(
        SessionClient::new(
            Url::parse(&server.uri()).unwrap(),
            credentials,
            TransportConfig::default(),
            retry,
        )
        .unwrap(),
    )
}
