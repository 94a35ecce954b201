#![allow(clippy::unwrap_used)]
// DNS resolver subsystem against a fake management interface.

mod common;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::Mock;

use common::html;
use pfsense_api::{Apply, ConfigFile, DnsResolverClient, DomainOverride, Error, Resource};

fn custom_conf() -> ConfigFile {
    ConfigFile {
        name: "custom.conf".into(),
        content: "server:\n verbosity: 1".into(),
    }
}

fn internal_override() -> DomainOverride {
    DomainOverride {
        domain: "internal.example".into(),
        ip_address: "10.0.0.53".into(),
        tls_queries: false,
        tls_hostname: None,
        description: Some("corp resolver".into()),
    }
}

const INTERNAL_JSON: &str =
    r#"[{"domain":"internal.example","ip":"10.0.0.53","descr":"corp resolver"}]"#;

// ── Config files ────────────────────────────────────────────────────

#[tokio::test]
async fn create_config_file_returns_persisted_entity() {
    let server = common::backend().await;
    common::command(
        "file_exists",
        r#"{"status":"ok","content":"server:\n verbosity: 1"}"#,
    )
    .expect(1)
    .mount(&server)
    .await;

    let files = DnsResolverClient::new(common::session(&server)).config_files();
    let created = files
        .create(&custom_conf(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(created, custom_conf());
}

#[tokio::test]
async fn create_existing_config_file_conflicts() {
    let server = common::backend().await;
    common::command("file_exists", r#"{"status":"exists"}"#)
        .mount(&server)
        .await;

    let files = DnsResolverClient::new(common::session(&server)).config_files();
    let result = files.create(&custom_conf(), &CancellationToken::new()).await;

    assert!(
        matches!(&result, Err(Error::Conflict { key, .. }) if key == "custom.conf"),
        "{result:?}"
    );
}

#[tokio::test]
async fn delete_absent_config_file_is_not_found() {
    let server = common::backend().await;
    common::command("unlink", r#"{"status":"missing"}"#)
        .mount(&server)
        .await;

    let files = DnsResolverClient::new(common::session(&server)).config_files();
    let result = files.delete("gone.conf", &CancellationToken::new()).await;

    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn list_config_files() {
    let server = common::backend().await;
    common::command(
        "glob",
        r#"[{"name":"custom.conf","content":"server:\n verbosity: 1"},{"name":"extra.conf","content":""}]"#,
    )
    .mount(&server)
    .await;

    let files = DnsResolverClient::new(common::session(&server)).config_files();
    let listed = files.list(&CancellationToken::new()).await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0], custom_conf());
    assert_eq!(listed[1].name, "extra.conf");
}

// ── Domain overrides ────────────────────────────────────────────────

#[tokio::test]
async fn read_absent_domain_override_is_not_found() {
    let server = common::backend().await;
    common::command("domainoverrides", "[]").mount(&server).await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let result = overrides
        .read("internal.example", &CancellationToken::new())
        .await;

    match result {
        Err(Error::NotFound { kind, key }) => {
            assert_eq!(kind, "domain override");
            assert_eq!(key, "internal.example");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn read_domain_override_reconstructs_entity() {
    let server = common::backend().await;
    common::command("domainoverrides", INTERNAL_JSON)
        .mount(&server)
        .await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let read = overrides
        .read("internal.example", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(read, internal_override());
}

#[tokio::test]
async fn create_domain_override_submits_form_and_reads_back() {
    let server = common::backend().await;
    common::command("domainoverrides", "[]")
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    common::command("domainoverrides", INTERNAL_JSON)
        .mount(&server)
        .await;
    common::mount_form(&server, "/services_unbound_domainoverride_edit.php").await;
    Mock::given(method("POST"))
        .and(path("/services_unbound_domainoverride_edit.php"))
        .and(body_string_contains(common::TOKEN_FORM))
        .and(body_string_contains("domain=internal.example"))
        .and(body_string_contains("server=10.0.0.53"))
        .and(body_string_contains("save=Save"))
        .respond_with(html(common::form_page()))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let created = overrides
        .create(&internal_override(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(created, internal_override());
}

#[tokio::test]
async fn session_lapse_after_save_reads_back_without_conflict() {
    let server = common::backend().await;
    // First token fetch serves the conflict check, the second finds the
    // session gone, later ones follow the fresh login.
    Mock::given(method("GET"))
        .and(path("/diag_command.php"))
        .respond_with(html(common::form_page()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/diag_command.php"))
        .respond_with(html(common::login_page(None)))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;
    common::command("domainoverrides", "[]")
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    common::command("domainoverrides", INTERNAL_JSON)
        .mount(&server)
        .await;
    common::mount_form(&server, "/services_unbound_domainoverride_edit.php").await;
    Mock::given(method("POST"))
        .and(path("/services_unbound_domainoverride_edit.php"))
        .and(body_string_contains("domain=internal.example"))
        .respond_with(html(common::form_page()))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let created = overrides
        .create(&internal_override(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(created, internal_override());
}

#[tokio::test]
async fn create_existing_domain_override_conflicts_without_submitting() {
    let server = common::backend().await;
    common::command("domainoverrides", INTERNAL_JSON)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services_unbound_domainoverride_edit.php"))
        .respond_with(html(common::form_page()))
        .expect(0)
        .mount(&server)
        .await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let result = overrides
        .create(&internal_override(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::Conflict { .. })), "{result:?}");
}

#[tokio::test]
async fn rejected_domain_override_is_validation_error() {
    let server = common::backend().await;
    common::command("domainoverrides", "[]").mount(&server).await;
    common::mount_form(&server, "/services_unbound_domainoverride_edit.php").await;
    Mock::given(method("POST"))
        .and(path("/services_unbound_domainoverride_edit.php"))
        .respond_with(html(common::input_errors_page(&[
            "A valid IP address must be specified, for example 192.168.100.10.",
        ])))
        .mount(&server)
        .await;

    let mut bad = internal_override();
    bad.ip_address = "not-an-ip".into();
    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let result = overrides.create(&bad, &CancellationToken::new()).await;

    match result {
        Err(Error::Validation { messages }) => assert_eq!(messages.len(), 1),
        other => panic!("expected Validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_domain_override_by_index() {
    let server = common::backend().await;
    common::command(
        "domainoverrides",
        r#"[{"domain":"lab.example","ip":"10.1.0.53"},{"domain":"internal.example","ip":"10.0.0.53"}]"#,
    )
    .mount(&server)
    .await;
    common::mount_form(&server, "/services_unbound.php").await;
    Mock::given(method("POST"))
        .and(path("/services_unbound.php"))
        .and(body_string_contains("act=del"))
        .and(body_string_contains("type=doverride"))
        .and(body_string_contains("id=1"))
        .respond_with(html(common::form_page()))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    overrides
        .delete("internal.example", &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_absent_domain_override_sends_no_delete() {
    let server = common::backend().await;
    common::command("domainoverrides", "[]").mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/services_unbound.php"))
        .respond_with(html(common::form_page()))
        .expect(0)
        .mount(&server)
        .await;

    let overrides = DnsResolverClient::new(common::session(&server)).domain_overrides();
    let result = overrides
        .delete("internal.example", &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(Error::NotFound { .. })), "{result:?}");
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_posts_apply_changes() {
    let server = common::backend().await;
    common::mount_form(&server, "/services_unbound.php").await;
    Mock::given(method("POST"))
        .and(path("/services_unbound.php"))
        .and(body_string_contains("apply=Apply+Changes"))
        .respond_with(html(common::form_page()))
        .expect(1)
        .mount(&server)
        .await;

    DnsResolverClient::new(common::session(&server))
        .apply(&CancellationToken::new())
        .await
        .unwrap();
}
