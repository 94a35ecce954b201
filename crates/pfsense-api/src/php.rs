// PHP evaluation channel
//
// The web interface has no read API. State is read (and config files are
// written) by evaluating a short PHP snippet through the command page and
// decoding the JSON it echoes. Output is located by a marker so warnings
// printed ahead of it do not break decoding.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;
use crate::markup;
use crate::session::{SessionClient, SessionRequest};

const COMMAND_PATH: &str = "/diag_command.php";
const RESULT_MARKER: &str = "PFSENSE_API_RESULT:";

/// Render `value` as a PHP single-quoted string literal.
pub(crate) fn literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Wrap statements that assign `$result` so the value is echoed as JSON.
fn script(statements: &str) -> String {
    format!(
        "$result = null;\n{statements}\necho {marker} . json_encode($result);",
        marker = literal(RESULT_MARKER),
    )
}

/// Pull the JSON payload out of a command page.
fn extract(body: &str) -> Result<&str, Error> {
    body.rfind(RESULT_MARKER)
        .map(|at| body[at + RESULT_MARKER.len()..].trim())
        .ok_or_else(|| Error::Deserialization {
            message: "PHP output carried no result marker".into(),
            body: body.chars().take(500).collect(),
        })
}

/// Evaluate `statements` on the backend and decode `$result`.
pub(crate) async fn eval<T: DeserializeOwned>(
    session: &SessionClient,
    statements: &str,
    cancel: &CancellationToken,
) -> Result<T, Error> {
    let request = SessionRequest::post(COMMAND_PATH)
        .field("txtPHPCommand", script(statements))
        .field("submit", "EXEC");

    let page = session
        .send(request, cancel)
        .await?
        .error_for_status(COMMAND_PATH)?
        .error_for_input()?;

    let output = markup::pre_block(&page.body).ok_or_else(|| Error::Deserialization {
        message: "command page had no output block".into(),
        body: page.body.chars().take(500).collect(),
    })?;

    let json = extract(&output)?;
    debug!(bytes = json.len(), "decoded PHP result");
    serde_json::from_str(json).map_err(|e| Error::Deserialization {
        message: format!(
            "{e} (output preview: {:?})",
            json.chars().take(200).collect::<String>()
        ),
        body: output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn literal_escapes_quotes_and_backslashes() {
        assert_eq!(literal("custom.conf"), "'custom.conf'");
        assert_eq!(literal("it's"), r"'it\'s'");
        assert_eq!(literal(r"a\b"), r"'a\\b'");
        assert_eq!(literal("server:\n verbosity: 1"), "'server:\n verbosity: 1'");
    }

    #[test]
    fn script_echoes_marked_json() {
        let s = script("$result = 1;");
        assert!(s.starts_with("$result = null;\n$result = 1;\n"));
        assert!(s.ends_with("echo 'PFSENSE_API_RESULT:' . json_encode($result);"));
    }

    #[test]
    fn extract_skips_leading_warnings() {
        let out = "Warning: something\nPFSENSE_API_RESULT:{\"a\":1}\n";
        assert_eq!(extract(out).ok(), Some("{\"a\":1}"));
    }

    #[test]
    fn extract_without_marker_is_deserialization_error() {
        assert!(matches!(
            extract("Parse error"),
            Err(Error::Deserialization { .. })
        ));
    }
}
