// Markup scraping
//
// The management interface speaks HTML only. These helpers pull the few
// facts the client needs out of a page: the anti-forgery token, whether
// the page is the login form, rendered input errors, alert text, and the
// `<pre>` block that carries PHP evaluation output.

use std::sync::LazyLock;

use regex::Regex;

/// Name of the hidden anti-forgery field on every form.
pub const CSRF_FIELD: &str = "__csrf_magic";

static CSRF_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name=['"]__csrf_magic['"][^>]*?value=['"]([^'"]+)['"]"#).expect("valid regex")
});

static CSRF_INPUT_REVERSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"value=['"]([^'"]+)['"][^>]*?name=['"]__csrf_magic['"]"#).expect("valid regex")
});

static CSRF_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"csrfMagicToken\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

static LOGIN_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name=['"]usernamefld['"]"#).expect("valid regex"));

static INPUT_ERRORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class=['"][^'"]*input-errors[^'"]*['"][^>]*>(.*?)</div>"#)
        .expect("valid regex")
});

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").expect("valid regex"));

static DANGER_ALERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class=['"][^'"]*alert-danger[^'"]*['"][^>]*>(.*?)</div>"#)
        .expect("valid regex")
});

static PRE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<pre[^>]*>(.*?)</pre>").expect("valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Extract the anti-forgery token from a page, if present.
pub fn csrf_token(body: &str) -> Option<String> {
    [&*CSRF_INPUT, &*CSRF_INPUT_REVERSED, &*CSRF_SCRIPT]
        .into_iter()
        .find_map(|re| re.captures(body))
        .map(|caps| caps[1].to_owned())
}

/// Whether the page is the login form (username input present).
pub fn is_login_form(body: &str) -> bool {
    LOGIN_FIELD.is_match(body)
}

/// Messages from the page's input-error block, in order.
pub fn input_errors(body: &str) -> Vec<String> {
    let Some(block) = INPUT_ERRORS.captures(body) else {
        return Vec::new();
    };
    let items: Vec<String> = LIST_ITEM
        .captures_iter(&block[1])
        .map(|caps| text(&caps[1]))
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        let whole = text(&block[1]);
        if whole.is_empty() {
            return Vec::new();
        }
        return vec![whole];
    }
    items
}

/// Text of the first danger alert (e.g. the login failure banner).
pub fn danger_alert(body: &str) -> Option<String> {
    DANGER_ALERT
        .captures(body)
        .map(|caps| text(&caps[1]))
        .filter(|s| !s.is_empty())
}

/// Unescaped contents of the first `<pre>` block.
pub fn pre_block(body: &str) -> Option<String> {
    PRE_BLOCK.captures(body).map(|caps| unescape(&caps[1]))
}

/// Strip tags, unescape entities and collapse whitespace.
fn text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    unescape(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reverse the escaping applied by `htmlspecialchars`.
pub fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const LOGIN_PAGE: &str = r#"<html><head>
        <script type="text/javascript">var csrfMagicToken = "sid:abc123,1700000000";</script>
        </head><body>
        <form class="login" method="post">
          <input type='hidden' name='__csrf_magic' value="sid:abc123,1700000000" />
          <input type="text" name="usernamefld" id="usernamefld" />
          <input type="password" name="passwordfld" id="passwordfld" />
        </form></body></html>"#;

    #[test]
    fn finds_token_in_hidden_input() {
        assert_eq!(
            csrf_token(LOGIN_PAGE).as_deref(),
            Some("sid:abc123,1700000000")
        );
    }

    #[test]
    fn finds_token_in_script_only_page() {
        let page = r"<script>var csrfMagicToken = 'sid:xyz,1';</script>";
        assert_eq!(csrf_token(page).as_deref(), Some("sid:xyz,1"));
    }

    #[test]
    fn finds_token_with_value_before_name() {
        let page = r#"<input type="hidden" value="sid:rev,2" name="__csrf_magic">"#;
        assert_eq!(csrf_token(page).as_deref(), Some("sid:rev,2"));
    }

    #[test]
    fn missing_token_is_none() {
        assert_eq!(csrf_token("<html><body>nothing</body></html>"), None);
    }

    #[test]
    fn detects_login_form() {
        assert!(is_login_form(LOGIN_PAGE));
        assert!(!is_login_form("<html><body>Dashboard</body></html>"));
    }

    #[test]
    fn collects_input_errors() {
        let page = r#"<div class="alert alert-danger input-errors">
            <p>The following input errors were detected:</p>
            <ul>
              <li>A valid domain must be specified.</li>
              <li>A valid IP address must be specified, for example 192.168.100.10.</li>
            </ul>
        </div>"#;
        assert_eq!(
            input_errors(page),
            vec![
                "A valid domain must be specified.".to_owned(),
                "A valid IP address must be specified, for example 192.168.100.10.".to_owned(),
            ]
        );
        assert!(input_errors("<div class=\"alert alert-success\">ok</div>").is_empty());
    }

    #[test]
    fn reads_danger_alert_text() {
        let page = r#"<div class="col-sm-offset-3 alert alert-danger">
            Username or Password incorrect</div>"#;
        assert_eq!(
            danger_alert(page).as_deref(),
            Some("Username or Password incorrect")
        );
    }

    #[test]
    fn pre_block_is_unescaped() {
        let page = r#"<pre class="output">{&quot;name&quot;:&quot;a &amp; b&quot;}</pre>"#;
        assert_eq!(pre_block(page).as_deref(), Some(r#"{"name":"a & b"}"#));
    }

    #[test]
    fn unescape_handles_double_encoding_once() {
        assert_eq!(unescape("&amp;lt;"), "&lt;");
        assert_eq!(unescape("it&#039;s"), "it's");
    }
}
