//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Status line on stderr, so stdout stays machine-readable.
pub fn print_status(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use pfsense_core::{IpAliasEntry, SystemVersion};

    use super::*;

    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "Address")]
        address: String,
    }

    fn entries() -> Vec<IpAliasEntry> {
        vec![
            IpAliasEntry {
                address: "10.0.0.1".into(),
                description: None,
            },
            IpAliasEntry {
                address: "10.0.0.2".into(),
                description: Some("backup".into()),
            },
        ]
    }

    fn render(format: &OutputFormat) -> String {
        render_list(
            format,
            &entries(),
            |e| EntryRow {
                address: e.address.clone(),
            },
            |e| e.address.clone(),
        )
    }

    #[test]
    fn plain_lists_one_identifier_per_line() {
        assert_eq!(render(&OutputFormat::Plain), "10.0.0.1\n10.0.0.2");
    }

    #[test]
    fn table_has_header_and_rows() {
        let table = render(&OutputFormat::Table);
        assert!(table.contains("Address"));
        assert!(table.contains("10.0.0.2"));
    }

    #[test]
    fn compact_json_is_single_line() {
        let json = render(&OutputFormat::JsonCompact);
        assert!(!json.contains('\n'));
        assert!(json.contains(r#""description":"backup""#));
    }

    #[test]
    fn single_item_uses_detail_view_for_tables() {
        let version = SystemVersion {
            current: "2.7.2".into(),
            latest: "2.8.0".into(),
        };
        let detail = render_single(
            &OutputFormat::Table,
            &version,
            |v| format!("Installed: {}", v.current),
            |v| v.current.clone(),
        );
        assert_eq!(detail, "Installed: 2.7.2");

        let yaml = render_single(&OutputFormat::Yaml, &version, |_| String::new(), |_| {
            String::new()
        });
        assert!(yaml.contains("latest: 2.8.0"));
    }
}
