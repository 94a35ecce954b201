//! Firewall command handlers (IP aliases + filter reload).

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use pfsense_core::{Controller, CoreError, IpAlias};

use crate::cli::{AliasInput, AliasesCommand, FirewallArgs, FirewallCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

const SUBSYSTEM: &str = "firewall filter";
const RELOAD_COMMAND: &str = "firewall reload";

// ── Alias table row ─────────────────────────────────────────────────

#[derive(Tabled)]
struct AliasRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    alias_type: String,
    #[tabled(rename = "Entries")]
    entries: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&IpAlias> for AliasRow {
    fn from(a: &IpAlias) -> Self {
        Self {
            name: a.name.clone(),
            alias_type: a.alias_type.to_string(),
            entries: a
                .entries
                .iter()
                .map(|e| e.address.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            description: a.description.clone().unwrap_or_default(),
        }
    }
}

fn alias_detail(a: &IpAlias) -> String {
    let mut lines = vec![
        format!("Name:        {}", a.name),
        format!("Type:        {}", a.alias_type),
        format!("Description: {}", a.description.as_deref().unwrap_or("-")),
    ];
    if a.entries.is_empty() {
        lines.push("Entries:     (none)".into());
    } else {
        lines.push("Entries:".into());
        lines.extend(a.entries.iter().map(|e| match e.description {
            Some(ref d) => format!("  - {}  ({d})", e.address),
            None => format!("  - {}", e.address),
        }));
    }
    lines.join("\n")
}

fn alias_from(input: &AliasInput) -> IpAlias {
    IpAlias {
        name: input.name.clone(),
        description: input.description.clone(),
        alias_type: input.alias_type.into(),
        entries: input.entries.clone(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: FirewallArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        FirewallCommand::Aliases(args) => {
            handle_aliases(controller, args.command, global, cancel).await
        }
        FirewallCommand::Reload => {
            controller.reload_firewall_filter(cancel).await?;
            output::print_status("✓ Filter reloaded", global.quiet);
            Ok(())
        }
    }
}

async fn handle_aliases(
    controller: &Controller,
    command: AliasesCommand,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let aliases = controller.ip_aliases();
    match command {
        AliasesCommand::List => {
            let all = aliases
                .resource()
                .list(cancel)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &all,
                |a| AliasRow::from(a),
                |a| a.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AliasesCommand::Get { name } => {
            let alias = aliases.read(&name, cancel).await?;
            let out = output::render_single(&global.output, &alias, alias_detail, |a| {
                a.entries
                    .iter()
                    .map(|e| e.address.clone())
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AliasesCommand::Create(input) => {
            let committed = aliases
                .create(&alias_from(&input), input.apply.options(), cancel)
                .await?;
            util::finish(committed, global, SUBSYSTEM, RELOAD_COMMAND, |a| {
                output::render_single(&global.output, a, alias_detail, |a| a.name.clone())
            })
        }

        AliasesCommand::Update(input) => {
            let committed = aliases
                .update(&alias_from(&input), input.apply.options(), cancel)
                .await?;
            util::finish(committed, global, SUBSYSTEM, RELOAD_COMMAND, |a| {
                output::render_single(&global.output, a, alias_detail, |a| a.name.clone())
            })
        }

        AliasesCommand::Delete { name, apply } => {
            if !util::confirm(
                "firewall aliases delete",
                &format!("Delete alias '{name}'? Rules referencing it will break."),
                global.yes,
            )? {
                return Ok(());
            }
            let committed = aliases.delete(&name, apply.options(), cancel).await?;
            output::print_status(&format!("✓ Deleted alias '{name}'"), global.quiet);
            util::finish(committed, global, SUBSYSTEM, RELOAD_COMMAND, |_| String::new())
        }
    }
}
