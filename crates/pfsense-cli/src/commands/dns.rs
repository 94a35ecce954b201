//! DNS resolver command handlers (config files, domain overrides, apply).

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use pfsense_core::{ConfigFile, Controller, CoreError, DomainOverride};

use crate::cli::{
    ApplyArgs, ConfigFileInput, ConfigFilesCommand, DnsArgs, DnsCommand, GlobalOpts, OverrideInput,
    OverridesCommand,
};
use crate::error::CliError;
use crate::output;

use super::util;

const SUBSYSTEM: &str = "DNS resolver";
const APPLY_COMMAND: &str = "dns apply";

// ── Config file rows ────────────────────────────────────────────────

#[derive(Tabled)]
struct ConfigFileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lines")]
    lines: usize,
    #[tabled(rename = "Bytes")]
    bytes: usize,
}

impl From<&ConfigFile> for ConfigFileRow {
    fn from(f: &ConfigFile) -> Self {
        Self {
            name: f.name.clone(),
            lines: f.content.lines().count(),
            bytes: f.content.len(),
        }
    }
}

fn config_file_detail(f: &ConfigFile) -> String {
    format!("# {}\n{}", f.name, f.content.trim_end())
}

fn config_file_from(input: ConfigFileInput) -> Result<(ConfigFile, ApplyArgs), CliError> {
    let content = util::read_content(input.content, input.from_file.as_deref())?;
    Ok((
        ConfigFile {
            name: input.name,
            content,
        },
        input.apply,
    ))
}

// ── Domain override rows ────────────────────────────────────────────

#[derive(Tabled)]
struct OverrideRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "TLS")]
    tls: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&DomainOverride> for OverrideRow {
    fn from(o: &DomainOverride) -> Self {
        Self {
            domain: o.domain.clone(),
            server: o.ip_address.clone(),
            tls: match (o.tls_queries, o.tls_hostname.as_deref()) {
                (false, _) => "no".into(),
                (true, None) => "yes".into(),
                (true, Some(host)) => format!("yes ({host})"),
            },
            description: o.description.clone().unwrap_or_default(),
        }
    }
}

fn override_detail(o: &DomainOverride) -> String {
    [
        format!("Domain:       {}", o.domain),
        format!("Server:       {}", o.ip_address),
        format!("TLS queries:  {}", o.tls_queries),
        format!("TLS hostname: {}", o.tls_hostname.as_deref().unwrap_or("-")),
        format!("Description:  {}", o.description.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

fn override_from(input: &OverrideInput) -> DomainOverride {
    DomainOverride {
        domain: input.domain.clone(),
        ip_address: input.ip.clone(),
        tls_queries: input.tls,
        tls_hostname: input.tls_hostname.clone(),
        description: input.description.clone(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DnsArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        DnsCommand::ConfigFiles(args) => {
            handle_config_files(controller, args.command, global, cancel).await
        }
        DnsCommand::Overrides(args) => {
            handle_overrides(controller, args.command, global, cancel).await
        }
        DnsCommand::Apply => {
            controller.apply_dns_resolver(cancel).await?;
            output::print_status(&format!("✓ {SUBSYSTEM} changes applied"), global.quiet);
            Ok(())
        }
    }
}

async fn handle_config_files(
    controller: &Controller,
    command: ConfigFilesCommand,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let files = controller.config_files();
    match command {
        ConfigFilesCommand::List => {
            let all = files
                .resource()
                .list(cancel)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &all,
                |f| ConfigFileRow::from(f),
                |f| f.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigFilesCommand::Get { name } => {
            let file = files.read(&name, cancel).await?;
            let out = output::render_single(&global.output, &file, config_file_detail, |f| {
                f.name.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigFilesCommand::Create(input) => {
            let (file, apply) = config_file_from(input)?;
            let committed = files.create(&file, apply.options(), cancel).await?;
            util::finish(committed, global, SUBSYSTEM, APPLY_COMMAND, |f| {
                output::render_single(&global.output, f, config_file_detail, |f| f.name.clone())
            })
        }

        ConfigFilesCommand::Update(input) => {
            let (file, apply) = config_file_from(input)?;
            let committed = files.update(&file, apply.options(), cancel).await?;
            util::finish(committed, global, SUBSYSTEM, APPLY_COMMAND, |f| {
                output::render_single(&global.output, f, config_file_detail, |f| f.name.clone())
            })
        }

        ConfigFilesCommand::Delete { name, apply } => {
            if !util::confirm(
                "dns config-files delete",
                &format!("Delete config file '{name}'?"),
                global.yes,
            )? {
                return Ok(());
            }
            let committed = files.delete(&name, apply.options(), cancel).await?;
            output::print_status(&format!("✓ Deleted config file '{name}'"), global.quiet);
            util::finish(committed, global, SUBSYSTEM, APPLY_COMMAND, |_| String::new())
        }
    }
}

async fn handle_overrides(
    controller: &Controller,
    command: OverridesCommand,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let overrides = controller.domain_overrides();
    match command {
        OverridesCommand::List => {
            let all = overrides
                .resource()
                .list(cancel)
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &all,
                |o| OverrideRow::from(o),
                |o| o.domain.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        OverridesCommand::Get { domain } => {
            let found = overrides.read(&domain, cancel).await?;
            let out = output::render_single(&global.output, &found, override_detail, |o| {
                o.domain.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        OverridesCommand::Create(input) => {
            let committed = overrides
                .create(&override_from(&input), input.apply.options(), cancel)
                .await?;
            util::finish(committed, global, SUBSYSTEM, APPLY_COMMAND, |o| {
                output::render_single(&global.output, o, override_detail, |o| o.domain.clone())
            })
        }

        OverridesCommand::Update(input) => {
            let committed = overrides
                .update(&override_from(&input), input.apply.options(), cancel)
                .await?;
            util::finish(committed, global, SUBSYSTEM, APPLY_COMMAND, |o| {
                output::render_single(&global.output, o, override_detail, |o| o.domain.clone())
            })
        }

        OverridesCommand::Delete { domain, apply } => {
            if !util::confirm(
                "dns overrides delete",
                &format!("Delete domain override '{domain}'?"),
                global.yes,
            )? {
                return Ok(());
            }
            let committed = overrides.delete(&domain, apply.options(), cancel).await?;
            output::print_status(&format!("✓ Deleted domain override '{domain}'"), global.quiet);
            util::finish(committed, global, SUBSYSTEM, APPLY_COMMAND, |_| String::new())
        }
    }
}
