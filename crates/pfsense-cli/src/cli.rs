//! Clap derive structures for the `pfsense` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use pfsense_core::{IpAliasEntry, IpAliasType, MutationOptions};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pfsense -- manage pfSense firewalls through their web interface
#[derive(Debug, Parser)]
#[command(
    name = "pfsense",
    version,
    about = "Manage pfSense DNS resolver and firewall configuration from the command line",
    long_about = "Drives the pfSense web interface with a logged-in session.\n\n\
        Every change is followed by its subsystem's apply unless --no-apply\n\
        is given, so edits can be batched and published once.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Firewall profile to use
    #[arg(long, short = 'p', env = "PFSENSE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Web interface URL (overrides profile)
    #[arg(long, short = 'u', env = "PFSENSE_URL", global = true)]
    pub url: Option<String>,

    /// Login user name (overrides profile)
    #[arg(long, env = "PFSENSE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PFSENSE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PFSENSE_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "PFSENSE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Retries after the first attempt on transient failures
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub max_attempts: Option<i32>,

    /// Give up on the whole command after this many seconds
    #[arg(long, global = true)]
    pub deadline: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the DNS resolver (Unbound)
    Dns(DnsArgs),

    /// Manage firewall aliases and reload the filter
    #[command(alias = "fw")]
    Firewall(FirewallArgs),

    /// System information
    #[command(alias = "sys")]
    System(SystemArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Mutation Arguments ────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Stage the change without applying it to the running configuration
    #[arg(long)]
    pub no_apply: bool,
}

impl ApplyArgs {
    pub fn options(&self) -> MutationOptions {
        if self.no_apply {
            MutationOptions::staged_only()
        } else {
            MutationOptions::default()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DNS RESOLVER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DnsArgs {
    #[command(subcommand)]
    pub command: DnsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DnsCommand {
    /// Manage custom Unbound config files
    #[command(alias = "files")]
    ConfigFiles(ConfigFilesArgs),

    /// Manage domain overrides (forwarding zones)
    #[command(alias = "domain-overrides")]
    Overrides(OverridesArgs),

    /// Apply pending DNS resolver changes
    Apply,
}

#[derive(Debug, Args)]
pub struct ConfigFilesArgs {
    #[command(subcommand)]
    pub command: ConfigFilesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigFilesCommand {
    /// List config files
    #[command(alias = "ls")]
    List,

    /// Show a config file and its content
    Get {
        /// File name (e.g. custom.conf)
        name: String,
    },

    /// Create a config file
    Create(ConfigFileInput),

    /// Replace a config file's content
    Update(ConfigFileInput),

    /// Delete a config file
    #[command(alias = "rm")]
    Delete {
        /// File name
        name: String,

        #[command(flatten)]
        apply: ApplyArgs,
    },
}

#[derive(Debug, Args)]
pub struct ConfigFileInput {
    /// File name (e.g. custom.conf)
    pub name: String,

    /// Inline file content
    #[arg(long, conflicts_with = "from_file", required_unless_present = "from_file")]
    pub content: Option<String>,

    /// Read the content from a local file ("-" for stdin)
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,

    #[command(flatten)]
    pub apply: ApplyArgs,
}

#[derive(Debug, Args)]
pub struct OverridesArgs {
    #[command(subcommand)]
    pub command: OverridesCommand,
}

#[derive(Debug, Subcommand)]
pub enum OverridesCommand {
    /// List domain overrides
    #[command(alias = "ls")]
    List,

    /// Show one domain override
    Get {
        /// Domain name
        domain: String,
    },

    /// Create a domain override
    Create(OverrideInput),

    /// Update a domain override
    Update(OverrideInput),

    /// Delete a domain override
    #[command(alias = "rm")]
    Delete {
        /// Domain name
        domain: String,

        #[command(flatten)]
        apply: ApplyArgs,
    },
}

#[derive(Debug, Args)]
pub struct OverrideInput {
    /// Domain whose lookups are forwarded
    pub domain: String,

    /// Upstream server address (IP, optionally with @port)
    #[arg(long)]
    pub ip: String,

    /// Use DNS over TLS towards the upstream
    #[arg(long)]
    pub tls: bool,

    /// Hostname checked against the upstream's TLS certificate
    #[arg(long, requires = "tls")]
    pub tls_hostname: Option<String>,

    /// Free-form description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[command(flatten)]
    pub apply: ApplyArgs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FIREWALL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FirewallArgs {
    #[command(subcommand)]
    pub command: FirewallCommand,
}

#[derive(Debug, Subcommand)]
pub enum FirewallCommand {
    /// Manage host and network aliases
    Aliases(AliasesArgs),

    /// Reload the filter so staged alias changes take effect
    Reload,
}

#[derive(Debug, Args)]
pub struct AliasesArgs {
    #[command(subcommand)]
    pub command: AliasesCommand,
}

#[derive(Debug, Subcommand)]
pub enum AliasesCommand {
    /// List host and network aliases
    #[command(alias = "ls")]
    List,

    /// Show one alias with its entries
    Get {
        /// Alias name
        name: String,
    },

    /// Create an alias
    Create(AliasInput),

    /// Replace an alias's type, description and entries
    Update(AliasInput),

    /// Delete an alias
    #[command(alias = "rm")]
    Delete {
        /// Alias name
        name: String,

        #[command(flatten)]
        apply: ApplyArgs,
    },
}

#[derive(Debug, Args)]
pub struct AliasInput {
    /// Alias name
    pub name: String,

    /// Alias type
    #[arg(long = "type", short = 't', value_enum, default_value = "host")]
    pub alias_type: AliasKind,

    /// Entry as ADDRESS or ADDRESS=DESCRIPTION (repeatable)
    #[arg(long = "entry", short = 'e', value_parser = parse_entry)]
    pub entries: Vec<IpAliasEntry>,

    /// Free-form description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[command(flatten)]
    pub apply: ApplyArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AliasKind {
    Host,
    Network,
}

impl From<AliasKind> for IpAliasType {
    fn from(kind: AliasKind) -> Self {
        match kind {
            AliasKind::Host => Self::Host,
            AliasKind::Network => Self::Network,
        }
    }
}

fn parse_entry(raw: &str) -> Result<IpAliasEntry, String> {
    let (address, description) = match raw.split_once('=') {
        Some((address, description)) => (address.trim(), Some(description.trim())),
        None => (raw.trim(), None),
    };
    if address.is_empty() {
        return Err("entry address cannot be empty".into());
    }
    if address.contains(char::is_whitespace) {
        return Err(format!("entry address '{address}' contains whitespace"));
    }
    Ok(IpAliasEntry {
        address: address.to_owned(),
        description: description.filter(|d| !d.is_empty()).map(str::to_owned),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SYSTEM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemCommand {
    /// Show the installed and latest available versions
    Version,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn entry_with_description() {
        let entry = parse_entry("10.0.0.0/8=rfc1918").unwrap();
        assert_eq!(entry.address, "10.0.0.0/8");
        assert_eq!(entry.description.as_deref(), Some("rfc1918"));
    }

    #[test]
    fn bare_entry_has_no_description() {
        let entry = parse_entry("192.168.1.10").unwrap();
        assert_eq!(entry.address, "192.168.1.10");
        assert_eq!(entry.description, None);
    }

    #[test]
    fn blank_entry_is_rejected() {
        assert!(parse_entry("=label").is_err());
        assert!(parse_entry("10.0.0.1 10.0.0.2").is_err());
    }

    #[test]
    fn no_apply_stages_only() {
        let cli = Cli::try_parse_from([
            "pfsense", "dns", "overrides", "delete", "lab.example", "--no-apply",
        ])
        .unwrap();
        let Command::Dns(DnsArgs {
            command:
                DnsCommand::Overrides(OverridesArgs {
                    command: OverridesCommand::Delete { apply, .. },
                }),
        }) = cli.command
        else {
            panic!("expected dns overrides delete");
        };
        assert!(!apply.options().apply);
    }

    #[test]
    fn negative_max_attempts_parses() {
        let cli = Cli::try_parse_from(["pfsense", "--max-attempts", "-1", "system", "version"])
            .unwrap();
        assert_eq!(cli.global.max_attempts, Some(-1));
    }
}
