//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod dns;
pub mod firewall;
pub mod system;
pub mod util;

use tokio_util::sync::CancellationToken;

use pfsense_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a firewall-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Dns(args) => dns::handle(controller, args, global, cancel).await,
        Command::Firewall(args) => firewall::handle(controller, args, global, cancel).await,
        Command::System(args) => system::handle(controller, args, global, cancel).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
