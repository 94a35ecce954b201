//! System command handlers.

use tokio_util::sync::CancellationToken;

use pfsense_core::{Controller, SystemVersion};

use crate::cli::{GlobalOpts, SystemArgs, SystemCommand};
use crate::error::CliError;
use crate::output;

fn version_detail(v: &SystemVersion) -> String {
    let status = if v.current == v.latest {
        "up to date"
    } else {
        "update available"
    };
    [
        format!("Installed: {}", v.current),
        format!("Latest:    {}", v.latest),
        format!("Status:    {status}"),
    ]
    .join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: SystemArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        SystemCommand::Version => {
            let version = controller.system_version(cancel).await?;
            let out = output::render_single(&global.output, &version, version_detail, |v| {
                v.current.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
