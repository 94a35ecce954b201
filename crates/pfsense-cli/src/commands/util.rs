//! Shared helpers for command handlers.

use std::io::{IsTerminal, Read};
use std::path::Path;

use pfsense_core::{ApplyStatus, Committed};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so `--yes` is required.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Content for `--content` / `--from-file`; `-` reads stdin.
pub fn read_content(inline: Option<String>, path: Option<&Path>) -> Result<String, CliError> {
    match (inline, path) {
        (Some(content), _) => Ok(content),
        (None, Some(path)) if path == Path::new("-") => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
        (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
        (None, None) => Err(CliError::Validation {
            field: "content".into(),
            reason: "pass --content or --from-file".into(),
        }),
    }
}

/// Report a committed mutation.
///
/// The rendered entity is printed whatever the apply outcome; a failed
/// apply then becomes the command's error.
pub fn finish<T>(
    committed: Committed<T>,
    global: &GlobalOpts,
    subsystem: &str,
    retry_command: &str,
    render: impl FnOnce(&T) -> String,
) -> Result<(), CliError> {
    let Committed { value, apply } = committed;
    output::print_output(&render(&value), global.quiet);
    match apply {
        ApplyStatus::Applied => {
            output::print_status(&format!("✓ {subsystem} changes applied"), global.quiet);
            Ok(())
        }
        ApplyStatus::Skipped => {
            output::print_status(
                &format!("Staged; run `pfsense {retry_command}` to apply"),
                global.quiet,
            );
            Ok(())
        }
        ApplyStatus::Failed(err) => Err(CliError::ApplyFailed {
            subsystem: subsystem.into(),
            reason: err.to_string(),
            retry_command: retry_command.into(),
        }),
    }
}
