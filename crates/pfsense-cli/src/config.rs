//! CLI configuration: a thin layer over `pfsense_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--url,
//! --username, --insecure, --timeout, --max-attempts).

use pfsense_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use pfsense_config::{Config, Profile, config_path, load_config, save_config, store_password};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Apply flag overrides on top of a stored profile.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(max_attempts) = global.max_attempts {
        profile.max_attempts = Some(max_attempts);
    }
    profile
}

/// Build the runtime config from the config file, the active profile and
/// flag overrides.
///
/// A profile named explicitly with `--profile` must exist. Without one the
/// stored default profile is used when present, otherwise flags and
/// environment alone describe the firewall.
pub fn resolve_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(&cfg),
                name: profile_name,
            });
        }
        None => Profile::default(),
    };

    let profile = apply_overrides(profile, global);
    Ok(pfsense_config::profile_to_controller_config(
        &profile,
        &profile_name,
        &cfg.defaults,
    )?)
}
