// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./draftwise.toml` > `~/.config/draftwise/draftwise.toml`
//! > `/etc/draftwise/draftwise.toml` with environment variable overrides via the
//! `DRAFTWISE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DraftwiseConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/draftwise/draftwise.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "draftwise.toml";

/// Sections reachable through `DRAFTWISE_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "engine",
    "routing",
    "cascade",
    "quality",
    "confidence",
    "budget",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("draftwise/draftwise.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/draftwise/draftwise.toml` (system-wide)
/// 3. `~/.config/draftwise/draftwise.toml` (user XDG config)
/// 4. `./draftwise.toml` (local directory)
/// 5. `DRAFTWISE_*` environment variables
pub fn load_config() -> Result<DraftwiseConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DraftwiseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DraftwiseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DraftwiseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DraftwiseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DraftwiseConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `DRAFTWISE_CASCADE_GLOBAL_THRESHOLD` must map to
/// `cascade.global_threshold`, not `cascade.global.threshold`.
fn env_provider() -> Env {
    Env::prefixed("DRAFTWISE_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}
