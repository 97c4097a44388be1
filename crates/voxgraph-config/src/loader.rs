// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./voxgraph.toml` > `~/.config/voxgraph/voxgraph.toml`
//! > `/etc/voxgraph/voxgraph.toml` with environment variable overrides via
//! the `VOXGRAPH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VoxgraphConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/voxgraph/voxgraph.toml` (system-wide)
/// 3. `~/.config/voxgraph/voxgraph.toml` (user XDG config)
/// 4. `./voxgraph.toml` (local directory)
/// 5. `VOXGRAPH_*` environment variables
pub fn load_config() -> Result<VoxgraphConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoxgraphConfig::default()))
        .merge(Toml::file("/etc/voxgraph/voxgraph.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("voxgraph/voxgraph.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("voxgraph.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<VoxgraphConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoxgraphConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VoxgraphConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoxgraphConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `VOXGRAPH_CACHE_TTL_SECS` must map to `cache.ttl_secs`, not
/// `cache.ttl.secs`.
fn env_provider() -> Env {
    Env::prefixed("VOXGRAPH_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("logging_", "logging.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("speech_", "speech.", 1)
            .replacen("generator_", "generator.", 1)
            .replacen("pipeline_", "pipeline.", 1)
            .replacen("feedback_", "feedback.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.speech.language_codes, vec!["auto"]);
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = load_config_from_str(
            r#"
[server]
host = "127.0.0.1"
port = 9000

[cache]
url = "redis://cache:6379/1"

[speech]
language_codes = ["ko-KR", "en-US"]

[feedback]
enabled = true
bucket = "voxgraph-artifacts"
"#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cache.url, "redis://cache:6379/1");
        assert_eq!(config.speech.language_codes, vec!["ko-KR", "en-US"]);
        assert!(config.feedback.enabled);
        assert_eq!(config.feedback.bucket.as_deref(), Some("voxgraph-artifacts"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = load_config_from_str(
            r#"
[server]
hots = "127.0.0.1"
"#,
        )
        .expect_err("unknown key should fail extraction");
        let msg = format!("{err}");
        assert!(
            msg.contains("unknown field") || msg.contains("hots"),
            "error should mention the bad key, got: {msg}"
        );
    }
}
