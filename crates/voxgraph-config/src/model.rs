// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Voxgraph server.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Voxgraph configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoxgraphConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Graph cache (Redis) settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Speech recognizer settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// LLM generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Per-connection pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Feedback collection settings.
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Permissive CORS and verbose errors when set.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" for production, "console" for development.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Graph cache (Redis) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Redis connection URL.
    #[serde(default = "default_cache_url")]
    pub url: String,

    /// TTL applied to graph keys, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

/// Speech recognizer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechConfig {
    /// Recognizer HTTP endpoint base URL.
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// API key. `None` requires ambient credentials on the endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default BCP-47 language hints; `["auto"]` enables detection.
    #[serde(default = "default_language_codes")]
    pub language_codes: Vec<String>,

    /// Per-segment transcription timeout enforced by the STT worker.
    #[serde(default = "default_stt_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_speech_endpoint(),
            api_key: None,
            language_codes: default_language_codes(),
            timeout_secs: default_stt_timeout_secs(),
        }
    }
}

fn default_speech_endpoint() -> String {
    "http://localhost:9090".to_string()
}

fn default_language_codes() -> Vec<String> {
    vec!["auto".to_string()]
}

fn default_stt_timeout_secs() -> u64 {
    30
}

/// LLM generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Generator HTTP endpoint base URL.
    #[serde(default = "default_generator_endpoint")]
    pub endpoint: String,

    /// API key. `None` requires ambient credentials on the endpoint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request.
    #[serde(default = "default_generator_model")]
    pub model: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generator_endpoint(),
            api_key: None,
            model: default_generator_model(),
        }
    }
}

fn default_generator_endpoint() -> String {
    "http://localhost:9091".to_string()
}

fn default_generator_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Per-connection pipeline tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Sentences accumulated before an extraction triggers.
    #[serde(default = "default_extraction_batch_size")]
    pub extraction_batch_size: usize,

    /// Concurrent extraction calls allowed per process.
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extraction_batch_size: default_extraction_batch_size(),
            max_concurrent_extractions: default_max_concurrent_extractions(),
        }
    }
}

fn default_extraction_batch_size() -> usize {
    3
}

fn default_max_concurrent_extractions() -> usize {
    3
}

/// Feedback collection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Master switch for the feedback workflow and warehouse logging.
    #[serde(default)]
    pub enabled: bool,

    /// Object store bucket for audio/graph/log uploads.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Object store HTTP endpoint base URL.
    #[serde(default = "default_object_store_endpoint")]
    pub object_store_endpoint: String,

    /// Warehouse HTTP endpoint base URL.
    #[serde(default = "default_warehouse_endpoint")]
    pub warehouse_endpoint: String,

    /// Warehouse dataset holding the event tables.
    #[serde(default = "default_warehouse_dataset")]
    pub dataset: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: None,
            object_store_endpoint: default_object_store_endpoint(),
            warehouse_endpoint: default_warehouse_endpoint(),
            dataset: default_warehouse_dataset(),
        }
    }
}

fn default_object_store_endpoint() -> String {
    "http://localhost:9092".to_string()
}

fn default_warehouse_endpoint() -> String {
    "http://localhost:9093".to_string()
}

fn default_warehouse_dataset() -> String {
    "voxgraph".to_string()
}
