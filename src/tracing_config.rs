//! Tracing setup for applications and tests that embed the mapper.
//!
//! Three output formats, chosen with `REMAP_LOG_FORMAT`:
//!
//! - `text` (default): flat `tracing-subscriber` lines
//! - `tree`: indented spans and events via `tracing-tree`
//! - `json`: one JSON object per event
//!
//! ```bash
//! REMAP_LOG=debug REMAP_LOG_FORMAT=tree cargo test -p remap
//! REMAP_LOG="remap_core::factory=debug,remap_core::specs=trace" my-app
//! ```
//!
//! Nothing is installed unless `REMAP_LOG` (or `RUST_LOG`) is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Flat text lines.
    Text,
    /// Hierarchical output via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("REMAP_LOG_FORMAT").unwrap_or_default())
    }
}

/// `REMAP_LOG` when set, otherwise `RUST_LOG`.
fn build_filter() -> EnvFilter {
    match std::env::var("REMAP_LOG") {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Install the global subscriber. Returns `false` when logging was not
/// requested or a subscriber is already installed.
///
/// Output goes to stderr.
pub fn init_tracing() -> bool {
    if std::env::var_os("REMAP_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
        return false;
    }
    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(tree_layer).try_init().is_ok()
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).try_init().is_ok()
        }
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    }
}
