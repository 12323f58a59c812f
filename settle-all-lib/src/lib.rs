//! # Settle All Library
//!
//! A bounded-concurrency "settle-all" map for async transforms.
//!
//! Every input is run through the transform and gets exactly one [`Settled`]
//! record at its own index, whether the transform succeeded or failed. At most
//! a fixed number of transforms run at once, and a failing input never aborts
//! the others.
//!
//! ## Quick Start
//!
//! ```rust
//! use settle_all_lib::{settle_all_bounded, Settled};
//!
//! # tokio_test::block_on(async {
//! let input = [1, 2, 3];
//! let results = settle_all_bounded(
//!     &input,
//!     |x, _, _| async move {
//!         if *x == 2 {
//!             Err(format!("no luck with {}", x))
//!         } else {
//!             Ok(x * 10)
//!         }
//!     },
//!     2,
//! )
//! .await;
//!
//! assert_eq!(results[0], Settled::Fulfilled { value: 10 });
//! assert_eq!(results[1], Settled::Rejected { reason: "no luck with 2".to_string() });
//! assert_eq!(results[2], Settled::Fulfilled { value: 30 });
//! # });
//! ```
//!
//! ## Features
//!
//! - **Bounded Concurrency**: a fixed pool of workers drains one shared work source
//! - **Failure Isolation**: per-item failures are values, never aborts
//! - **Index Alignment**: results come back in input order regardless of completion order
//! - **Parallel Variant**: workers can run as spawned Tokio tasks
//! - **Fetch Transform**: optional HTTP GET + JSON field extraction (`fetch` feature)

// Re-export main public API types and functions
// This makes them available as settle_all_lib::TypeName
pub use concurrent::{settle_all_bounded, settle_all_bounded_spawned, Settler};
pub use config::{
    load_env_config, load_env_config_from, BenchmarkConfig, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig, SourceConfig,
};
pub use error::SettleError;
pub use types::{ConcurrencyLimit, SettleConfig, Settled, WorkItem};
pub use utils::{generate_urls, has_placeholder, parse_input_lines, parse_timeout, validate_url};

// Building blocks, for callers assembling their own orchestration
pub use runner::run_task;
pub use slate::ResultSlate;
pub use source::{SharedWorkSource, WorkQueue, WorkSource};
pub use worker::{drain, WorkerReport};

#[cfg(feature = "fetch")]
pub use fetch::{extract_field, JsonFieldFetcher, DEFAULT_FIELD, DEFAULT_TIMEOUT};

// Internal modules - reached through the re-exports above
mod concurrent;
mod config;
mod error;
#[cfg(feature = "fetch")]
mod fetch;
mod runner;
mod slate;
mod source;
mod types;
mod utils;
mod worker;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SettleError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "fetch")]
    features.push("fetch");

    features
}
