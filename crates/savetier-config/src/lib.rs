#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Layered configuration for savetier.
//!
//! Layout: `model.rs` (typed config models), `defaults.rs` (default values),
//! `validate.rs` (validation helpers), `loader.rs` (file + environment layering).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, ConfigLoader, ENV_PREFIX};
pub use model::{LocalEnvironmentConfig, PlatformClass, SaveConfig, TelemetryConfig};
