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

//! Permission-aware tiered save chain.
//!
//! A save walks four tiers in order: share a staged selection, check storage
//! permission, fall back to the default directory, write the requested path.
//! Layout: `model.rs` (requests and outcomes), `capability.rs` (environment
//! traits), `path.rs` (logical path rules), `writer.rs` (the chain),
//! `local.rs` (filesystem adapters), `error.rs` (error type).

pub mod capability;
pub mod error;
pub mod local;
pub mod model;
pub mod path;
pub mod writer;

pub use capability::{
    CapabilityProvider, IntermediateStorage, PermissionAuthority, PlatformInfo, PrimaryStorage,
    ShareCapability,
};
pub use error::{SaveError, SaveResult, render_chain};
pub use local::{LocalFs, ShareRecord};
pub use model::{
    PermissionResolution, PermissionState, PlatformClass, SaveReport, SaveRequest,
    SelectionHandle, StagedLocation, StorageArea, StorageCapabilities, Strategy, StrategyOutcome,
};
pub use writer::{PERMISSION_TIER, TieredWriter, WriterSettings};
