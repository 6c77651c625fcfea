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

//! Press/hold disambiguation for a single trigger.
//!
//! A press arms a deadline timer. Releasing before the deadline resolves the
//! interaction as short and hands the release payload to the observer; letting
//! the deadline elapse resolves it as long without waiting for a release.
//! Layout: `classifier.rs` (state machine), `error.rs` (error type).

pub mod classifier;
pub mod error;

pub use classifier::{
    Classification, DEFAULT_LONG_PRESS, GestureClassifier, GestureObserver, GestureState,
    ReleaseOutcome,
};
pub use error::{GestureError, GestureResult};
