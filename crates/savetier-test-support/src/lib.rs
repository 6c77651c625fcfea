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

//! Shared test doubles used across integration suites.
//! Layout: environment.rs (scriptable capability fake), observer.rs (gesture recorder).

pub mod environment;
pub mod observer;

pub use environment::{Call, FakeEnvironment, Failures};
pub use observer::{RecordingObserver, Resolution};
