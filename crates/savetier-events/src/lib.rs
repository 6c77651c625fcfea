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

//! Core event bus for savetier.
//!
//! The bus carries a typed event enum with sequential identifiers and keeps a
//! bounded replay ring so late subscribers can catch up from a known id.
//! Layout: `payloads.rs` (event types), `routing.rs` (`EventBus`).

pub mod payloads;
pub mod routing;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId, TierStatus};
pub use routing::{EventBus, EventStream, StreamItem};
