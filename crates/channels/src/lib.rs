//! Chat event model and source adapter interface.
//!
//! Source adapters (chatbox poller, socket listener, widget ingestion, ...)
//! discover raw platform events and hand them to an [`EventEmitter`]. The
//! pipeline crate implements the emitter and turns each [`RawEvent`] into a
//! canonical [`ChatEvent`].

pub mod adapter;
pub mod error;
pub mod event;
pub mod raw;
pub mod registry;

pub use {
    adapter::{EventEmitter, SourceAdapter},
    error::{Error, Result},
    event::{ChatEvent, EventFields, EventKind, Platform},
    raw::{Fragment, RawBody, RawEvent},
    registry::AdapterRegistry,
};
