//! Event protocol for the tick-synchronous neural simulation core
//!
//! This crate defines the in-process object-level protocol by which
//! simulated entities notify each other of discrete occurrences: spikes,
//! injected currents, conductance changes, rates, and periodic data-logging
//! traffic. Events carry sender/receiver identity, a strictly positive
//! transmission delay in ticks, an origination timestamp and a sub-tick
//! offset; delivery time is computed from these, never stored. The crate
//! also provides the per-channel delay accumulator entities drain once per
//! tick, and the registry that resolves entity ids at delivery time.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod event;
pub mod ids;
pub mod registry;
pub mod ring;
pub mod time;

// Re-export essential types
pub use error::{ProtocolError, Result};
pub use event::{
    DataPayload, Event, EventHandler, EventHead, EventKind, EventTag, LoggingItem,
    LoggingReply, LoggingRequest, Port, RPort, SampleRow, PORT_UNKNOWN,
};
pub use ids::EntityId;
pub use registry::EntityRegistry;
pub use ring::RingBuffer;
pub use time::Time;

/// Protocol crate version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// System-wide minimum transmission delay in ticks.
///
/// Events produced during one tick are delivered only after every entity has
/// finished that tick, which is sound exactly because no delay is ever
/// smaller than this.
pub const MIN_DELAY: u32 = 1;
