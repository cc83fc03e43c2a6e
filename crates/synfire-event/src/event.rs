//! Typed, delay-annotated events exchanged between entities
//!
//! An event is a value: administrative header plus a kind-specific payload.
//! Constructing or cloning an event never causes delivery; [`Event::deliver`]
//! is the single side-effecting operation, dispatching on the kind tag to the
//! matching [`EventHandler`] method of the resolved receiver.

use core::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{ProtocolError, Result};
use crate::ids::EntityId;
use crate::time::Time;

/// Sender-side channel number. Negative means unknown.
pub type Port = i32;

/// Receiver-side channel number (r-port). Zero means unused/default.
pub type RPort = u32;

/// Port value for "no port assigned"
pub const PORT_UNKNOWN: Port = -1;

/// One row of logged samples: the values of the requested quantities at a
/// single recording timestamp.
pub type SampleRow = SmallVec<[f64; 8]>;

/// Administrative header shared by all event kinds.
///
/// Sender and receiver are opaque ids resolved through the
/// [`EntityRegistry`](crate::EntityRegistry) at delivery time. The delivery
/// step is computed, never stored: `stamp + delay - 1` relative to a
/// reference step (see [`Event::rel_delivery_steps`]).
#[derive(Debug, Clone, PartialEq)]
pub struct EventHead {
    /// Sending entity, unresolved until addressed
    pub sender: EntityId,
    /// Receiving entity, unresolved until addressed
    pub receiver: EntityId,
    /// Sender-side channel the event left on
    pub port: Port,
    /// Receiver-side channel the event targets
    pub rport: RPort,
    /// Transmission delay in ticks; a valid event has delay >= 1
    pub delay: u32,
    /// Origination timestamp
    pub stamp: Time,
    /// Sub-tick creation offset in ms, in `[0, tick)`
    pub offset: f64,
    /// Connection weight applied at the receiver
    pub weight: f64,
}

impl EventHead {
    /// Delivery step relative to a reference step: `stamp + delay - 1 - reference`.
    ///
    /// Causality requires the result to be non-negative for any event routed
    /// to an entity that has not yet passed the delivery step.
    pub fn rel_delivery_steps(&self, reference: Time) -> i64 {
        self.stamp.steps() + i64::from(self.delay) - 1 - reference.steps()
    }
}

impl Default for EventHead {
    fn default() -> Self {
        Self {
            sender: EntityId::INVALID,
            receiver: EntityId::INVALID,
            port: PORT_UNKNOWN,
            rport: 0,
            delay: 0,
            stamp: Time::ZERO,
            offset: 0.0,
            weight: 1.0,
        }
    }
}

/// Discriminator for the closed set of event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// Spike notification
    Spike,
    /// Injected current
    Current,
    /// Conductance change
    Conductance,
    /// Firing-rate value
    Rate,
    /// Periodic data request from a recording device
    LoggingRequest,
    /// Batch of recorded samples sent back to a recording device
    LoggingReply,
    /// Generic shared data
    Data,
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventTag::Spike => "spike",
            EventTag::Current => "current",
            EventTag::Conductance => "conductance",
            EventTag::Rate => "rate",
            EventTag::LoggingRequest => "logging-request",
            EventTag::LoggingReply => "logging-reply",
            EventTag::Data => "data",
        };
        f.write_str(name)
    }
}

/// Payload of a periodic data request.
///
/// Connection-probe requests carry neither interval nor quantity list; the
/// accessors treat reading them from a probe as a programming error.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingRequest {
    interval: Option<u32>,
    record_from: Option<Arc<[String]>>,
}

impl LoggingRequest {
    /// Create a request for the given recording interval (ticks) and
    /// quantity names
    pub fn new(interval: u32, record_from: Vec<String>) -> Self {
        Self {
            interval: Some(interval),
            record_from: Some(record_from.into()),
        }
    }

    /// Create an empty request for connection setup
    pub fn probe() -> Self {
        Self {
            interval: None,
            record_from: None,
        }
    }

    /// Whether this request was built for connection setup only
    pub fn is_probe(&self) -> bool {
        self.interval.is_none()
    }

    /// Recording interval in ticks.
    ///
    /// # Panics
    /// Panics if called on a connection-probe request.
    pub fn recording_interval(&self) -> u32 {
        match self.interval {
            Some(interval) => interval,
            None => panic!("recording interval read from a connection-probe logging request"),
        }
    }

    /// Names of the quantities to record.
    ///
    /// # Panics
    /// Panics if called on a connection-probe request.
    pub fn record_from(&self) -> &[String] {
        match &self.record_from {
            Some(names) => names,
            None => panic!("quantity list read from a connection-probe logging request"),
        }
    }
}

/// One recorded sample row with its timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingItem {
    /// Tick the row was sampled at
    pub timestamp: Time,
    /// Values of the requested quantities, in request order
    pub data: SampleRow,
}

/// Payload of a logging reply: the batch of samples collected since the
/// previous request.
///
/// Deliberately not `Clone`: the batch is prepared for exactly one reply,
/// sent on the tick the request arrives, and ownership moves with it.
#[derive(Debug, PartialEq)]
pub struct LoggingReply {
    items: Vec<LoggingItem>,
}

impl LoggingReply {
    /// Wrap a batch of sample rows
    pub fn new(items: Vec<LoggingItem>) -> Self {
        Self { items }
    }

    /// Borrow the batch
    pub fn items(&self) -> &[LoggingItem] {
        &self.items
    }

    /// Take ownership of the batch
    pub fn into_items(self) -> Vec<LoggingItem> {
        self.items
    }
}

/// Generic shared data payload
#[derive(Debug, Clone)]
pub struct DataPayload(Arc<[f64]>);

impl DataPayload {
    /// Share the given values
    pub fn new(values: Vec<f64>) -> Self {
        Self(values.into())
    }

    /// Access the shared values
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl PartialEq for DataPayload {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

/// Kind-specific payload of an event
#[derive(Debug, PartialEq)]
pub enum EventKind {
    /// Spike notification; multiplicity counts coincident spikes
    Spike {
        /// Number of coincident spikes carried by this event
        multiplicity: u32,
    },
    /// Injected current amplitude (pA-scale units, weighted at the receiver)
    Current {
        /// Current amplitude
        amplitude: f64,
    },
    /// Conductance value
    Conductance {
        /// Conductance
        conductance: f64,
    },
    /// Firing-rate value
    Rate {
        /// Rate
        rate: f64,
    },
    /// Periodic data request
    LoggingRequest(LoggingRequest),
    /// Batch of recorded samples (not cloneable)
    LoggingReply(LoggingReply),
    /// Generic shared data
    Data(DataPayload),
}

impl EventKind {
    /// Kind discriminator
    pub fn tag(&self) -> EventTag {
        match self {
            EventKind::Spike { .. } => EventTag::Spike,
            EventKind::Current { .. } => EventTag::Current,
            EventKind::Conductance { .. } => EventTag::Conductance,
            EventKind::Rate { .. } => EventTag::Rate,
            EventKind::LoggingRequest(_) => EventTag::LoggingRequest,
            EventKind::LoggingReply(_) => EventTag::LoggingReply,
            EventKind::Data(_) => EventTag::Data,
        }
    }
}

/// A typed, delay-annotated notification between entities
#[derive(Debug, PartialEq)]
pub struct Event {
    head: EventHead,
    kind: EventKind,
}

impl Event {
    /// Create an unaddressed event of the given kind
    pub fn new(kind: EventKind) -> Self {
        Self {
            head: EventHead::default(),
            kind,
        }
    }

    /// Create a spike event
    pub fn spike(multiplicity: u32) -> Self {
        Self::new(EventKind::Spike { multiplicity })
    }

    /// Create a current-injection event
    pub fn current(amplitude: f64) -> Self {
        Self::new(EventKind::Current { amplitude })
    }

    /// Create a conductance event
    pub fn conductance(conductance: f64) -> Self {
        Self::new(EventKind::Conductance { conductance })
    }

    /// Create a rate event
    pub fn rate(rate: f64) -> Self {
        Self::new(EventKind::Rate { rate })
    }

    /// Create a data-logging request event
    pub fn logging_request(request: LoggingRequest) -> Self {
        Self::new(EventKind::LoggingRequest(request))
    }

    /// Create a data-logging reply event
    pub fn logging_reply(reply: LoggingReply) -> Self {
        Self::new(EventKind::LoggingReply(reply))
    }

    /// Create a generic data event
    pub fn data(payload: DataPayload) -> Self {
        Self::new(EventKind::Data(payload))
    }

    /// Sending entity
    pub fn sender(&self) -> EntityId {
        self.head.sender
    }

    /// Set the sending entity
    pub fn set_sender(&mut self, sender: EntityId) {
        self.head.sender = sender;
    }

    /// Receiving entity
    pub fn receiver(&self) -> EntityId {
        self.head.receiver
    }

    /// Set the receiving entity
    pub fn set_receiver(&mut self, receiver: EntityId) {
        self.head.receiver = receiver;
    }

    /// Sender-side port, negative if unknown
    pub fn port(&self) -> Port {
        self.head.port
    }

    /// Set the sender-side port
    pub fn set_port(&mut self, port: Port) {
        self.head.port = port;
    }

    /// Receiver-side port, 0 if unused
    pub fn rport(&self) -> RPort {
        self.head.rport
    }

    /// Set the receiver-side port
    pub fn set_rport(&mut self, rport: RPort) {
        self.head.rport = rport;
    }

    /// Transmission delay in ticks
    pub fn delay(&self) -> u32 {
        self.head.delay
    }

    /// Set the transmission delay in ticks (valid events require >= 1)
    pub fn set_delay(&mut self, delay: u32) {
        self.head.delay = delay;
    }

    /// Origination timestamp
    pub fn stamp(&self) -> Time {
        self.head.stamp
    }

    /// Set the origination timestamp
    pub fn set_stamp(&mut self, stamp: Time) {
        self.head.stamp = stamp;
    }

    /// Sub-tick creation offset in ms
    pub fn offset(&self) -> f64 {
        self.head.offset
    }

    /// Set the sub-tick creation offset in ms; must lie in `[0, tick)`
    pub fn set_offset(&mut self, offset: f64) {
        self.head.offset = offset;
    }

    /// Connection weight
    pub fn weight(&self) -> f64 {
        self.head.weight
    }

    /// Set the connection weight
    pub fn set_weight(&mut self, weight: f64) {
        self.head.weight = weight;
    }

    /// Set the sender and return self
    pub fn with_sender(mut self, sender: EntityId) -> Self {
        self.head.sender = sender;
        self
    }

    /// Set the receiver and return self
    pub fn with_receiver(mut self, receiver: EntityId) -> Self {
        self.head.receiver = receiver;
        self
    }

    /// Set the delay and return self
    pub fn with_delay(mut self, delay: u32) -> Self {
        self.head.delay = delay;
        self
    }

    /// Set the stamp and return self
    pub fn with_stamp(mut self, stamp: Time) -> Self {
        self.head.stamp = stamp;
        self
    }

    /// Set the r-port and return self
    pub fn with_rport(mut self, rport: RPort) -> Self {
        self.head.rport = rport;
        self
    }

    /// Set the weight and return self
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.head.weight = weight;
        self
    }

    /// Borrow the header
    pub fn head(&self) -> &EventHead {
        &self.head
    }

    /// Borrow the payload
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Take ownership of the payload
    pub fn into_kind(self) -> EventKind {
        self.kind
    }

    /// Kind discriminator
    pub fn tag(&self) -> EventTag {
        self.kind.tag()
    }

    /// Check integrity: sender and receiver resolved, delay positive
    pub fn is_valid(&self) -> bool {
        self.head.sender.is_valid() && self.head.receiver.is_valid() && self.head.delay > 0
    }

    /// Delivery step relative to a reference step; see
    /// [`EventHead::rel_delivery_steps`]
    pub fn rel_delivery_steps(&self, reference: Time) -> i64 {
        self.head.rel_delivery_steps(reference)
    }

    /// Produce a value-identical, independently owned copy.
    ///
    /// Fails for logging replies, whose sample batch must travel exactly once.
    pub fn try_clone(&self) -> Result<Event> {
        let kind = match &self.kind {
            EventKind::Spike { multiplicity } => EventKind::Spike {
                multiplicity: *multiplicity,
            },
            EventKind::Current { amplitude } => EventKind::Current {
                amplitude: *amplitude,
            },
            EventKind::Conductance { conductance } => EventKind::Conductance {
                conductance: *conductance,
            },
            EventKind::Rate { rate } => EventKind::Rate { rate: *rate },
            EventKind::LoggingRequest(request) => EventKind::LoggingRequest(request.clone()),
            EventKind::LoggingReply(_) => {
                return Err(ProtocolError::NotCloneable {
                    kind: EventTag::LoggingReply,
                })
            }
            EventKind::Data(payload) => EventKind::Data(payload.clone()),
        };
        Ok(Event {
            head: self.head.clone(),
            kind,
        })
    }

    /// Deliver this event to its receiver.
    ///
    /// Validates the event, then dispatches on the kind tag to the matching
    /// handler method. Returns an immediate reply event if the kind warrants
    /// one (logging replies travel on the tick the request arrives).
    pub fn deliver(self, target: &mut dyn EventHandler) -> Result<Option<Event>> {
        if !self.is_valid() {
            return Err(ProtocolError::invalid_event(format!(
                "sender={} receiver={} delay={}",
                self.head.sender, self.head.receiver, self.head.delay
            )));
        }
        let Event { head, kind } = self;
        match kind {
            EventKind::Spike { multiplicity } => {
                target.handle_spike(&head, multiplicity).map(|_| None)
            }
            EventKind::Current { amplitude } => {
                target.handle_current(&head, amplitude).map(|_| None)
            }
            EventKind::Conductance { conductance } => {
                target.handle_conductance(&head, conductance).map(|_| None)
            }
            EventKind::Rate { rate } => target.handle_rate(&head, rate).map(|_| None),
            EventKind::LoggingRequest(request) => {
                target.handle_logging_request(&head, &request).map(Some)
            }
            EventKind::LoggingReply(reply) => {
                target.handle_logging_reply(&head, reply).map(|_| None)
            }
            EventKind::Data(payload) => target.handle_data(&head, payload).map(|_| None),
        }
    }
}

/// Delivery and connection-setup surface of a simulation entity.
///
/// Kind-specific handlers default to rejecting the event; entities override
/// exactly the kinds they receive. [`EventHandler::accepts`] is the
/// connection-setup half of the contract: it validates a (kind, r-port) pair
/// before any event of that shape may ever be routed to the entity, so
/// delivery itself never re-validates ports.
pub trait EventHandler {
    /// Identity of this entity as known to the registry
    fn id(&self) -> EntityId;

    /// Validate a requested (kind, r-port) connection; returns the resolved
    /// r-port to embed in future events of this connection
    fn accepts(&mut self, kind: EventTag, rport: RPort) -> Result<RPort> {
        let _ = rport;
        Err(ProtocolError::unsupported(kind, self.id()))
    }

    /// Handle a spike event
    fn handle_spike(&mut self, head: &EventHead, multiplicity: u32) -> Result<()> {
        let _ = (head, multiplicity);
        Err(ProtocolError::unsupported(EventTag::Spike, self.id()))
    }

    /// Handle a current-injection event
    fn handle_current(&mut self, head: &EventHead, amplitude: f64) -> Result<()> {
        let _ = (head, amplitude);
        Err(ProtocolError::unsupported(EventTag::Current, self.id()))
    }

    /// Handle a conductance event
    fn handle_conductance(&mut self, head: &EventHead, conductance: f64) -> Result<()> {
        let _ = (head, conductance);
        Err(ProtocolError::unsupported(EventTag::Conductance, self.id()))
    }

    /// Handle a rate event
    fn handle_rate(&mut self, head: &EventHead, rate: f64) -> Result<()> {
        let _ = (head, rate);
        Err(ProtocolError::unsupported(EventTag::Rate, self.id()))
    }

    /// Handle a data-logging request; must produce the reply event
    fn handle_logging_request(&mut self, head: &EventHead, request: &LoggingRequest) -> Result<Event> {
        let _ = (head, request);
        Err(ProtocolError::unsupported(EventTag::LoggingRequest, self.id()))
    }

    /// Handle a data-logging reply
    fn handle_logging_reply(&mut self, head: &EventHead, reply: LoggingReply) -> Result<()> {
        let _ = (head, reply);
        Err(ProtocolError::unsupported(EventTag::LoggingReply, self.id()))
    }

    /// Handle a generic data event
    fn handle_data(&mut self, head: &EventHead, payload: DataPayload) -> Result<()> {
        let _ = (head, payload);
        Err(ProtocolError::unsupported(EventTag::Data, self.id()))
    }
}

impl<T: EventHandler + ?Sized> EventHandler for Box<T> {
    fn id(&self) -> EntityId {
        (**self).id()
    }

    fn accepts(&mut self, kind: EventTag, rport: RPort) -> Result<RPort> {
        (**self).accepts(kind, rport)
    }

    fn handle_spike(&mut self, head: &EventHead, multiplicity: u32) -> Result<()> {
        (**self).handle_spike(head, multiplicity)
    }

    fn handle_current(&mut self, head: &EventHead, amplitude: f64) -> Result<()> {
        (**self).handle_current(head, amplitude)
    }

    fn handle_conductance(&mut self, head: &EventHead, conductance: f64) -> Result<()> {
        (**self).handle_conductance(head, conductance)
    }

    fn handle_rate(&mut self, head: &EventHead, rate: f64) -> Result<()> {
        (**self).handle_rate(head, rate)
    }

    fn handle_logging_request(&mut self, head: &EventHead, request: &LoggingRequest) -> Result<Event> {
        (**self).handle_logging_request(head, request)
    }

    fn handle_logging_reply(&mut self, head: &EventHead, reply: LoggingReply) -> Result<()> {
        (**self).handle_logging_reply(head, reply)
    }

    fn handle_data(&mut self, head: &EventHead, payload: DataPayload) -> Result<()> {
        (**self).handle_data(head, payload)
    }
}
