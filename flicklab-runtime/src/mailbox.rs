use std::time::Duration;

use flicklab_core::Event;

/// Well-known task addresses within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Runs the trial logic and owns the command port.
    Controller,
    /// Owns the event source and fans decoded events out.
    Reader,
    /// Sinks every decoded event into the session log.
    Recorder,
    /// Waits for a session marker and stops everyone.
    Observer,
}

impl Address {
    pub const ALL: [Address; 4] =
        [Address::Controller, Address::Reader, Address::Recorder, Address::Observer];
}

/// Session lifecycle sentinels, distinct on purpose: the observer reports
/// which one ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMarker {
    Completed,
    Aborted,
}

/// What travels between tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// A response-class event id, routed to the decision task.
    Response(i16),
    /// A full decoded event for the session log.
    Record(Event),
    /// A lifecycle marker for the observer.
    Marker(SessionMarker),
}

/// One delivered message: who sent it and what it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub from: Address,
    pub payload: Payload,
}

/// The surface the decision-timing protocols are written against.
///
/// `try_receive` is the only suspension point the protocols use; it
/// returns early on arrival, on timeout, or once the session stops, and
/// the caller re-checks `working()` at every loop head.
pub trait Mailbox {
    fn send(&self, to: Address, payload: Payload);
    fn try_receive(&self, timeout: Duration) -> Option<Envelope>;
    fn sleep(&self, duration: Duration);
    fn working(&self) -> bool;
}
