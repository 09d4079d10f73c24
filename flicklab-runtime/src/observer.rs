use std::time::Duration;

use crate::mailbox::{Mailbox, Payload, SessionMarker};
use crate::post::StopToken;

const POLL: Duration = Duration::from_millis(100);

/// Waits for a session marker, then stops every task.
///
/// Returns the marker that ended the session; a stop that arrives through
/// the token itself (without a marker) reads as an abort.
pub fn run_observer<M: Mailbox>(mailbox: &M, stop: &StopToken) -> SessionMarker {
    loop {
        if let Some(envelope) = mailbox.try_receive(POLL) {
            if let Payload::Marker(marker) = envelope.payload {
                stop.stop();
                return marker;
            }
        }
        if !mailbox.working() {
            return SessionMarker::Aborted;
        }
    }
}
