use flicklab_core::{Event, EventSource};

use crate::mailbox::{Address, Mailbox, Payload, SessionMarker};

/// Standing read loop: decode device lines and fan events out.
///
/// Response-class events (ids in `response_set`) go to the controller's
/// inbox; every decoded event goes to the recorder. A tick with no line is
/// not an event. Loss of the device connection is fatal to the session and
/// is surfaced to the observer, never retried.
pub fn run_router<M, S>(mailbox: &M, source: &mut S, response_set: &[i16])
where
    M: Mailbox,
    S: EventSource,
{
    while mailbox.working() {
        let line = match source.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(err) => {
                tracing::error!(error = %err, "device connection lost");
                mailbox.send(Address::Observer, Payload::Marker(SessionMarker::Aborted));
                break;
            }
        };
        let event = Event::from_line(&line);
        if event.is_ignore() {
            continue;
        }
        if response_set.contains(&event.id) {
            mailbox.send(Address::Controller, Payload::Response(event.id));
        }
        mailbox.send(Address::Recorder, Payload::Record(event));
    }
}
