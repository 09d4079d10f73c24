use std::io::{self, Write};
use std::time::Duration;

use crate::mailbox::{Mailbox, Payload};

const DRAIN_TICK: Duration = Duration::from_millis(100);

/// Standing sink loop: one CSV row per decoded device event.
///
/// Keeps draining after the stop flag flips so events delivered during the
/// final trial still land in the log, then flushes once.
pub fn run_recorder<M, W>(mailbox: &M, sink: &mut W) -> io::Result<()>
where
    M: Mailbox,
    W: Write,
{
    writeln!(sink, "micros,event")?;
    while mailbox.working() {
        if let Some(envelope) = mailbox.try_receive(DRAIN_TICK) {
            write_row(sink, &envelope.payload)?;
        }
    }
    while let Some(envelope) = mailbox.try_receive(Duration::ZERO) {
        write_row(sink, &envelope.payload)?;
    }
    sink.flush()
}

fn write_row<W: Write>(sink: &mut W, payload: &Payload) -> io::Result<()> {
    if let Payload::Record(event) = payload {
        writeln!(sink, "{},{}", event.micros, event.id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::Address;
    use crate::post::Post;
    use flicklab_core::Event;

    #[test]
    fn writes_one_row_per_event_and_drains_after_stop() {
        let mut post = Post::open(&Address::ALL);
        let recorder = post.node(Address::Recorder).unwrap();
        let reader = post.node(Address::Reader).unwrap();

        reader.send(Address::Recorder, Payload::Record(Event { id: 6, micros: 100 }));
        reader.send(Address::Recorder, Payload::Record(Event { id: 10, micros: 250 }));
        post.stop_token().stop();

        let mut sink = Vec::new();
        run_recorder(&recorder, &mut sink).unwrap();

        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text, "micros,event\n100,6\n250,10\n");
    }

    #[test]
    fn non_record_payloads_are_not_rows() {
        let mut post = Post::open(&Address::ALL);
        let recorder = post.node(Address::Recorder).unwrap();
        let reader = post.node(Address::Reader).unwrap();

        reader.send(Address::Recorder, Payload::Response(6));
        post.stop_token().stop();

        let mut sink = Vec::new();
        run_recorder(&recorder, &mut sink).unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "micros,event\n");
    }
}
