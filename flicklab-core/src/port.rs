//! Boundary traits for the exclusively-owned device connection.
//!
//! The controller task owns the command side, the reader task owns the
//! event side; nothing else touches the wire.

use std::collections::VecDeque;
use std::io;

use crate::command::Command;

/// Write half: fire-and-forget command frames, no acknowledgment.
pub trait CommandPort {
    fn send(&mut self, command: Command) -> io::Result<()>;
}

/// Read half: one line of device output per call.
///
/// `Ok(None)` means nothing arrived this tick and the caller should just
/// loop; an `Err` means the connection itself is gone.
pub trait EventSource {
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Captures encoded frames instead of writing to hardware.
#[derive(Debug, Default)]
pub struct MemoryPort {
    pub frames: Vec<Vec<u8>>,
}

impl MemoryPort {
    pub fn new() -> MemoryPort {
        MemoryPort::default()
    }
}

impl CommandPort for MemoryPort {
    fn send(&mut self, command: Command) -> io::Result<()> {
        self.frames.push(command.encode());
        Ok(())
    }
}

/// Replays canned device lines, then reports the connection closed.
#[derive(Debug)]
pub struct ScriptedSource {
    lines: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new<I, S>(lines: I) -> ScriptedSource
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedSource { lines: lines.into_iter().map(Into::into).collect() }
    }
}

impl EventSource for ScriptedSource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted")),
        }
    }
}
