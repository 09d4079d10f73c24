//! File-backed device endpoints.
//!
//! The rig's two boards show up as character device nodes; port discovery
//! and line configuration happen outside this process. Commands are
//! fire-and-forget writes, events are newline-delimited reads polled
//! without blocking so the read loop stays responsive to cancellation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use flicklab_core::{Command, CommandPort, EventSource};

const READ_POLL: Duration = Duration::from_millis(20);

/// Command side of the device connection.
pub struct FilePort {
    file: File,
}

impl FilePort {
    pub fn open(path: &Path) -> io::Result<FilePort> {
        let file = OpenOptions::new().write(true).open(path)?;
        Ok(FilePort { file })
    }
}

impl CommandPort for FilePort {
    fn send(&mut self, command: Command) -> io::Result<()> {
        self.file.write_all(&command.encode())?;
        self.file.flush()
    }
}

/// Discards commands; pairs with [`IdleSource`] for rehearsals without
/// hardware.
#[derive(Debug, Default)]
pub struct NullPort;

impl CommandPort for NullPort {
    fn send(&mut self, _command: Command) -> io::Result<()> {
        Ok(())
    }
}

/// Non-blocking line reader over the event device node.
pub struct SerialLineSource {
    file: File,
    pending: Vec<u8>,
}

impl SerialLineSource {
    pub fn open(path: &Path) -> io::Result<SerialLineSource> {
        let file = OpenOptions::new().read(true).open(path)?;
        #[cfg(unix)]
        set_nonblocking(&file)?;
        Ok(SerialLineSource { file, pending: Vec::new() })
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|byte| *byte == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim_end().to_string())
    }
}

impl EventSource for SerialLineSource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        let mut chunk = [0u8; 256];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "device closed"))
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if chunk[..n].contains(&b'\n') {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        match self.take_line() {
            Some(line) => Ok(Some(line)),
            None => {
                thread::sleep(READ_POLL);
                Ok(None)
            }
        }
    }
}

/// Never produces events.
#[derive(Debug, Default)]
pub struct IdleSource;

impl EventSource for IdleSource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        thread::sleep(Duration::from_millis(50));
        Ok(None)
    }
}

#[cfg(unix)]
fn set_nonblocking(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
