use serde::{Deserialize, Serialize};

/// Canonical id reported for the device-level marker line (wire digit `1`).
pub const DEVICE_MARKER_ID: i16 = 10;

/// One decoded line of device output: which sensor fired and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i16,
    pub micros: i64,
}

impl Event {
    /// Sentinel for empty or undecodable lines; routed nowhere.
    pub const IGNORE: Event = Event { id: -1, micros: -1 };

    pub fn is_ignore(&self) -> bool {
        self.id < 0
    }

    /// Decodes one line of device output.
    ///
    /// The first byte is the event id digit. A leading `1` is the device
    /// marker: canonical id becomes [`DEVICE_MARKER_ID`] and the timestamp
    /// field starts at offset 2; otherwise the id is the leading digit and
    /// the timestamp starts at offset 1. Never panics; anything that does
    /// not fit the format decodes to [`Event::IGNORE`].
    pub fn from_line(line: &str) -> Event {
        let line = line.trim_end();
        let bytes = line.as_bytes();
        let first = match bytes.first() {
            Some(byte) if byte.is_ascii_digit() => byte - b'0',
            _ => return Event::IGNORE,
        };
        let (id, time_offset) = if first == 1 {
            (DEVICE_MARKER_ID, 2)
        } else {
            (i16::from(first), 1)
        };
        if bytes.len() <= time_offset || !line.is_char_boundary(time_offset) {
            return Event::IGNORE;
        }
        match line[time_offset..].parse::<i64>() {
            Ok(micros) if micros >= 0 => Event { id, micros },
            _ => Event::IGNORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_digit_lines_decode_to_pin_ids() {
        assert_eq!(Event::from_line("612345"), Event { id: 6, micros: 12345 });
        assert_eq!(Event::from_line("70"), Event { id: 7, micros: 0 });
    }

    #[test]
    fn leading_one_remaps_to_device_marker() {
        let event = Event::from_line("19123456");
        assert_eq!(event.id, DEVICE_MARKER_ID);
        assert_eq!(event.micros, 123456);
    }

    #[test]
    fn trailing_whitespace_is_stripped() {
        assert_eq!(Event::from_line("612345\r\n"), Event { id: 6, micros: 12345 });
    }

    #[test]
    fn empty_line_is_the_ignore_sentinel() {
        assert_eq!(Event::from_line(""), Event::IGNORE);
        assert!(Event::from_line("").is_ignore());
    }

    #[test]
    fn malformed_lines_never_panic() {
        assert_eq!(Event::from_line("x12345"), Event::IGNORE);
        assert_eq!(Event::from_line("6"), Event::IGNORE);
        assert_eq!(Event::from_line("1"), Event::IGNORE);
        assert_eq!(Event::from_line("19"), Event::IGNORE);
        assert_eq!(Event::from_line("6abc"), Event::IGNORE);
        assert_eq!(Event::from_line("\n"), Event::IGNORE);
    }
}
