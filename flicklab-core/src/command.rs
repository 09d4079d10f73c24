//! Wire encoding for the stimulus controller.
//!
//! Every frame is an opcode byte followed by fixed-width big-endian
//! operands. Operand ranges (pin indices, durations) are a caller
//! precondition; encoding itself cannot fail.

const OP_FLICK_FOR: u8 = 0x13;
const OP_FLICK_ON: u8 = 0x14;
const OP_FLICK_FOR_PAIR: u8 = 0x15;
const OP_FLICK_ON_PAIR: u8 = 0x16;
const OP_HIGH_FOR: u8 = 0x17;
const OP_FLICK_OFF: u8 = 0x18;

/// Pulse width used by the controller sketch unless a trial overrides it.
pub const DEFAULT_PULSE_MS: u16 = 20;

/// Quantizes a flicker frequency to the single wire byte (tenths of Hz).
///
/// One byte covers 0–25.5 Hz; precision below 0.1 Hz is lost.
pub fn hz_tenths(hz: f32) -> u8 {
    (hz * 10.0).round() as u8
}

/// One hardware command, one frame on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Flicker `pin` at the quantized frequency for `duration_ms`, then stop.
    FlickFor { pin: u8, hz_tenths: u8, duration_ms: u16, pulse_ms: u16 },
    /// Flicker `pin` until an explicit [`Command::FlickOff`].
    FlickOn { pin: u8, hz_tenths: u8, duration_ms: u16, pulse_ms: u16 },
    /// Flicker two pins simultaneously for `duration_ms`.
    FlickForPair {
        pins: (u8, u8),
        hz_tenths: (u8, u8),
        duration_ms: u16,
        pulse_ms: u16,
    },
    /// Flicker two pins until an explicit [`Command::FlickOff`].
    FlickOnPair {
        pins: (u8, u8),
        hz_tenths: (u8, u8),
        duration_ms: u16,
        pulse_ms: u16,
    },
    /// Drive `pin` high for `duration_ms` (reward pulse).
    HighFor { pin: u8, duration_ms: u16 },
    /// Halt any indefinite flicker immediately.
    FlickOff,
}

impl Command {
    pub fn flick_for(pin: u8, hz: f32, duration_ms: u16, pulse_ms: u16) -> Command {
        Command::FlickFor { pin, hz_tenths: hz_tenths(hz), duration_ms, pulse_ms }
    }

    pub fn flick_on(pin: u8, hz: f32, duration_ms: u16, pulse_ms: u16) -> Command {
        Command::FlickOn { pin, hz_tenths: hz_tenths(hz), duration_ms, pulse_ms }
    }

    pub fn flick_for_pair(
        pins: (u8, u8),
        hz: (f32, f32),
        duration_ms: u16,
        pulse_ms: u16,
    ) -> Command {
        Command::FlickForPair {
            pins,
            hz_tenths: (hz_tenths(hz.0), hz_tenths(hz.1)),
            duration_ms,
            pulse_ms,
        }
    }

    pub fn flick_on_pair(
        pins: (u8, u8),
        hz: (f32, f32),
        duration_ms: u16,
        pulse_ms: u16,
    ) -> Command {
        Command::FlickOnPair {
            pins,
            hz_tenths: (hz_tenths(hz.0), hz_tenths(hz.1)),
            duration_ms,
            pulse_ms,
        }
    }

    pub fn high_for(pin: u8, duration_ms: u16) -> Command {
        Command::HighFor { pin, duration_ms }
    }

    /// Serializes the command into its wire frame.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::FlickFor { pin, hz_tenths, duration_ms, pulse_ms } => {
                single_flicker(OP_FLICK_FOR, pin, hz_tenths, duration_ms, pulse_ms)
            }
            Command::FlickOn { pin, hz_tenths, duration_ms, pulse_ms } => {
                single_flicker(OP_FLICK_ON, pin, hz_tenths, duration_ms, pulse_ms)
            }
            Command::FlickForPair { pins, hz_tenths, duration_ms, pulse_ms } => {
                pair_flicker(OP_FLICK_FOR_PAIR, pins, hz_tenths, duration_ms, pulse_ms)
            }
            Command::FlickOnPair { pins, hz_tenths, duration_ms, pulse_ms } => {
                pair_flicker(OP_FLICK_ON_PAIR, pins, hz_tenths, duration_ms, pulse_ms)
            }
            Command::HighFor { pin, duration_ms } => {
                let mut frame = vec![OP_HIGH_FOR, pin];
                frame.extend_from_slice(&duration_ms.to_be_bytes());
                frame
            }
            Command::FlickOff => vec![OP_FLICK_OFF],
        }
    }

    /// Reconstructs a command from one wire frame.
    ///
    /// Returns `None` on an unknown opcode or a frame of the wrong length.
    pub fn decode(frame: &[u8]) -> Option<Command> {
        match (frame.first()?, frame.len()) {
            (&OP_FLICK_FOR, 7) => Some(Command::FlickFor {
                pin: frame[1],
                hz_tenths: frame[2],
                duration_ms: be_u16(&frame[3..5]),
                pulse_ms: be_u16(&frame[5..7]),
            }),
            (&OP_FLICK_ON, 7) => Some(Command::FlickOn {
                pin: frame[1],
                hz_tenths: frame[2],
                duration_ms: be_u16(&frame[3..5]),
                pulse_ms: be_u16(&frame[5..7]),
            }),
            (&OP_FLICK_FOR_PAIR, 9) => Some(Command::FlickForPair {
                pins: (frame[1], frame[2]),
                hz_tenths: (frame[3], frame[4]),
                duration_ms: be_u16(&frame[5..7]),
                pulse_ms: be_u16(&frame[7..9]),
            }),
            (&OP_FLICK_ON_PAIR, 9) => Some(Command::FlickOnPair {
                pins: (frame[1], frame[2]),
                hz_tenths: (frame[3], frame[4]),
                duration_ms: be_u16(&frame[5..7]),
                pulse_ms: be_u16(&frame[7..9]),
            }),
            (&OP_HIGH_FOR, 4) => Some(Command::HighFor {
                pin: frame[1],
                duration_ms: be_u16(&frame[2..4]),
            }),
            (&OP_FLICK_OFF, 1) => Some(Command::FlickOff),
            _ => None,
        }
    }
}

fn single_flicker(opcode: u8, pin: u8, hz: u8, duration_ms: u16, pulse_ms: u16) -> Vec<u8> {
    let mut frame = vec![opcode, pin, hz];
    frame.extend_from_slice(&duration_ms.to_be_bytes());
    frame.extend_from_slice(&pulse_ms.to_be_bytes());
    frame
}

fn pair_flicker(
    opcode: u8,
    pins: (u8, u8),
    hz: (u8, u8),
    duration_ms: u16,
    pulse_ms: u16,
) -> Vec<u8> {
    let mut frame = vec![opcode, pins.0, pins.1, hz.0, hz.1];
    frame.extend_from_slice(&duration_ms.to_be_bytes());
    frame.extend_from_slice(&pulse_ms.to_be_bytes());
    frame
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_quantizes_to_tenths() {
        assert_eq!(hz_tenths(6.5), 65);
        assert_eq!(hz_tenths(2.0), 20);
        assert_eq!(hz_tenths(25.5), 255);
        assert_eq!(hz_tenths(0.04), 0);
    }

    #[test]
    fn flick_for_frame_layout() {
        let frame = Command::flick_for(3, 6.5, 2000, 20).encode();
        assert_eq!(frame, vec![0x13, 3, 65, 0x07, 0xD0, 0x00, 0x14]);
    }

    #[test]
    fn pair_frame_layout() {
        let frame = Command::flick_on_pair((3, 2), (2.0, 20.0), 60000, 20).encode();
        assert_eq!(frame, vec![0x16, 3, 2, 20, 200, 0xEA, 0x60, 0x00, 0x14]);
    }

    #[test]
    fn reward_pulse_frame_layout() {
        let frame = Command::high_for(4, 20).encode();
        assert_eq!(frame, vec![0x17, 4, 0x00, 0x14]);
    }

    #[test]
    fn stop_is_a_single_byte() {
        assert_eq!(Command::FlickOff.encode(), vec![0x18]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let commands = [
            Command::flick_for(3, 6.5, 2000, 20),
            Command::flick_on(5, 10.0, 60000, 20),
            Command::flick_for_pair((3, 2), (12.0, 12.0), 2000, 20),
            Command::flick_on_pair((3, 2), (2.0, 4.0), 60000, 20),
            Command::high_for(4, 20),
            Command::FlickOff,
        ];
        for command in commands {
            assert_eq!(Command::decode(&command.encode()), Some(command));
        }
    }

    #[test]
    fn round_trip_recovers_exact_operands() {
        let decoded = Command::decode(&Command::flick_for(3, 6.5, 2000, 20).encode());
        match decoded {
            Some(Command::FlickFor { pin, hz_tenths, duration_ms, pulse_ms }) => {
                assert_eq!(pin, 3);
                assert_eq!(hz_tenths, 65);
                assert_eq!(duration_ms, 2000);
                assert_eq!(pulse_ms, 20);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn unknown_opcode_and_short_frames_decode_to_none() {
        assert_eq!(Command::decode(&[]), None);
        assert_eq!(Command::decode(&[0x99, 1, 2]), None);
        assert_eq!(Command::decode(&[0x13, 3, 65]), None);
        assert_eq!(Command::decode(&[0x17, 4, 0]), None);
    }
}
