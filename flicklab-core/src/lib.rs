pub mod command;
pub mod event;
pub mod port;
pub mod trial;

pub use command::{hz_tenths, Command, DEFAULT_PULSE_MS};
pub use event::{Event, DEVICE_MARKER_ID};
pub use port::{CommandPort, EventSource, MemoryPort, ScriptedSource};
pub use trial::{Modality, TrialOutcome, TrialRecord};
