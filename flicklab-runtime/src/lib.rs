pub mod mailbox;
pub mod observer;
pub mod post;
pub mod recorder;
pub mod router;

pub use mailbox::{Address, Envelope, Mailbox, Payload, SessionMarker};
pub use observer::run_observer;
pub use post::{Node, Post, StopToken};
pub use recorder::run_recorder;
pub use router::run_router;
