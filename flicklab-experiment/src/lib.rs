pub mod config;
pub mod kernel;
pub mod paradigm;
pub mod trials;

pub use config::{ConfigError, SessionConfig};
pub use paradigm::{run_paradigm, Paradigm};
pub use trials::{TrialPlan, TrialRow};
