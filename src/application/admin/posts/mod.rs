mod commands;
mod service;
pub mod types;

pub use service::*;
pub use types::{AuthoringError, BusyFlag, Confirm, Draft, DraftFields, SubmitOutcome};
