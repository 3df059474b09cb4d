//! The synchronization engine: controllers binding sources to destinations,
//! and the orchestrator that fans them out.

pub mod controller;
mod error;
pub mod orchestrator;
pub mod ready;

pub use controller::Controller;
pub use error::AgentError;
pub use orchestrator::{apply_all, init_tracing, monitor_all, ApplyOutcome};
