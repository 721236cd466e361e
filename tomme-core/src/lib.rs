//! Core types and service wiring for the tomme waste pickup display.

/// Domain models shared by providers and the display service.
pub mod model;
/// Traits describing the collaborator interfaces.
pub mod ports;
/// Orchestrator that runs one fetch/compare/display cycle.
pub mod service;
/// Persistent key/value snapshot store with change detection.
pub mod state;

pub use model::*;
pub use ports::*;
pub use service::*;
pub use state::*;
