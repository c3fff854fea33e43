//! Execution Relay Agent
//!
//! Reads command frames from a controller, forwards each one to an
//! [`ExecutionEngine`], and writes the engine's outcome back as a response
//! frame. One [`Forwarder`] serves one session: it keeps relaying until the
//! engine terminates, an unclassified failure occurs, or the channel fails.
//!
//! This crate can be used in two modes:
//! - **Embedded**: wrap a real engine and hand the forwarder a channel
//! - **Scripted**: drive a [`ScriptedEngine`] in tests and local sessions

pub mod dispatcher;
pub mod encoder;
pub mod engine;
pub mod forwarder;
pub mod scripted;

pub use dispatcher::{dispatch, Outcome, Reply};
pub use encoder::response_for;
pub use engine::{EngineError, ExecutionEngine};
pub use forwarder::{Forwarder, RelayState, TerminationCause};
pub use scripted::{Script, ScriptedEngine};
