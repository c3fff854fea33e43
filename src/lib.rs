//! Exec Relay - command relay between an execution controller and engine
//!
//! This crate ties the relay pieces together: a controller-side client, the
//! layered configuration, telemetry setup, and local agent sessions backed
//! by the scripted engine. The wire protocol lives in `relay-protocol` and
//! the relay loop in `relay-agent`.

pub mod agent;
pub mod client;
pub mod config;
pub mod telemetry;

pub use client::{RelayClient, RemoteError};
pub use config::{ConfigError, RelayConfig};
pub use relay_agent::{EngineError, ExecutionEngine, Forwarder, RelayState, ScriptedEngine, TerminationCause};
pub use relay_protocol::{Command, Response, Status};
