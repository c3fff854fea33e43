//! Command dispatcher.
//!
//! Maps a decoded command to exactly one engine operation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use relay_protocol::{CodecError, Command};
use serde_json::Value;

use crate::engine::{EngineError, ExecutionEngine};

/// Successful result of one dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Success with no payload.
    Empty,
    Text(String),
    Opaque(Value),
    /// No response frame is written at all.
    Silent,
}

/// Result of one dispatched command.
pub type Outcome = Result<Reply, EngineError>;

/// Invoke the engine operation `command` names.
///
/// A panic inside the engine is reported as
/// [`EngineError::Unclassified`] carrying the panic message.
pub fn dispatch<E: ExecutionEngine + ?Sized>(engine: &E, command: Command) -> Outcome {
    match command {
        Command::Load(classes) => guarded(|| engine.load(&classes)).map(|()| Reply::Empty),
        Command::Redefine(classes) => guarded(|| engine.redefine(&classes)).map(|()| Reply::Empty),
        Command::Invoke {
            class_name,
            method_name,
        } => guarded(|| engine.invoke(&class_name, &method_name)).map(Reply::Text),
        Command::VarValue {
            class_name,
            var_name,
        } => guarded(|| engine.var_value(&class_name, &var_name)).map(Reply::Text),
        Command::AddToClasspath { path } => {
            guarded(|| engine.add_to_classpath(&path)).map(|()| Reply::Empty)
        }
        Command::Stop => {
            // The controller does not wait for a reply to stop; there is
            // nothing it could do with a failure here.
            discard(|| engine.stop());
            Ok(Reply::Silent)
        }
        Command::Close => {
            // Same for close: a failure must not mask the shutdown request.
            discard(|| engine.close());
            Ok(Reply::Silent)
        }
        Command::Extension { name, arg } => {
            guarded(|| engine.extension_command(&name, arg)).map(Reply::Opaque)
        }
    }
}

/// Classify a decode failure that is not a channel failure.
///
/// A bad prefix means the stream is no longer in sync: the engine side is
/// reported as terminated. Anything else is unclassified.
pub fn decode_failure(error: CodecError) -> EngineError {
    match error {
        CodecError::InvalidPrefix(_) => EngineError::terminated(error.to_string()),
        other => EngineError::unclassified(Some(other.to_string())),
    }
}

fn guarded<T>(call: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(EngineError::unclassified(panic_message(payload.as_ref()))))
}

fn discard<T>(call: impl FnOnce() -> Result<T, EngineError>) {
    let _ = guarded(call);
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        Some((*message).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}
