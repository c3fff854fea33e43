//! Execution engine capability interface.
//!
//! The engine is owned by the embedding process. The relay only calls into
//! it; it never manages its lifecycle beyond forwarding `stop` and `close`.

use relay_protocol::{ClassBytecodes, StackFrame, Status};
use serde_json::Value;

/// Operations the relay forwards commands to.
///
/// Every method takes `&self` and implementors must be `Send + Sync`:
/// [`ExecutionEngine::stop`] is called from a different thread than the one
/// blocked inside [`ExecutionEngine::invoke`], and must interrupt it.
pub trait ExecutionEngine: Send + Sync {
    /// Install new classes.
    fn load(&self, classes: &[ClassBytecodes]) -> Result<(), EngineError>;

    /// Replace the bytecode of already-installed classes.
    fn redefine(&self, classes: &[ClassBytecodes]) -> Result<(), EngineError>;

    /// Run `class_name.method_name` and return its value rendered as text.
    fn invoke(&self, class_name: &str, method_name: &str) -> Result<String, EngineError>;

    /// Return the current value of a variable rendered as text.
    fn var_value(&self, class_name: &str, var_name: &str) -> Result<String, EngineError>;

    /// Append a path to the classpath used for later loads.
    fn add_to_classpath(&self, path: &str) -> Result<(), EngineError>;

    /// Interrupt the running invocation, if any.
    fn stop(&self) -> Result<(), EngineError>;

    /// Release the engine. Later operations may fail with
    /// [`EngineError::Terminated`].
    fn close(&self) -> Result<(), EngineError>;

    /// Handle a command outside the fixed set.
    fn extension_command(&self, name: &str, arg: Value) -> Result<Value, EngineError> {
        let _ = arg;
        Err(EngineError::not_implemented(format!(
            "extension command not supported: {}",
            name
        )))
    }
}

/// Classified engine failures.
///
/// Each variant maps to exactly one response [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine is unusable; the session ends.
    #[error("engine terminated: {message}")]
    Terminated { message: String },

    #[error("not implemented: {message}")]
    NotImplemented { message: String },

    #[error("internal problem: {message}")]
    Internal { message: String },

    /// Some classes did not install; `installed` is parallel to the request.
    #[error("class install failed: {message}")]
    ClassInstall { message: String, installed: Vec<bool> },

    /// User code threw.
    #[error("{cause_class}: {message}")]
    User {
        message: String,
        cause_class: String,
        stack: Vec<StackFrame>,
    },

    /// A reference could not be resolved yet and was deferred under `id`.
    #[error("unresolved reference {id}")]
    Resolution { id: i32, stack: Vec<StackFrame> },

    #[error("execution stopped")]
    Stopped,

    /// Anything the engine could not classify. Ends the session.
    #[error("unclassified failure: {}", message.as_deref().unwrap_or("<no message>"))]
    Unclassified { message: Option<String> },
}

impl EngineError {
    pub fn terminated(message: impl Into<String>) -> Self {
        Self::Terminated {
            message: message.into(),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn user(message: impl Into<String>, cause_class: impl Into<String>, stack: Vec<StackFrame>) -> Self {
        Self::User {
            message: message.into(),
            cause_class: cause_class.into(),
            stack,
        }
    }

    pub fn unclassified(message: Option<String>) -> Self {
        Self::Unclassified { message }
    }

    /// The response status this failure is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Terminated { .. } | Self::Unclassified { .. } => Status::Terminated,
            Self::NotImplemented { .. } => Status::NotImplemented,
            Self::Internal { .. } => Status::InternalProblem,
            Self::ClassInstall { .. } => Status::ClassInstallException,
            Self::User { .. } => Status::UserException,
            Self::Resolution { .. } => Status::Corralled,
            Self::Stopped => Status::Stopped,
        }
    }
}
