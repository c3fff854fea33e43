//! Controller-side relay client.
//!
//! Writes command frames to an agent and decodes its responses. Transport
//! is whatever duplex byte stream the caller hands in; the CLI uses TCP.

use std::io::{Read, Write};

use relay_protocol::{
    ClassBytecodes, CodecError, Command, FrameReader, FrameWriter, Response, StackFrame,
    SuccessPayload,
};
use serde_json::Value;

/// Failures reported by the agent, or by the channel to it.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("agent terminated: {0}")]
    Terminated(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("internal problem: {0}")]
    Internal(String),

    #[error("class install failed: {message}")]
    ClassInstall { message: String, installed: Vec<bool> },

    #[error("{cause_class}: {message}")]
    User {
        message: String,
        cause_class: String,
        stack: Vec<StackFrame>,
    },

    #[error("unresolved reference {id}")]
    Corralled { id: i32, stack: Vec<StackFrame> },

    #[error("execution stopped")]
    Stopped,

    #[error("{0} answered with an unexpected success payload")]
    UnexpectedPayload(&'static str),
}

impl RemoteError {
    /// Stable status name, as used in CLI output.
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Codec(_) | Self::UnexpectedPayload(_) => "CHANNEL_ERROR",
            Self::Terminated(_) => "TERMINATED",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Internal(_) => "INTERNAL_PROBLEM",
            Self::ClassInstall { .. } => "CLASS_INSTALL_EXCEPTION",
            Self::User { .. } => "USER_EXCEPTION",
            Self::Corralled { .. } => "CORRALLED",
            Self::Stopped => "STOPPED",
        }
    }
}

/// Split a response into its success payload or the failure it reports.
pub fn into_result(response: Response) -> Result<SuccessPayload, RemoteError> {
    match response {
        Response::Success(payload) => Ok(payload),
        Response::Terminated { message } => Err(RemoteError::Terminated(message.unwrap_or_default())),
        Response::NotImplemented { message } => Err(RemoteError::NotImplemented(message)),
        Response::InternalProblem { message } => Err(RemoteError::Internal(message)),
        Response::ClassInstallException { message, installed } => {
            Err(RemoteError::ClassInstall { message, installed })
        }
        Response::UserException {
            message,
            cause_class,
            stack,
        } => Err(RemoteError::User {
            message,
            cause_class,
            stack,
        }),
        Response::Corralled { id, stack } => Err(RemoteError::Corralled { id, stack }),
        Response::Stopped => Err(RemoteError::Stopped),
    }
}

/// Front-end side of a relay session.
pub struct RelayClient<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<R: Read, W: Write> RelayClient<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            reader: FrameReader::new(input),
            writer: FrameWriter::new(output),
        }
    }

    /// Send one command and wait for its response.
    ///
    /// Returns `Ok(None)` for commands the agent never answers (`stop`,
    /// `close`).
    pub fn send(&mut self, command: &Command) -> Result<Option<SuccessPayload>, RemoteError> {
        command.write_to(&mut self.writer)?;
        let Some(shape) = command.success_shape() else {
            return Ok(None);
        };
        let response = Response::read_from(&mut self.reader, shape)?;
        into_result(response).map(Some)
    }

    pub fn load(&mut self, classes: Vec<ClassBytecodes>) -> Result<(), RemoteError> {
        self.send_expecting_empty(&Command::Load(classes), "load")
    }

    pub fn redefine(&mut self, classes: Vec<ClassBytecodes>) -> Result<(), RemoteError> {
        self.send_expecting_empty(&Command::Redefine(classes), "redefine")
    }

    pub fn invoke(&mut self, class_name: &str, method_name: &str) -> Result<String, RemoteError> {
        let command = Command::Invoke {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
        };
        self.send_expecting_text(&command, "invoke")
    }

    pub fn var_value(&mut self, class_name: &str, var_name: &str) -> Result<String, RemoteError> {
        let command = Command::VarValue {
            class_name: class_name.to_string(),
            var_name: var_name.to_string(),
        };
        self.send_expecting_text(&command, "var_value")
    }

    pub fn add_to_classpath(&mut self, path: &str) -> Result<(), RemoteError> {
        let command = Command::AddToClasspath {
            path: path.to_string(),
        };
        self.send_expecting_empty(&command, "add_to_classpath")
    }

    pub fn extension_command(&mut self, name: &str, arg: Value) -> Result<Value, RemoteError> {
        let command = Command::Extension {
            name: name.to_string(),
            arg,
        };
        match self.send(&command)? {
            Some(SuccessPayload::Opaque(value)) => Ok(value),
            _ => Err(RemoteError::UnexpectedPayload("extension_command")),
        }
    }

    /// Ask the agent to interrupt the running invocation. No reply is read.
    pub fn stop(&mut self) -> Result<(), RemoteError> {
        self.send(&Command::Stop).map(|_| ())
    }

    /// Ask the agent to close its engine. No reply is read.
    pub fn close(&mut self) -> Result<(), RemoteError> {
        self.send(&Command::Close).map(|_| ())
    }

    fn send_expecting_empty(&mut self, command: &Command, op: &'static str) -> Result<(), RemoteError> {
        match self.send(command)? {
            Some(SuccessPayload::Empty) => Ok(()),
            _ => Err(RemoteError::UnexpectedPayload(op)),
        }
    }

    fn send_expecting_text(&mut self, command: &Command, op: &'static str) -> Result<String, RemoteError> {
        match self.send(command)? {
            Some(SuccessPayload::Text(text)) => Ok(text),
            _ => Err(RemoteError::UnexpectedPayload(op)),
        }
    }
}
