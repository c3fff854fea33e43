//! Response status codes.

use std::fmt;

/// Status code that opens every response frame.
///
/// The status alone determines the payload shape that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation completed; payload depends on the originating command.
    Success,
    /// Engine is unusable; the relay loop ends. Payload: message.
    Terminated,
    /// Operation unsupported. Payload: message.
    NotImplemented,
    /// Engine-internal fault. Payload: message.
    InternalProblem,
    /// User code threw. Payload: message, cause class name, stack frames.
    UserException,
    /// Reference deferred for later resolution. Payload: id, stack frames.
    Corralled,
    /// Execution was interrupted. No payload.
    Stopped,
    /// Some classes failed to install. Payload: message, installed flags.
    ClassInstallException,
}

impl Status {
    /// Every status, in wire-code order.
    pub const ALL: [Status; 8] = [
        Self::Success,
        Self::Terminated,
        Self::NotImplemented,
        Self::InternalProblem,
        Self::UserException,
        Self::Corralled,
        Self::Stopped,
        Self::ClassInstallException,
    ];

    /// The integer written on the wire.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 100,
            Self::Terminated => 101,
            Self::NotImplemented => 102,
            Self::InternalProblem => 103,
            Self::UserException => 104,
            Self::Corralled => 105,
            Self::Stopped => 106,
            Self::ClassInstallException => 107,
        }
    }

    /// Look up a status from its wire integer.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Whether the relay loop keeps reading commands after this status.
    pub fn continues_loop(self) -> bool {
        self != Self::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Terminated => "TERMINATED",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::InternalProblem => "INTERNAL_PROBLEM",
            Self::UserException => "USER_EXCEPTION",
            Self::Corralled => "CORRALLED",
            Self::Stopped => "STOPPED",
            Self::ClassInstallException => "CLASS_INSTALL_EXCEPTION",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
