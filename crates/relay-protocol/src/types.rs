//! Opaque payload types carried inside frames.

use serde::{Deserialize, Serialize};

/// One class to install: its binary name and class-file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBytecodes {
    /// Binary class name, e.g. `REPL.$JShell$11`.
    pub name: String,
    /// Raw class-file bytes.
    pub bytecodes: Vec<u8>,
}

impl ClassBytecodes {
    /// Create a new class/bytecode pair.
    pub fn new(name: impl Into<String>, bytecodes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytecodes: bytecodes.into(),
        }
    }
}

/// One frame of a stack captured from user code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub declaring_class: String,
    pub method_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Source line, or a negative value when unknown.
    pub line_number: i32,
}

impl StackFrame {
    pub fn new(
        declaring_class: impl Into<String>,
        method_name: impl Into<String>,
        file_name: Option<&str>,
        line_number: i32,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            method_name: method_name.into(),
            file_name: file_name.map(str::to_string),
            line_number,
        }
    }
}
