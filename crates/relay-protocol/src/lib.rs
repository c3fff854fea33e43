//! Execution Relay Protocol Types
//!
//! Defines the length-prefixed binary framing used between a front-end
//! controller and the agent that forwards its commands to an execution
//! engine. A command frame is
//!
//! ```text
//! int32 COMMAND_PREFIX | utf command-name | <tag-specific fields>
//! ```
//!
//! and a response frame is
//!
//! ```text
//! int32 status | <status-specific fields>
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod response;
pub mod status;
pub mod types;

pub use codec::{truncate_utf, FrameReader, FrameWriter};
pub use command::{names, Command, CommandTag};
pub use error::CodecError;
pub use response::{Response, SuccessPayload, SuccessShape};
pub use status::Status;
pub use types::{ClassBytecodes, StackFrame};

/// Magic value that opens every command frame.
pub const COMMAND_PREFIX: i32 = 0xC0DE_C0DE_u32 as i32;

/// Largest byte length a text field can carry (16-bit length prefix).
pub const MAX_UTF_BYTES: usize = u16::MAX as usize;

/// Maximum number of characters written for a text field.
///
/// At most three bytes per character, 65535 / 3 == 21845, minus one.
pub const MAX_UTF_CHARS: usize = 21844;
