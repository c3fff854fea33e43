//! Command frames.

use std::io::{Read, Write};

use serde_json::Value;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::CodecError;
use crate::response::SuccessShape;
use crate::types::ClassBytecodes;
use crate::COMMAND_PREFIX;

/// Command names as they appear on the wire.
pub mod names {
    pub const LOAD: &str = "CMD_LOAD";
    pub const REDEFINE: &str = "CMD_REDEFINE";
    pub const INVOKE: &str = "CMD_INVOKE";
    pub const VAR_VALUE: &str = "CMD_VAR_VALUE";
    pub const ADD_CLASSPATH: &str = "CMD_ADD_CLASSPATH";
    pub const STOP: &str = "CMD_STOP";
    pub const CLOSE: &str = "CMD_CLOSE";
}

/// Which operation a command frame requests.
///
/// Any name outside the fixed set is an extension command, forwarded to the
/// engine unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandTag {
    Load,
    Redefine,
    Invoke,
    VarValue,
    AddToClasspath,
    Stop,
    Close,
    Extension(String),
}

impl CommandTag {
    /// Map a wire name to its tag.
    pub fn parse(name: &str) -> Self {
        match name {
            names::LOAD => Self::Load,
            names::REDEFINE => Self::Redefine,
            names::INVOKE => Self::Invoke,
            names::VAR_VALUE => Self::VarValue,
            names::ADD_CLASSPATH => Self::AddToClasspath,
            names::STOP => Self::Stop,
            names::CLOSE => Self::Close,
            other => Self::Extension(other.to_string()),
        }
    }

    /// The wire name of this tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Load => names::LOAD,
            Self::Redefine => names::REDEFINE,
            Self::Invoke => names::INVOKE,
            Self::VarValue => names::VAR_VALUE,
            Self::AddToClasspath => names::ADD_CLASSPATH,
            Self::Stop => names::STOP,
            Self::Close => names::CLOSE,
            Self::Extension(name) => name,
        }
    }
}

/// A decoded command with its tag-specific arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Install new classes.
    Load(Vec<ClassBytecodes>),
    /// Replace the bytecode of already-installed classes.
    Redefine(Vec<ClassBytecodes>),
    /// Run an entry point in installed code.
    Invoke {
        class_name: String,
        method_name: String,
    },
    /// Read the current value of a variable.
    VarValue { class_name: String, var_name: String },
    /// Append a path to the engine's classpath.
    AddToClasspath { path: String },
    /// Interrupt whatever the engine is running.
    Stop,
    /// Shut the engine down.
    Close,
    /// Open-ended command handled by the engine's extension hook.
    ///
    /// `name` should not collide with one of the fixed [`names`]; the peer
    /// would decode such a frame as the fixed command instead.
    Extension { name: String, arg: Value },
}

impl Command {
    pub fn tag(&self) -> CommandTag {
        match self {
            Self::Load(_) => CommandTag::Load,
            Self::Redefine(_) => CommandTag::Redefine,
            Self::Invoke { .. } => CommandTag::Invoke,
            Self::VarValue { .. } => CommandTag::VarValue,
            Self::AddToClasspath { .. } => CommandTag::AddToClasspath,
            Self::Stop => CommandTag::Stop,
            Self::Close => CommandTag::Close,
            Self::Extension { name, .. } => CommandTag::Extension(name.clone()),
        }
    }

    /// Read a whole command frame: prefix, name, then arguments.
    pub fn read<R: Read>(reader: &mut FrameReader<R>) -> Result<Self, CodecError> {
        let name = reader.read_command_tag()?;
        Self::read_args(CommandTag::parse(&name), reader)
    }

    /// Read exactly the argument fields `tag` declares.
    pub fn read_args<R: Read>(tag: CommandTag, reader: &mut FrameReader<R>) -> Result<Self, CodecError> {
        let command = match tag {
            CommandTag::Load => Self::Load(reader.read_opaque()?),
            CommandTag::Redefine => Self::Redefine(reader.read_opaque()?),
            CommandTag::Invoke => Self::Invoke {
                class_name: reader.read_utf()?,
                method_name: reader.read_utf()?,
            },
            CommandTag::VarValue => Self::VarValue {
                class_name: reader.read_utf()?,
                var_name: reader.read_utf()?,
            },
            CommandTag::AddToClasspath => Self::AddToClasspath {
                path: reader.read_utf()?,
            },
            CommandTag::Stop => Self::Stop,
            CommandTag::Close => Self::Close,
            CommandTag::Extension(name) => Self::Extension {
                name,
                arg: reader.read_opaque()?,
            },
        };
        Ok(command)
    }

    /// Write a complete command frame and flush it.
    pub fn write_to<W: Write>(&self, writer: &mut FrameWriter<W>) -> Result<(), CodecError> {
        writer.write_int(COMMAND_PREFIX)?;
        writer.write_utf(self.tag().as_str())?;
        match self {
            Self::Load(classes) | Self::Redefine(classes) => writer.write_opaque(classes)?,
            Self::Invoke {
                class_name,
                method_name,
            } => {
                writer.write_utf(class_name)?;
                writer.write_utf(method_name)?;
            }
            Self::VarValue {
                class_name,
                var_name,
            } => {
                writer.write_utf(class_name)?;
                writer.write_utf(var_name)?;
            }
            Self::AddToClasspath { path } => writer.write_utf(path)?,
            Self::Stop | Self::Close => {}
            Self::Extension { arg, .. } => writer.write_opaque(arg)?,
        }
        writer.flush()
    }

    /// The success payload the agent answers this command with, or `None`
    /// when the agent sends no response at all.
    pub fn success_shape(&self) -> Option<SuccessShape> {
        match self {
            Self::Load(_) | Self::Redefine(_) | Self::AddToClasspath { .. } => Some(SuccessShape::Empty),
            Self::Invoke { .. } | Self::VarValue { .. } => Some(SuccessShape::Text),
            Self::Extension { .. } => Some(SuccessShape::Opaque),
            Self::Stop | Self::Close => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn encode(command: &Command) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        command.write_to(&mut writer).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_parse_fixed_names() {
        assert_eq!(CommandTag::parse("CMD_LOAD"), CommandTag::Load);
        assert_eq!(CommandTag::parse("CMD_VAR_VALUE"), CommandTag::VarValue);
        assert_eq!(CommandTag::parse("CMD_ADD_CLASSPATH"), CommandTag::AddToClasspath);
        assert_eq!(CommandTag::parse("CMD_CLOSE"), CommandTag::Close);
    }

    #[test]
    fn test_unknown_name_is_extension() {
        let tag = CommandTag::parse("ping");
        assert_eq!(tag, CommandTag::Extension("ping".to_string()));
        assert_eq!(tag.as_str(), "ping");
        // Names are case-sensitive.
        assert!(matches!(CommandTag::parse("cmd_load"), CommandTag::Extension(_)));
    }

    #[test]
    fn test_invoke_frame_layout() {
        let bytes = encode(&Command::Invoke {
            class_name: "Foo".to_string(),
            method_name: "bar".to_string(),
        });

        let mut expected = vec![0xC0, 0xDE, 0xC0, 0xDE, 0, 10];
        expected.extend_from_slice(b"CMD_INVOKE");
        expected.extend_from_slice(&[0, 3]);
        expected.extend_from_slice(b"Foo");
        expected.extend_from_slice(&[0, 3]);
        expected.extend_from_slice(b"bar");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_stop_frame_has_no_arguments() {
        let bytes = encode(&Command::Stop);
        assert_eq!(bytes.len(), 4 + 2 + "CMD_STOP".len());
    }

    #[test]
    fn test_read_leaves_following_frame_untouched() {
        let mut bytes = encode(&Command::Load(vec![ClassBytecodes::new("A", vec![1, 2])]));
        let first_len = bytes.len() as u64;
        bytes.extend(encode(&Command::Close));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let command = Command::read(&mut reader).unwrap();
        assert_eq!(command, Command::Load(vec![ClassBytecodes::new("A", vec![1, 2])]));
        assert_eq!(Command::read(&mut reader).unwrap(), Command::Close);

        let cursor = reader.into_inner();
        assert_eq!(cursor.position(), cursor.get_ref().len() as u64);
        assert!(first_len < cursor.position());
    }

    #[test]
    fn test_extension_reads_opaque_argument() {
        let bytes = encode(&Command::Extension {
            name: "ping".to_string(),
            arg: json!({"n": 1}),
        });
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(
            Command::read(&mut reader).unwrap(),
            Command::Extension {
                name: "ping".to_string(),
                arg: json!({"n": 1})
            }
        );
    }

    #[test]
    fn test_success_shapes() {
        assert_eq!(Command::Load(vec![]).success_shape(), Some(SuccessShape::Empty));
        assert_eq!(
            Command::VarValue {
                class_name: "C".to_string(),
                var_name: "v".to_string()
            }
            .success_shape(),
            Some(SuccessShape::Text)
        );
        assert_eq!(Command::Stop.success_shape(), None);
        assert_eq!(Command::Close.success_shape(), None);
    }
}
