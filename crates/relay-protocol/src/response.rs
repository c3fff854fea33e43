//! Response frames.

use std::io::{Read, Write};

use serde_json::Value;

use crate::codec::{FrameReader, FrameWriter};
use crate::error::CodecError;
use crate::status::Status;
use crate::types::StackFrame;

/// Payload of a [`Status::Success`] response.
#[derive(Debug, Clone, PartialEq)]
pub enum SuccessPayload {
    Empty,
    Text(String),
    Opaque(Value),
}

/// Which success payload a reader should expect.
///
/// The status code alone fixes every failure payload; for success the shape
/// comes from the command that was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessShape {
    Empty,
    Text,
    Opaque,
}

/// A response frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(SuccessPayload),
    /// An absent message is written as the empty string.
    Terminated { message: Option<String> },
    NotImplemented { message: String },
    InternalProblem { message: String },
    ClassInstallException { message: String, installed: Vec<bool> },
    UserException {
        message: String,
        cause_class: String,
        stack: Vec<StackFrame>,
    },
    Corralled { id: i32, stack: Vec<StackFrame> },
    Stopped,
}

impl Response {
    pub fn status(&self) -> Status {
        match self {
            Self::Success(_) => Status::Success,
            Self::Terminated { .. } => Status::Terminated,
            Self::NotImplemented { .. } => Status::NotImplemented,
            Self::InternalProblem { .. } => Status::InternalProblem,
            Self::ClassInstallException { .. } => Status::ClassInstallException,
            Self::UserException { .. } => Status::UserException,
            Self::Corralled { .. } => Status::Corralled,
            Self::Stopped => Status::Stopped,
        }
    }

    /// Write the whole frame and flush it.
    ///
    /// Text fields go through [`FrameWriter::write_text`] and may be
    /// truncated.
    pub fn write_to<W: Write>(&self, writer: &mut FrameWriter<W>) -> Result<(), CodecError> {
        writer.write_int(self.status().code())?;
        match self {
            Self::Success(SuccessPayload::Empty) | Self::Stopped => {}
            Self::Success(SuccessPayload::Text(text)) => writer.write_text(Some(text.as_str()))?,
            Self::Success(SuccessPayload::Opaque(value)) => writer.write_opaque(value)?,
            Self::Terminated { message } => writer.write_text(message.as_deref())?,
            Self::NotImplemented { message } | Self::InternalProblem { message } => {
                writer.write_text(Some(message.as_str()))?
            }
            Self::ClassInstallException { message, installed } => {
                writer.write_text(Some(message.as_str()))?;
                writer.write_opaque(installed)?;
            }
            Self::UserException {
                message,
                cause_class,
                stack,
            } => {
                writer.write_text(Some(message.as_str()))?;
                writer.write_text(Some(cause_class.as_str()))?;
                writer.write_opaque(stack)?;
            }
            Self::Corralled { id, stack } => {
                writer.write_int(*id)?;
                writer.write_opaque(stack)?;
            }
        }
        writer.flush()
    }

    /// Read a whole response frame.
    ///
    /// `shape` is only consulted for [`Status::Success`].
    pub fn read_from<R: Read>(reader: &mut FrameReader<R>, shape: SuccessShape) -> Result<Self, CodecError> {
        let code = reader.read_int()?;
        let status = Status::from_code(code).ok_or(CodecError::UnknownStatus(code))?;
        let response = match status {
            Status::Success => Self::Success(match shape {
                SuccessShape::Empty => SuccessPayload::Empty,
                SuccessShape::Text => SuccessPayload::Text(reader.read_utf()?),
                SuccessShape::Opaque => SuccessPayload::Opaque(reader.read_opaque()?),
            }),
            Status::Terminated => Self::Terminated {
                message: Some(reader.read_utf()?),
            },
            Status::NotImplemented => Self::NotImplemented {
                message: reader.read_utf()?,
            },
            Status::InternalProblem => Self::InternalProblem {
                message: reader.read_utf()?,
            },
            Status::ClassInstallException => Self::ClassInstallException {
                message: reader.read_utf()?,
                installed: reader.read_opaque()?,
            },
            Status::UserException => Self::UserException {
                message: reader.read_utf()?,
                cause_class: reader.read_utf()?,
                stack: reader.read_opaque()?,
            },
            Status::Corralled => Self::Corralled {
                id: reader.read_int()?,
                stack: reader.read_opaque()?,
            },
            Status::Stopped => Self::Stopped,
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(response: &Response) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        response.write_to(&mut writer).unwrap();
        writer.into_inner()
    }

    fn decode(bytes: Vec<u8>, shape: SuccessShape) -> Response {
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let response = Response::read_from(&mut reader, shape).unwrap();
        let cursor = reader.into_inner();
        assert_eq!(cursor.position(), cursor.get_ref().len() as u64, "trailing bytes after frame");
        response
    }

    #[test]
    fn test_empty_success_is_status_only() {
        assert_eq!(encode(&Response::Success(SuccessPayload::Empty)), vec![0, 0, 0, 100]);
    }

    #[test]
    fn test_stopped_is_status_only() {
        assert_eq!(encode(&Response::Stopped), vec![0, 0, 0, 106]);
    }

    #[test]
    fn test_text_success() {
        let bytes = encode(&Response::Success(SuccessPayload::Text("42".to_string())));
        assert_eq!(bytes, vec![0, 0, 0, 100, 0, 2, b'4', b'2']);
    }

    #[test]
    fn test_terminated_without_message() {
        let bytes = encode(&Response::Terminated { message: None });
        assert_eq!(bytes, vec![0, 0, 0, 101, 0, 0]);
        assert_eq!(
            decode(bytes, SuccessShape::Empty),
            Response::Terminated {
                message: Some(String::new())
            }
        );
    }

    #[test]
    fn test_corralled_layout() {
        let stack = vec![StackFrame::new("Foo", "bar", Some("Foo.java"), 3)];
        let bytes = encode(&Response::Corralled { id: 7, stack: stack.clone() });
        assert_eq!(&bytes[..8], &[0, 0, 0, 105, 0, 0, 0, 7]);
        assert_eq!(decode(bytes, SuccessShape::Empty), Response::Corralled { id: 7, stack });
    }

    #[test]
    fn test_user_exception_field_order() {
        let response = Response::UserException {
            message: "boom".to_string(),
            cause_class: "java.lang.ArithmeticException".to_string(),
            stack: vec![],
        };
        let bytes = encode(&response);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_int().unwrap(), 104);
        assert_eq!(reader.read_utf().unwrap(), "boom");
        assert_eq!(reader.read_utf().unwrap(), "java.lang.ArithmeticException");
        assert_eq!(reader.read_opaque::<Vec<StackFrame>>().unwrap(), vec![]);
    }

    #[test]
    fn test_class_install_exception() {
        let response = Response::ClassInstallException {
            message: "1 of 2 classes failed".to_string(),
            installed: vec![true, false],
        };
        assert_eq!(decode(encode(&response), SuccessShape::Empty), response);
    }

    #[test]
    fn test_failure_ignores_success_shape() {
        let response = Response::NotImplemented {
            message: "nope".to_string(),
        };
        assert_eq!(decode(encode(&response), SuccessShape::Opaque), response);
    }

    #[test]
    fn test_long_message_truncated_on_write() {
        let response = Response::InternalProblem {
            message: "e".repeat(50_000),
        };
        match decode(encode(&response), SuccessShape::Empty) {
            Response::InternalProblem { message } => assert_eq!(message.len(), crate::MAX_UTF_CHARS),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status() {
        let mut reader = FrameReader::new(Cursor::new(vec![0, 0, 0, 42]));
        let err = Response::read_from(&mut reader, SuccessShape::Empty).unwrap_err();
        assert!(matches!(err, CodecError::UnknownStatus(42)));
    }
}
