//! Error types for the frame codec.

use std::io;

/// Errors raised while reading or writing frames.
///
/// Transport-level failures ([`CodecError::is_transport`]) mean the peer is
/// gone or the stream is corrupt; everything else is a well-framed value
/// that could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("channel I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid command prefix: {0}")]
    InvalidPrefix(i32),

    #[error("text field is not valid UTF-8")]
    InvalidUtf8,

    #[error("negative opaque length: {0}")]
    NegativeLength(i32),

    #[error("text of {0} bytes exceeds the 65535-byte field limit")]
    TextTooLong(usize),

    #[error("opaque value could not be decoded: {0}")]
    Opaque(#[source] serde_json::Error),

    #[error("unknown response status: {0}")]
    UnknownStatus(i32),
}

impl CodecError {
    /// Whether this failure comes from the channel itself rather than from
    /// the content of a well-formed frame.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::InvalidUtf8 | Self::NegativeLength(_)
        )
    }
}
