//! Frame codec.
//!
//! Primitive reads and writes on top of a raw duplex byte stream:
//! - `int32`: four bytes, big-endian
//! - text: `u16` big-endian byte length, then UTF-8 bytes
//! - opaque: `int32` byte length, then a JSON-serialized value
//!
//! Callers never see partial reads: a short stream surfaces as
//! [`CodecError::Io`].

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;
use crate::{COMMAND_PREFIX, MAX_UTF_BYTES, MAX_UTF_CHARS};

/// Reading half of a frame channel.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying byte source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read a big-endian 32-bit signed integer.
    pub fn read_int(&mut self) -> Result<i32, CodecError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Read a length-prefixed UTF-8 text field.
    pub fn read_utf(&mut self) -> Result<String, CodecError> {
        let mut len = [0u8; 2];
        self.inner.read_exact(&mut len)?;
        let mut bytes = vec![0u8; usize::from(u16::from_be_bytes(len))];
        self.inner.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a length-prefixed opaque value and decode it as `T`.
    pub fn read_opaque<T: DeserializeOwned>(&mut self) -> Result<T, CodecError> {
        let bytes = self.read_opaque_bytes()?;
        serde_json::from_slice(&bytes).map_err(CodecError::Opaque)
    }

    /// Read the prefix and command name that open a command frame.
    ///
    /// Fails with [`CodecError::InvalidPrefix`] without reading further when
    /// the prefix is not [`COMMAND_PREFIX`].
    pub fn read_command_tag(&mut self) -> Result<String, CodecError> {
        let prefix = self.read_int()?;
        if prefix != COMMAND_PREFIX {
            return Err(CodecError::InvalidPrefix(prefix));
        }
        self.read_utf()
    }

    fn read_opaque_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_int()?;
        let len = u64::try_from(len).map_err(|_| CodecError::NegativeLength(len))?;

        // Read through `take` so a corrupt length cannot force a huge allocation.
        let mut bytes = Vec::new();
        let read = (&mut self.inner).take(len).read_to_end(&mut bytes)?;
        if read as u64 != len {
            return Err(CodecError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("opaque value truncated: expected {} bytes, got {}", len, read),
            )));
        }
        Ok(bytes)
    }
}

/// Writing half of a frame channel.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying byte sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write a big-endian 32-bit signed integer.
    pub fn write_int(&mut self, value: i32) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Write a text field exactly as given.
    ///
    /// Fails with [`CodecError::TextTooLong`] when the UTF-8 encoding does not
    /// fit the 16-bit length prefix; nothing is written in that case.
    pub fn write_utf(&mut self, text: &str) -> Result<(), CodecError> {
        let len = u16::try_from(text.len()).map_err(|_| CodecError::TextTooLong(text.len()))?;
        self.inner.write_all(&len.to_be_bytes())?;
        self.inner.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Write a text field that is allowed to lose data.
    ///
    /// An absent value is written as the empty string and anything longer
    /// than [`MAX_UTF_CHARS`] is silently cut to that length, so the field
    /// can never overflow the length prefix.
    pub fn write_text(&mut self, text: Option<&str>) -> Result<(), CodecError> {
        self.write_utf(truncate_utf(text.unwrap_or_default()))
    }

    /// Serialize and write a length-prefixed opaque value.
    pub fn write_opaque<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        let bytes = serde_json::to_vec(value).map_err(CodecError::Opaque)?;
        let len = i32::try_from(bytes.len()).map_err(|_| {
            CodecError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("opaque value of {} bytes is too large to frame", bytes.len()),
            ))
        })?;
        self.write_int(len)?;
        self.inner.write_all(&bytes)?;
        Ok(())
    }

    /// Push buffered bytes out to the peer.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Cut `text` to at most [`MAX_UTF_CHARS`] characters.
///
/// Characters are counted in UTF-16 code units, which keeps every character
/// at three UTF-8 bytes or fewer per unit. A code point that would straddle
/// the limit is dropped whole.
pub fn truncate_utf(text: &str) -> &str {
    if text.len() <= MAX_UTF_CHARS {
        return text;
    }
    let mut units = 0;
    for (index, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > MAX_UTF_CHARS {
            return &text[..index];
        }
    }
    debug_assert!(text.len() <= MAX_UTF_BYTES);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn writer() -> FrameWriter<Vec<u8>> {
        FrameWriter::new(Vec::new())
    }

    fn reader(bytes: Vec<u8>) -> FrameReader<Cursor<Vec<u8>>> {
        FrameReader::new(Cursor::new(bytes))
    }

    #[test]
    fn test_int_is_big_endian() {
        let mut w = writer();
        w.write_int(0x0102_0304).unwrap();
        assert_eq!(w.into_inner(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_utf_layout() {
        let mut w = writer();
        w.write_utf("hé").unwrap();
        assert_eq!(w.into_inner(), vec![0, 3, b'h', 0xC3, 0xA9]);
    }

    #[test]
    fn test_absent_text_is_empty_string() {
        let mut absent = writer();
        absent.write_text(None).unwrap();

        let mut empty = writer();
        empty.write_utf("").unwrap();

        assert_eq!(absent.into_inner(), empty.into_inner());
    }

    #[test]
    fn test_short_text_unchanged() {
        let text = "x".repeat(MAX_UTF_CHARS);
        let mut w = writer();
        w.write_text(Some(&text)).unwrap();

        let mut r = reader(w.into_inner());
        assert_eq!(r.read_utf().unwrap(), text);
    }

    #[test]
    fn test_long_text_truncated_to_max_chars() {
        let text = "abc".repeat(20_000);
        let mut w = writer();
        w.write_text(Some(&text)).unwrap();

        let mut r = reader(w.into_inner());
        let decoded = r.read_utf().unwrap();
        assert_eq!(decoded.len(), MAX_UTF_CHARS);
        assert_eq!(decoded, text[..MAX_UTF_CHARS]);
    }

    #[test]
    fn test_truncation_of_three_byte_chars_fits_prefix() {
        let text = "€".repeat(30_000);
        let cut = truncate_utf(&text);
        assert_eq!(cut.chars().count(), MAX_UTF_CHARS);
        assert!(cut.len() <= MAX_UTF_BYTES);
        assert!(writer().write_text(Some(&text)).is_ok());
    }

    #[test]
    fn test_truncation_never_splits_surrogate_pair() {
        // 'a' then pairs: the limit lands in the middle of a pair.
        let text = format!("a{}", "😀".repeat(MAX_UTF_CHARS));
        let cut = truncate_utf(&text);
        let units: usize = cut.chars().map(char::len_utf16).sum();
        assert_eq!(units, MAX_UTF_CHARS - 1);
        assert!(cut.len() <= MAX_UTF_BYTES);
    }

    #[test]
    fn test_write_utf_rejects_oversized_text() {
        let text = "x".repeat(MAX_UTF_BYTES + 1);
        let mut w = writer();
        let err = w.write_utf(&text).unwrap_err();
        assert!(matches!(err, CodecError::TextTooLong(65536)));
        assert!(w.into_inner().is_empty());
    }

    #[test]
    fn test_opaque_layout() {
        let mut w = writer();
        w.write_opaque(&vec![true, false]).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[..4], &[0, 0, 0, 12]);
        assert_eq!(&bytes[4..], b"[true,false]");

        let mut r = reader(bytes);
        let installed: Vec<bool> = r.read_opaque().unwrap();
        assert_eq!(installed, vec![true, false]);
    }

    #[test]
    fn test_opaque_wrong_shape_is_not_transport() {
        let mut w = writer();
        w.write_opaque(&serde_json::json!({"not": "a list"})).unwrap();

        let mut r = reader(w.into_inner());
        let err = r.read_opaque::<Vec<bool>>().unwrap_err();
        assert!(matches!(err, CodecError::Opaque(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_negative_opaque_length() {
        let mut r = reader((-1i32).to_be_bytes().to_vec());
        let err = r.read_opaque::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, CodecError::NegativeLength(-1)));
    }

    #[test]
    fn test_truncated_opaque_is_transport_failure() {
        let mut bytes = 100i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"[1,2");
        let err = reader(bytes).read_opaque::<serde_json::Value>().unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_short_int_is_transport_failure() {
        let err = reader(vec![0, 1]).read_int().unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = reader(vec![0, 2, 0xFF, 0xFE]).read_utf().unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8));
    }

    #[test]
    fn test_command_tag_checks_prefix_first() {
        let mut bytes = 42i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0, 3, b'a', b'b', b'c']);
        let mut r = reader(bytes);

        let err = r.read_command_tag().unwrap_err();
        assert!(matches!(err, CodecError::InvalidPrefix(42)));
        // The name after a bad prefix is left unread.
        assert_eq!(r.into_inner().position(), 4);
    }

    #[test]
    fn test_command_tag_reads_name() {
        let mut w = writer();
        w.write_int(COMMAND_PREFIX).unwrap();
        w.write_utf("CMD_STOP").unwrap();

        let mut r = reader(w.into_inner());
        assert_eq!(r.read_command_tag().unwrap(), "CMD_STOP");
    }
}
