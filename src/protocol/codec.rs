//! Protocol codec
//!
//! Streaming RESP2 reader and writer helpers.
//!
//! ## Wire Format
//!
//! ```text
//! +<text>\r\n                 simple string
//! -<text>\r\n                 error
//! :<i64>\r\n                  integer
//! $<n>\r\n<n bytes>\r\n       bulk string ($-1\r\n = null)
//! *<n>\r\n<frame>...<frame>   array of n frames
//! ```
//!
//! The reader distinguishes a clean end of stream (no bytes pending at a
//! frame boundary) from a truncated or malformed frame.

use std::io::{BufRead, Read, Write};

use bytes::Bytes;

use super::Value;
use crate::error::{KvError, Result};

/// Maximum bulk string payload (512 MB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Maximum number of elements in one array header
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Maximum length of a `+`, `-`, `:` or length line, CRLF included
pub const MAX_LINE_LEN: u64 = 64 * 1024;

/// Maximum array nesting
pub const MAX_DEPTH: usize = 64;

/// Largest buffer reserved up front for a bulk payload
const BULK_PREALLOC_LIMIT: usize = 64 * 1024;

// =============================================================================
// Reader
// =============================================================================

/// Reads one frame at a time from a buffered byte stream
pub struct RespReader<R> {
    reader: R,

    /// Bytes pulled from the stream so far
    consumed: u64,

    /// Offset just past the last complete frame
    frame_end: u64,

    /// Set when the stream ended in the middle of a frame
    truncated: bool,

    line: Vec<u8>,
}

impl<R: BufRead> RespReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            consumed: 0,
            frame_end: 0,
            truncated: false,
            line: Vec::new(),
        }
    }

    /// Read the next complete frame
    ///
    /// Returns:
    /// - `Ok(Some(value))`: one frame consumed
    /// - `Ok(None)`: stream closed at a frame boundary
    /// - `Err(KvError::Protocol)`: malformed or truncated frame
    /// - `Err(KvError::Io)`: the underlying stream failed
    pub fn read_value(&mut self) -> Result<Option<Value>> {
        let type_byte = {
            let available = self.reader.fill_buf()?;
            match available.first() {
                Some(&b) => b,
                None => return Ok(None),
            }
        };
        self.reader.consume(1);
        self.consumed += 1;

        let value = self.read_body(type_byte, 0)?;
        self.frame_end = self.consumed;
        Ok(Some(value))
    }

    /// Offset just past the last complete frame returned by `read_value`
    pub fn bytes_consumed(&self) -> u64 {
        self.frame_end
    }

    /// True if the last error was caused by the stream ending mid-frame
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_body(&mut self, type_byte: u8, depth: usize) -> Result<Value> {
        match type_byte {
            b'+' => {
                let text = self.read_text_line()?;
                Ok(Value::SimpleString(text))
            }
            b'-' => {
                let text = self.read_text_line()?;
                Ok(Value::Error(text))
            }
            b':' => {
                let n = self.read_integer_line()?;
                Ok(Value::Integer(n))
            }
            b'$' => self.read_bulk(),
            b'*' => self.read_array(depth),
            other => Err(KvError::Protocol(format!(
                "unknown type byte 0x{:02x}",
                other
            ))),
        }
    }

    fn read_bulk(&mut self) -> Result<Value> {
        let len = self.read_integer_line()?;
        if len == -1 {
            return Ok(Value::BulkString(None));
        }
        if !(0..=MAX_BULK_LEN).contains(&len) {
            return Err(KvError::Protocol(format!("invalid bulk length {}", len)));
        }

        // Grow with the bytes that actually arrive, not the declared length
        let mut data = Vec::with_capacity((len as usize).min(BULK_PREALLOC_LIMIT));
        let n = (&mut self.reader).take(len as u64).read_to_end(&mut data)?;
        self.consumed += n as u64;
        if n < len as usize {
            return Err(self.unexpected_eof());
        }

        let mut crlf = [0u8; 2];
        self.read_exact(&mut crlf)?;
        if &crlf != b"\r\n" {
            return Err(KvError::Protocol(
                "bulk string not terminated by CRLF".to_string(),
            ));
        }

        Ok(Value::BulkString(Some(Bytes::from(data))))
    }

    fn read_array(&mut self, depth: usize) -> Result<Value> {
        if depth >= MAX_DEPTH {
            return Err(KvError::Protocol("array nesting too deep".to_string()));
        }

        let len = self.read_integer_line()?;
        if !(0..=MAX_ARRAY_LEN).contains(&len) {
            return Err(KvError::Protocol(format!("invalid array length {}", len)));
        }

        let len = len as usize;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let mut type_byte = [0u8; 1];
            self.read_exact(&mut type_byte)?;
            items.push(self.read_body(type_byte[0], depth + 1)?);
        }

        Ok(Value::Array(items))
    }

    fn read_text_line(&mut self) -> Result<String> {
        self.read_line()?;
        String::from_utf8(self.line.clone())
            .map_err(|_| KvError::Protocol("invalid UTF-8 in line".to_string()))
    }

    fn read_integer_line(&mut self) -> Result<i64> {
        self.read_line()?;
        parse_canonical_i64(&self.line).ok_or_else(|| {
            KvError::Protocol(format!(
                "invalid integer '{}'",
                String::from_utf8_lossy(&self.line)
            ))
        })
    }

    /// Read up to and including CRLF into `self.line`, without the CRLF
    fn read_line(&mut self) -> Result<()> {
        self.line.clear();
        let n = (&mut self.reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut self.line)?;
        self.consumed += n as u64;

        if self.line.last() != Some(&b'\n') {
            if n as u64 >= MAX_LINE_LEN {
                return Err(KvError::Protocol("line too long".to_string()));
            }
            return Err(self.unexpected_eof());
        }
        if !self.line.ends_with(b"\r\n") {
            return Err(KvError::Protocol("line not terminated by CRLF".to_string()));
        }

        self.line.truncate(self.line.len() - 2);
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.consumed += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(self.unexpected_eof()),
            Err(e) => Err(e.into()),
        }
    }

    fn unexpected_eof(&mut self) -> KvError {
        self.truncated = true;
        KvError::Protocol("unexpected end of stream inside a frame".to_string())
    }
}

/// Parse the integer forms `marshal` produces: `0` or `-?[1-9][0-9]*`.
///
/// Anything else (`+5`, `03`, `-0`, whitespace) is rejected so that every
/// accepted frame re-encodes to the exact bytes it was read from.
fn parse_canonical_i64(line: &[u8]) -> Option<i64> {
    let digits = line.strip_prefix(b"-").unwrap_or(line);
    match digits {
        [b'0'] if digits.len() == line.len() => {}
        [b'1'..=b'9', rest @ ..] if rest.iter().all(u8::is_ascii_digit) => {}
        _ => return None,
    }
    std::str::from_utf8(line).ok()?.parse().ok()
}

// =============================================================================
// Buffer helpers
// =============================================================================

/// Decode one frame from the front of `buf`
///
/// Returns the value and the number of bytes it occupied, or `None` if `buf`
/// holds only part of a frame.
pub fn decode(buf: &[u8]) -> Result<Option<(Value, usize)>> {
    let mut reader = RespReader::new(buf);
    match reader.read_value() {
        Ok(Some(value)) => Ok(Some((value, reader.bytes_consumed() as usize))),
        Ok(None) => Ok(None),
        Err(_) if reader.is_truncated() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a value to a stream and flush it
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    writer.write_all(&value.marshal())?;
    writer.flush()?;
    Ok(())
}
