//! Protocol values
//!
//! One variant per RESP2 type, each carrying only its own payload.

use bytes::{BufMut, Bytes, BytesMut};

/// A single RESP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `+<text>\r\n`
    SimpleString(String),

    /// `-<text>\r\n`
    Error(String),

    /// `:<n>\r\n`
    Integer(i64),

    /// `$<n>\r\n<bytes>\r\n`, or `$-1\r\n` when `None`
    BulkString(Option<Bytes>),

    /// `*<n>\r\n` followed by `n` frames
    Array(Vec<Value>),
}

impl Value {
    /// `+OK`
    pub fn ok() -> Self {
        Value::SimpleString("OK".to_string())
    }

    /// The null bulk string
    pub fn null() -> Self {
        Value::BulkString(None)
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Value::BulkString(Some(data.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    /// Build a client request: an array of bulk strings
    pub fn request(parts: &[&str]) -> Self {
        Value::Array(
            parts
                .iter()
                .map(|p| Value::bulk(Bytes::copy_from_slice(p.as_bytes())))
                .collect(),
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::BulkString(None))
    }

    /// Payload of a non-null bulk string
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Exact number of bytes `encode` will write
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::SimpleString(s) | Value::Error(s) => 1 + s.len() + 2,
            Value::Integer(n) => 1 + n.to_string().len() + 2,
            Value::BulkString(None) => 5,
            Value::BulkString(Some(b)) => 1 + b.len().to_string().len() + 2 + b.len() + 2,
            Value::Array(items) => {
                1 + items.len().to_string().len()
                    + 2
                    + items.iter().map(Value::encoded_len).sum::<usize>()
            }
        }
    }

    /// Append the wire encoding of this value to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Value::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Value::Error(s) => {
                buf.put_u8(b'-');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Value::Integer(n) => {
                buf.put_u8(b':');
                buf.put_slice(n.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            Value::BulkString(None) => buf.put_slice(b"$-1\r\n"),
            Value::BulkString(Some(data)) => {
                buf.put_u8(b'$');
                buf.put_slice(data.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            Value::Array(items) => {
                buf.put_u8(b'*');
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(b"\r\n");
                for item in items {
                    item.encode(buf);
                }
            }
        }
    }

    /// Wire encoding of this value
    pub fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::BulkString(Some(b))
    }
}

impl From<Option<Bytes>> for Value {
    fn from(b: Option<Bytes>) -> Self {
        Value::BulkString(b)
    }
}
