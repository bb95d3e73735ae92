//! Protocol Module
//!
//! RESP2, the Redis serialization protocol, as spoken on the wire and as
//! stored in the append-only log.
//!
//! ## Frame Types
//! - `+` simple string
//! - `-` error
//! - `:` integer
//! - `$` bulk string (binary safe, `$-1` is null)
//! - `*` array
//!
//! ## Requests
//! A client request is always an array of bulk strings whose first element
//! is the command name.

mod codec;
mod value;

pub use codec::{
    decode, write_value, RespReader, MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH, MAX_LINE_LEN,
};
pub use value::Value;
