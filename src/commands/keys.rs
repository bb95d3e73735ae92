//! Connection and keyspace commands: PING, DEL

use bytes::Bytes;

use crate::error::CommandError;
use crate::protocol::Value;
use crate::store::Namespaces;

/// PING [message]
pub fn ping(_ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    match args.first() {
        Some(message) => Ok(Value::bulk(message.clone())),
        None => Ok(Value::SimpleString("PONG".to_string())),
    }
}

/// DEL key [key ...]
///
/// Removes each key from every namespace. Absent keys are not an error.
pub fn del(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let removed = args.iter().filter(|key| ns.delete(key)).count();
    tracing::trace!(requested = args.len(), removed, "DEL");
    Ok(Value::ok())
}
