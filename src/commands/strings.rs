//! Scalar commands: SET, GET, APPEND, INCR, DECR

use bytes::Bytes;

use crate::error::CommandError;
use crate::protocol::Value;
use crate::store::Namespaces;

/// SET key value
pub fn set(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    ns.set(args[0].clone(), args[1].clone());
    Ok(Value::ok())
}

/// GET key
pub fn get(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    Ok(Value::BulkString(ns.get(&args[0]).cloned()))
}

/// APPEND key value
///
/// Replies with the new length. An absent key is left absent and the reply
/// is 0.
pub fn append(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let len = ns.append(&args[0], &args[1]).unwrap_or(0);
    Ok(Value::Integer(len as i64))
}

/// INCR key
pub fn incr(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    ns.incr_by(&args[0], 1).map(Value::Integer)
}

/// DECR key
pub fn decr(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    ns.incr_by(&args[0], -1).map(Value::Integer)
}
