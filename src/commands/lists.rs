//! List commands: LPUSH, RPUSH, LPOP, RPOP, LRANGE

use bytes::Bytes;

use super::parse_int;
use crate::error::CommandError;
use crate::protocol::Value;
use crate::store::Namespaces;

/// LPUSH key value [value ...]
///
/// Values are pushed one after another, so `LPUSH l a b c` leaves `[c, b, a]`.
pub fn lpush(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let len = ns.push_front(args[0].clone(), args[1..].iter().cloned());
    Ok(Value::Integer(len as i64))
}

/// RPUSH key value [value ...]
pub fn rpush(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let len = ns.push_back(args[0].clone(), args[1..].iter().cloned());
    Ok(Value::Integer(len as i64))
}

/// LPOP key
pub fn lpop(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    Ok(Value::BulkString(ns.pop_front(&args[0])))
}

/// RPOP key
pub fn rpop(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    Ok(Value::BulkString(ns.pop_back(&args[0])))
}

/// LRANGE key start stop
pub fn lrange(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let start = parse_int(&args[1])?;
    let stop = parse_int(&args[2])?;

    let items = ns
        .range(&args[0], start, stop)
        .into_iter()
        .map(Value::bulk)
        .collect();
    Ok(Value::Array(items))
}
