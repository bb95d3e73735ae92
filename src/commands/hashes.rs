//! Hash commands: HSET, HGET, HGETALL

use bytes::Bytes;

use crate::error::CommandError;
use crate::protocol::Value;
use crate::store::Namespaces;

/// HSET key field value [field value ...]
pub fn hset(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let pairs = &args[1..];
    if pairs.len() % 2 != 0 {
        return Err(CommandError::WrongArity("hset".to_string()));
    }

    ns.hset(
        args[0].clone(),
        pairs.chunks_exact(2).map(|p| (p[0].clone(), p[1].clone())),
    );
    Ok(Value::ok())
}

/// HGET key field
///
/// A missing key or field replies with an empty bulk string, not null.
pub fn hget(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let value = ns.hget(&args[0], &args[1]).cloned().unwrap_or_default();
    Ok(Value::bulk(value))
}

/// HGETALL key
///
/// Flattened `[field, value, ...]`; an empty array when the key is absent.
pub fn hgetall(ns: &mut Namespaces, args: &[Bytes]) -> Result<Value, CommandError> {
    let items = match ns.hash(&args[0]) {
        Some(hash) => hash
            .iter()
            .flat_map(|(field, value)| [Value::bulk(field.clone()), Value::bulk(value.clone())])
            .collect(),
        None => Vec::new(),
    };
    Ok(Value::Array(items))
}
