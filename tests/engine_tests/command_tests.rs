//! Command Tests
//!
//! Tests for every command's replies and store effects.

use respkv::{Engine, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn run(engine: &Engine, parts: &[&str]) -> Value {
    engine.execute(&Value::request(parts))
}

fn bulks(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::bulk(s.to_string())).collect())
}

fn error_text(value: &Value) -> &str {
    match value {
        Value::Error(e) => e.as_str(),
        other => panic!("expected an error reply, got {:?}", other),
    }
}

// =============================================================================
// PING Tests
// =============================================================================

#[test]
fn test_ping() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["PING"]), Value::SimpleString("PONG".into()));
    assert_eq!(run(&engine, &["ping", "hello"]), Value::bulk("hello"));
    assert_eq!(&run(&engine, &["PING", "hi"]).marshal()[..], b"$2\r\nhi\r\n");
}

// =============================================================================
// Scalar Tests
// =============================================================================

#[test]
fn test_set_get() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["SET", "foo", "bar"]), Value::ok());
    assert_eq!(run(&engine, &["GET", "foo"]), Value::bulk("bar"));
    assert_eq!(run(&engine, &["GET", "missing"]), Value::null());
}

#[test]
fn test_set_overwrites() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "k", "v1"]);
    run(&engine, &["SET", "k", "v2"]);
    assert_eq!(run(&engine, &["GET", "k"]), Value::bulk("v2"));
}

#[test]
fn test_binary_safe_values() {
    let engine = Engine::in_memory();
    let value = Value::bulk(&b"a\r\nb\x00c"[..]);
    let request = Value::Array(vec![Value::bulk("SET"), Value::bulk("bin"), value.clone()]);

    assert_eq!(engine.execute(&request), Value::ok());
    assert_eq!(run(&engine, &["GET", "bin"]), value);
}

#[test]
fn test_append() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "greeting", "Hello"]);

    assert_eq!(run(&engine, &["APPEND", "greeting", " World"]), Value::Integer(11));
    assert_eq!(run(&engine, &["GET", "greeting"]), Value::bulk("Hello World"));
}

#[test]
fn test_append_absent_key_is_noop() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["APPEND", "nokey", "x"]), Value::Integer(0));
    assert_eq!(run(&engine, &["GET", "nokey"]), Value::null());
}

#[test]
fn test_incr_decr() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["INCR", "n"]), Value::Integer(1));
    assert_eq!(run(&engine, &["INCR", "n"]), Value::Integer(2));
    assert_eq!(run(&engine, &["DECR", "n"]), Value::Integer(1));
    assert_eq!(run(&engine, &["DECR", "fresh"]), Value::Integer(-1));
    assert_eq!(run(&engine, &["GET", "n"]), Value::bulk("1"));
}

#[test]
fn test_incr_on_existing_integer_string() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "n", "41"]);
    assert_eq!(run(&engine, &["INCR", "n"]), Value::Integer(42));
}

#[test]
fn test_incr_non_integer_is_error() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "s", "abc"]);

    let reply = run(&engine, &["INCR", "s"]);

    assert_eq!(error_text(&reply), "ERR value is not an integer or out of range");
    assert_eq!(run(&engine, &["GET", "s"]), Value::bulk("abc"));
}

#[test]
fn test_incr_overflow_is_error() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "n", i64::MAX.to_string().as_str()]);

    assert!(run(&engine, &["INCR", "n"]).is_error());
    assert_eq!(run(&engine, &["GET", "n"]), Value::bulk(i64::MAX.to_string()));
}

// =============================================================================
// Hash Tests
// =============================================================================

#[test]
fn test_hset_hget() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["HSET", "user", "name", "ann", "age", "30"]), Value::ok());

    assert_eq!(run(&engine, &["HGET", "user", "name"]), Value::bulk("ann"));
    assert_eq!(run(&engine, &["HGET", "user", "age"]), Value::bulk("30"));
    assert_eq!(run(&engine, &["HGET", "user", "email"]), Value::bulk(""));
    assert_eq!(run(&engine, &["HGET", "nobody", "name"]), Value::bulk(""));
}

#[test]
fn test_hget_missing_is_empty_bulk_on_the_wire() {
    let engine = Engine::in_memory();
    run(&engine, &["HSET", "h", "f", "v"]);

    assert_eq!(&run(&engine, &["HGET", "nokey", "f"]).marshal()[..], b"$0\r\n\r\n");
    assert_eq!(&run(&engine, &["HGET", "h", "other"]).marshal()[..], b"$0\r\n\r\n");
}

#[test]
fn test_hset_merges_fields() {
    let engine = Engine::in_memory();
    run(&engine, &["HSET", "h", "a", "1"]);
    run(&engine, &["HSET", "h", "a", "2", "b", "3"]);

    assert_eq!(run(&engine, &["HGET", "h", "a"]), Value::bulk("2"));
    assert_eq!(run(&engine, &["HGET", "h", "b"]), Value::bulk("3"));
}

#[test]
fn test_hgetall() {
    let engine = Engine::in_memory();
    run(&engine, &["HSET", "h", "a", "1", "b", "2"]);

    let reply = run(&engine, &["HGETALL", "h"]);
    let items = reply.as_array().unwrap();
    assert_eq!(items.len(), 4);

    // Field order is unspecified; collect the pairs
    let mut pairs: Vec<(Value, Value)> = items
        .chunks(2)
        .map(|p| (p[0].clone(), p[1].clone()))
        .collect();
    pairs.sort_by_key(|(f, _)| f.as_bytes().cloned());

    assert_eq!(
        pairs,
        vec![
            (Value::bulk("a"), Value::bulk("1")),
            (Value::bulk("b"), Value::bulk("2")),
        ]
    );
}

#[test]
fn test_hgetall_missing_is_empty_array() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["HGETALL", "missing"]), Value::Array(vec![]));
}

#[test]
fn test_hset_odd_pairs_is_error() {
    let engine = Engine::in_memory();

    let reply = run(&engine, &["HSET", "h", "a", "1", "b"]);

    assert_eq!(
        error_text(&reply),
        "ERR wrong number of arguments for 'hset' command"
    );
    assert_eq!(run(&engine, &["HGETALL", "h"]), Value::Array(vec![]));
}

// =============================================================================
// List Tests
// =============================================================================

#[test]
fn test_rpush_lrange() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["RPUSH", "l", "a", "b", "c"]), Value::Integer(3));
    assert_eq!(run(&engine, &["LRANGE", "l", "0", "-1"]), bulks(&["a", "b", "c"]));
}

#[test]
fn test_lpush_prepends_each_in_turn() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["LPUSH", "l", "a", "b", "c"]), Value::Integer(3));
    assert_eq!(run(&engine, &["LRANGE", "l", "0", "-1"]), bulks(&["c", "b", "a"]));
}

#[test]
fn test_lrange_negative_indexes() {
    let engine = Engine::in_memory();
    run(&engine, &["RPUSH", "l", "a", "b", "c", "d"]);

    assert_eq!(run(&engine, &["LRANGE", "l", "-2", "-1"]), bulks(&["c", "d"]));
    assert_eq!(run(&engine, &["LRANGE", "l", "-100", "100"]), bulks(&["a", "b", "c", "d"]));
    assert_eq!(run(&engine, &["LRANGE", "l", "2", "1"]), bulks(&[]));
    assert_eq!(run(&engine, &["LRANGE", "missing", "0", "-1"]), bulks(&[]));
}

#[test]
fn test_lrange_non_integer_index_is_error() {
    let engine = Engine::in_memory();
    run(&engine, &["RPUSH", "l", "a"]);

    assert!(run(&engine, &["LRANGE", "l", "zero", "-1"]).is_error());
}

#[test]
fn test_lpop_rpop() {
    let engine = Engine::in_memory();
    run(&engine, &["RPUSH", "l", "a", "b", "c"]);

    assert_eq!(run(&engine, &["LPOP", "l"]), Value::bulk("a"));
    assert_eq!(run(&engine, &["RPOP", "l"]), Value::bulk("c"));
    assert_eq!(run(&engine, &["RPOP", "l"]), Value::bulk("b"));
    assert_eq!(run(&engine, &["LPOP", "l"]), Value::null());
    assert_eq!(run(&engine, &["RPOP", "never"]), Value::null());
}

// =============================================================================
// DEL Tests
// =============================================================================

#[test]
fn test_del() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "a", "1"]);
    run(&engine, &["SET", "b", "2"]);

    assert_eq!(run(&engine, &["DEL", "a", "b", "missing"]), Value::ok());
    assert_eq!(run(&engine, &["GET", "a"]), Value::null());
    assert_eq!(run(&engine, &["GET", "b"]), Value::null());
}

#[test]
fn test_del_missing_is_ok() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["DEL", "missing"]), Value::ok());
}

#[test]
fn test_del_clears_every_namespace() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "k", "v"]);
    run(&engine, &["HSET", "k", "f", "v"]);
    run(&engine, &["RPUSH", "k", "x"]);

    run(&engine, &["DEL", "k"]);

    assert_eq!(run(&engine, &["GET", "k"]), Value::null());
    assert_eq!(run(&engine, &["HGETALL", "k"]), Value::Array(vec![]));
    assert_eq!(run(&engine, &["LRANGE", "k", "0", "-1"]), bulks(&[]));
}

// =============================================================================
// Namespace Tests
// =============================================================================

#[test]
fn test_same_key_in_each_namespace() {
    let engine = Engine::in_memory();
    run(&engine, &["SET", "k", "scalar"]);
    run(&engine, &["HSET", "k", "f", "field"]);
    run(&engine, &["RPUSH", "k", "item"]);

    assert_eq!(run(&engine, &["GET", "k"]), Value::bulk("scalar"));
    assert_eq!(run(&engine, &["HGET", "k", "f"]), Value::bulk("field"));
    assert_eq!(run(&engine, &["LRANGE", "k", "0", "-1"]), bulks(&["item"]));
}

// =============================================================================
// Dispatch Error Tests
// =============================================================================

#[test]
fn test_unknown_command() {
    let engine = Engine::in_memory();
    let reply = run(&engine, &["FLUSHALL"]);
    assert_eq!(error_text(&reply), "ERR unknown command 'FLUSHALL'");
}

#[test]
fn test_command_names_are_case_insensitive() {
    let engine = Engine::in_memory();
    assert_eq!(run(&engine, &["set", "k", "v"]), Value::ok());
    assert_eq!(run(&engine, &["GeT", "k"]), Value::bulk("v"));
}

#[test]
fn test_wrong_arity() {
    let engine = Engine::in_memory();
    let cases: [(&[&str], &str); 6] = [
        (&["GET"], "get"),
        (&["SET", "k"], "set"),
        (&["SET", "k", "v", "extra"], "set"),
        (&["HGET", "h"], "hget"),
        (&["LPUSH", "l"], "lpush"),
        (&["LRANGE", "l", "0"], "lrange"),
    ];

    for (request, name) in cases {
        let reply = run(&engine, request);
        assert_eq!(
            error_text(&reply),
            format!("ERR wrong number of arguments for '{}' command", name)
        );
    }
    assert!(engine.snapshot().is_empty());
}

#[test]
fn test_malformed_requests() {
    let engine = Engine::in_memory();

    assert!(engine.execute(&Value::Array(vec![])).is_error());
    assert!(engine.execute(&Value::bulk("GET")).is_error());
    assert!(engine
        .execute(&Value::Array(vec![Value::bulk("GET"), Value::Integer(1)]))
        .is_error());
    assert!(engine
        .execute(&Value::Array(vec![Value::bulk("GET"), Value::null()]))
        .is_error());
}
