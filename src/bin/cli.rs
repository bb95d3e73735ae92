//! respkv CLI Client
//!
//! Command-line interface for interacting with respkv.
//!
//! ```text
//! respkv-cli SET foo bar
//! respkv-cli --server 127.0.0.1:7000 LRANGE mylist 0 -1
//! ```

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::Parser;
use respkv::protocol::{write_value, RespReader};
use respkv::{KvError, Value};

/// respkv CLI
#[derive(Parser, Debug)]
#[command(name = "respkv-cli")]
#[command(about = "CLI for the respkv key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Command and its arguments, e.g. `SET key value`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(reply) => {
            print!("{}", format_reply(&reply, 0));
            if reply.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Could not talk to {}: {}", args.server, e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Value, KvError> {
    let stream = TcpStream::connect(&args.server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = RespReader::new(BufReader::new(stream));

    let parts: Vec<&str> = args.command.iter().map(String::as_str).collect();
    write_value(&mut writer, &Value::request(&parts))?;

    reader
        .read_value()?
        .ok_or_else(|| KvError::Network("server closed the connection".to_string()))
}

/// Render a reply the way redis-cli does
fn format_reply(value: &Value, indent: usize) -> String {
    match value {
        Value::SimpleString(s) => format!("{}\n", s),
        Value::Error(e) => format!("(error) {}\n", e),
        Value::Integer(n) => format!("(integer) {}\n", n),
        Value::BulkString(None) => "(nil)\n".to_string(),
        Value::BulkString(Some(b)) => format!("{:?}\n", String::from_utf8_lossy(b)),
        Value::Array(items) if items.is_empty() => "(empty array)\n".to_string(),
        Value::Array(items) => {
            let width = items.len().to_string().len();
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(&" ".repeat(indent));
                }
                let label = format!("{:>width$}) ", i + 1, width = width);
                out.push_str(&label);
                out.push_str(&format_reply(item, indent + label.len()));
            }
            out
        }
    }
}
