use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::Level;

use crate::error::IndexError;
use crate::ops;

//-------------------------------------------------------------------------

const USAGE: &str = "Usage: <program> <indexfile> <command> [args...]\n\
commands: create | insert <key> <value> | search <key> | load <csvfile> | print | extract <outfile>";

/// Parsed command line, with verbosity flags already stripped out.
struct Invocation {
    level: Level,
    index_path: PathBuf,
    command: String,
    args: Vec<String>,
}

fn parse_args(raw: impl Iterator<Item = String>) -> Result<Invocation> {
    let mut level = Level::WARN;
    let mut positional = Vec::new();

    for arg in raw {
        match arg.as_str() {
            "-v" => level = Level::INFO,
            "-vv" => level = Level::DEBUG,
            "-vvv" => level = Level::TRACE,
            _ => positional.push(arg),
        }
    }

    if positional.len() < 2 {
        return Err(IndexError::MalformedCommand(USAGE.to_string()).into());
    }

    let index_path = PathBuf::from(&positional[0]);
    let command = positional[1].clone();
    let args = positional[2..].to_vec();

    Ok(Invocation {
        level,
        index_path,
        command,
        args,
    })
}

fn parse_u64(arg: &str) -> Result<u64> {
    arg.parse()
        .map_err(|_| IndexError::ParseFailure(arg.to_string()).into())
}

/// Runs one command, writing command output to `out`. Returns the process
/// exit code (0 on success).
pub fn run(raw_args: impl Iterator<Item = String>, out: &mut dyn Write) -> i32 {
    let invocation = match parse_args(raw_args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{e}");
            return 2;
        }
    };

    install_tracing(invocation.level);

    let result = dispatch(&invocation, out);
    match result {
        Ok(()) => 0,
        Err(e) => {
            if let Some(IndexError::KeyNotFound(_)) = e.downcast_ref::<IndexError>() {
                let _ = writeln!(out, "Error: Key not found");
            } else {
                eprintln!("{e}");
            }
            1
        }
    }
}

fn dispatch(inv: &Invocation, out: &mut dyn Write) -> Result<()> {
    match (inv.command.as_str(), inv.args.as_slice()) {
        ("create", []) => ops::create(&inv.index_path),
        ("insert", [key, value]) => {
            ops::insert(&inv.index_path, parse_u64(key)?, parse_u64(value)?)
        }
        ("search", [key]) => ops::search(&inv.index_path, parse_u64(key)?, out),
        ("load", [csv_path]) => ops::load(&inv.index_path, &PathBuf::from(csv_path)),
        ("print", []) => ops::print_all(&inv.index_path, out),
        ("extract", [out_path]) => ops::extract(&inv.index_path, &PathBuf::from(out_path)),
        (other, _) => Err(IndexError::MalformedCommand(format!(
            "unknown or malformed command: {other}\n{USAGE}"
        ))
        .into()),
    }
}

fn install_tracing(level: Level) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    // Only the binary entry point installs a subscriber, and it does so
    // once; ignore the (impossible, in practice) double-init error rather
    // than panic on it.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
