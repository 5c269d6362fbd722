//! netsort-ctl — operator tooling for netsort shards.
//!
//! Everything here works on local files; nothing talks to a running node.

mod cmd;

use std::path::Path;

use anyhow::{Context, Result};

fn print_usage() {
    println!("Usage: netsort-ctl <command> [args...]");
    println!();
    println!("Commands:");
    println!("  generate <path> <count> [seed]          Write <count> random records");
    println!("  show <path> [limit]                     List record keys in hex");
    println!("  split <input> <out-dir> <n>             Deal a file into <n> input shards");
    println!("  sort <input> <output>                   Sort a file locally");
    println!("  verify <path> <node-id> <topology.yaml> Check an output shard");
    println!("  config                                  Print the effective node config");
}

fn parse<T: std::str::FromStr>(what: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid {what}: {value:?}"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["generate", path, count] => {
            cmd::generate::cmd_generate(Path::new(path), parse("count", count)?, None)
        }
        ["generate", path, count, seed] => cmd::generate::cmd_generate(
            Path::new(path),
            parse("count", count)?,
            Some(parse("seed", seed)?),
        ),
        ["show", path] => cmd::show::cmd_show(Path::new(path), None),
        ["show", path, limit] => cmd::show::cmd_show(Path::new(path), Some(parse("limit", limit)?)),
        ["split", input, dir, n] => {
            cmd::split::cmd_split(Path::new(input), Path::new(dir), parse("shard count", n)?)
        }
        ["sort", input, output] => cmd::sort::cmd_sort(Path::new(input), Path::new(output)),
        ["verify", path, node, topology] => cmd::verify::cmd_verify(
            Path::new(path),
            parse("node id", node)?,
            Path::new(topology),
        ),
        ["config"] => cmd::config::cmd_config(),
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    }
}
