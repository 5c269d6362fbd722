//! netsortd — one node of a distributed shuffle-sort.
//!
//! Every node is started with the same topology file and its own id. The
//! process exits 0 once its output shard is written, 1 on any failure
//! during the run, and 2 on bad arguments.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use netsort_core::config::NetsortConfig;
use netsort_core::ClusterTopology;
use netsort_shuffle::NodeSession;

const USAGE: &str = "usage: netsortd <node-id> <input-shard> <output-shard> <topology.yaml>";

#[derive(Debug)]
struct Args {
    node_id: usize,
    input: PathBuf,
    output: PathBuf,
    topology: PathBuf,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let [node_id, input, output, topology] = args else {
        bail!("expected 4 arguments, got {}", args.len());
    };
    let node_id = node_id
        .parse()
        .with_context(|| format!("invalid node id {node_id:?}, must be a non-negative integer"))?;
    Ok(Args {
        node_id,
        input: PathBuf::from(input),
        output: PathBuf::from(output),
        topology: PathBuf::from(topology),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e:#}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("netsortd failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let topology = ClusterTopology::load(&args.topology).context("config phase failed")?;

    let config = NetsortConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        NetsortConfig::default()
    });

    let session = NodeSession::new(args.node_id, topology, config)
        .map_err(anyhow::Error::new)
        .context("config phase failed")?;

    let report = session
        .run(&args.input, &args.output)
        .await
        .map_err(|e| {
            let phase = e.phase();
            anyhow::Error::new(e).context(format!("{phase} phase failed"))
        })?;

    tracing::info!(
        node = report.node,
        sent = ?report.sent_per_peer,
        received = ?report.received_per_stream,
        written = report.records_written,
        output = %args.output.display(),
        "done"
    );
    Ok(())
}
