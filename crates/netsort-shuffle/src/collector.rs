//! Collector — gathers this node's partition, sorts it, writes it out.
//!
//! The collector waits for every receiver to reach end-of-stream before
//! touching the queues: a partial drain would sort an incomplete partition.
//! The first receiver failure aborts the wait.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tokio::io::{AsyncWriteExt, BufWriter};
use zerocopy::AsBytes;

use netsort_core::Record;

use crate::error::ShuffleError;
use crate::mesh::InboundStream;

/// Combine locally-owned records with everything received.
///
/// Returns the unsorted partition and the record count per inbound stream.
pub async fn collect(
    mut local: Vec<Record>,
    inbound: Vec<InboundStream>,
) -> Result<(Vec<Record>, Vec<u64>), ShuffleError> {
    let mut queues = Vec::with_capacity(inbound.len());
    let mut tasks = Vec::with_capacity(inbound.len());
    for stream in inbound {
        queues.push((stream.index, stream.peer_addr, stream.queue));
        tasks.push(stream.task);
    }

    let reported = try_join_all(
        tasks
            .into_iter()
            .map(|task| async move { task.await.map_err(ShuffleError::Join).and_then(|r| r) }),
    )
    .await?;

    let mut received = Vec::with_capacity(queues.len());
    for ((index, peer_addr, mut queue), expected) in queues.into_iter().zip(reported) {
        let n = queue.drain_into(&mut local).await?;
        debug_assert_eq!(n, expected, "stream {index}");
        tracing::debug!(stream = index, %peer_addr, records = n, "inbound queue drained");
        received.push(n);
    }

    tracing::debug!(
        streams = received.len(),
        total = local.len(),
        "partition collected"
    );
    Ok((local, received))
}

/// Sort by key, byte-wise unsigned. Stable: equal keys keep arrival order.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(Record::cmp_key);
}

/// Write `records` to `path` as consecutive 100-byte records.
///
/// Data goes to `<path>.partial` first and is renamed into place only once
/// fully flushed; on failure the partial file is removed.
pub async fn emit(path: &Path, records: &[Record], buffer_bytes: usize) -> Result<u64, ShuffleError> {
    let partial = partial_path(path);

    match write_records(&partial, records, buffer_bytes).await {
        Ok(()) => {}
        Err(source) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(ShuffleError::Output {
                path: partial,
                source,
            });
        }
    }

    if let Err(source) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(ShuffleError::Output {
            path: path.to_path_buf(),
            source,
        });
    }

    tracing::info!(path = %path.display(), records = records.len(), "output shard written");
    Ok(records.len() as u64)
}

async fn write_records(
    path: &Path,
    records: &[Record],
    buffer_bytes: usize,
) -> std::io::Result<()> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::with_capacity(buffer_bytes, file);
    writer.write_all(records.as_bytes()).await?;
    writer.flush().await?;
    writer.get_ref().sync_all().await?;
    Ok(())
}

/// `<path>.partial`, alongside the final output.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}
