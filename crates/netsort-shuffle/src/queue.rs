//! Inbound record queues — one per inbound connection.
//!
//! Single producer (the receiver task for that connection), single consumer
//! (the collector). The queue has an explicit terminal state: the writer
//! calls [`QueueWriter::finish`] after the end-of-stream frame, which marks
//! the queue done and closes it. A reader that sees the queue close without
//! that mark knows the stream was cut short and reports it, rather than
//! mistaking a dead peer for an empty partition.
//!
//! Queues are unbounded. A receiver must never stop draining its socket
//! while this node is still writing to the same peer, or two nodes writing
//! to each other can wedge on full TCP buffers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use netsort_core::Record;

use crate::error::ShuffleError;

/// Create a connected writer/reader pair for inbound stream `stream`.
pub fn inbound(stream: usize) -> (QueueWriter, QueueReader) {
    let (tx, rx) = mpsc::unbounded_channel();
    let done = Arc::new(AtomicBool::new(false));
    (
        QueueWriter {
            stream,
            tx,
            done: done.clone(),
        },
        QueueReader { stream, rx, done },
    )
}

/// Write end, owned by the receiver task until the stream is done.
#[derive(Debug)]
pub struct QueueWriter {
    stream: usize,
    tx: mpsc::UnboundedSender<Record>,
    done: Arc<AtomicBool>,
}

impl QueueWriter {
    pub fn push(&self, record: Record) -> Result<(), ShuffleError> {
        self.tx
            .send(record)
            .map_err(|_| ShuffleError::QueueClosed(self.stream))
    }

    /// Mark the queue done and close it. Consumes the writer, so nothing
    /// can be pushed after the end-of-stream marker.
    pub fn finish(self) {
        // Set before the sender drops: the reader only checks the flag
        // after observing the close.
        self.done.store(true, Ordering::Release);
    }
}

/// Read end, owned by the collector.
#[derive(Debug)]
pub struct QueueReader {
    stream: usize,
    rx: mpsc::UnboundedReceiver<Record>,
    done: Arc<AtomicBool>,
}

impl QueueReader {
    /// Next buffered record, waiting if the queue is still open.
    /// None once the queue is closed and empty.
    pub async fn next(&mut self) -> Option<Record> {
        self.rx.recv().await
    }

    /// Whether the writer reached end-of-stream.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Move every record into `out`, waiting for the queue to close.
    /// Fails if it closed without end-of-stream.
    pub async fn drain_into(&mut self, out: &mut Vec<Record>) -> Result<u64, ShuffleError> {
        let mut drained = 0u64;
        while let Some(record) = self.next().await {
            out.push(record);
            drained += 1;
        }
        if !self.is_done() {
            return Err(ShuffleError::PeerAborted(self.stream));
        }
        Ok(drained)
    }
}
