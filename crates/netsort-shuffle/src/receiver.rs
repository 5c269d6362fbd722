//! Shuffle receiver — one task per inbound connection.
//!
//! Reads 101-byte frames until the end-of-stream marker, pushing each data
//! record onto the connection's inbound queue. The connection is a single
//! ordered stream, so nothing read after the marker can be data for this
//! shuffle; the loop stops reading as soon as it sees it.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use netsort_core::wire::{self, Control, FRAME_SIZE};

use crate::error::ShuffleError;
use crate::queue::QueueWriter;

/// Where a receiver is in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Decoding data frames.
    Reading,
    /// End-of-stream seen; closing the queue.
    Draining,
    /// Queue closed, nothing more will arrive.
    Done,
}

/// Run until end-of-stream. Returns the number of data records received.
///
/// Any read, decode or timeout error is returned as-is; the caller treats
/// it as fatal.
pub async fn receive_loop<R>(
    mut stream: R,
    stream_index: usize,
    queue: QueueWriter,
    read_timeout: Option<Duration>,
) -> Result<u64, ShuffleError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; FRAME_SIZE];
    let mut received = 0u64;
    let mut state = ReceiverState::Reading;
    let mut queue = Some(queue);

    while state != ReceiverState::Done {
        match state {
            ReceiverState::Reading => {
                read_frame(&mut stream, &mut buf, stream_index, read_timeout).await?;

                let (control, record) = wire::decode(&buf).map_err(|source| {
                    ShuffleError::Decode {
                        stream: stream_index,
                        source,
                    }
                })?;

                match control {
                    Control::Data => {
                        if let Some(q) = queue.as_ref() {
                            q.push(record)?;
                        }
                        received += 1;
                    }
                    Control::EndOfStream => {
                        tracing::debug!(stream = stream_index, received, "end-of-stream received");
                        state = ReceiverState::Draining;
                    }
                }
            }
            ReceiverState::Draining => {
                if let Some(q) = queue.take() {
                    q.finish();
                }
                state = ReceiverState::Done;
            }
            ReceiverState::Done => {}
        }
    }

    tracing::info!(stream = stream_index, received, "inbound stream drained");
    Ok(received)
}

/// Fill `buf` completely, looping over short reads.
async fn read_frame<R>(
    stream: &mut R,
    buf: &mut [u8; FRAME_SIZE],
    stream_index: usize,
    read_timeout: Option<Duration>,
) -> Result<(), ShuffleError>
where
    R: AsyncRead + Unpin,
{
    let result = match read_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.read_exact(buf)).await {
            Ok(r) => r,
            Err(_) => {
                return Err(ShuffleError::ReadTimeout {
                    stream: stream_index,
                    secs: limit.as_secs(),
                })
            }
        },
        None => stream.read_exact(buf).await,
    };

    match result {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ShuffleError::Truncated {
                stream: stream_index,
            })
        }
        Err(source) => Err(ShuffleError::Read {
            stream: stream_index,
            source,
        }),
    }
}
