//! Mesh connection manager.
//!
//! Every ordered pair of nodes gets its own TCP stream: each node accepts
//! `n - 1` inbound streams (one per peer, data flowing in) and dials `n - 1`
//! outbound streams (data flowing out). Inbound streams carry no handshake,
//! so they are identified only by accept order.
//!
//! The listener is bound before any dialing starts. Dialing retries on a
//! fixed backoff until the peer is listening, which absorbs start-up skew
//! between nodes without any settle delay.

use std::net::SocketAddr;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use zerocopy::AsBytes;

use netsort_core::config::NetsortConfig;
use netsort_core::wire::Frame;
use netsort_core::{ClusterTopology, PeerDescriptor};

use crate::error::ShuffleError;
use crate::queue::{self, QueueReader};
use crate::receiver::receive_loop;

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Bind this node's listening socket.
pub async fn bind(peer: &PeerDescriptor) -> Result<TcpListener, ShuffleError> {
    let addr = peer.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ShuffleError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(node = peer.node_id, %addr, "listening");
    Ok(listener)
}

/// One accepted connection: its queue and the receiver task filling it.
#[derive(Debug)]
pub struct InboundStream {
    pub index: usize,
    pub peer_addr: SocketAddr,
    pub queue: QueueReader,
    pub task: JoinHandle<Result<u64, ShuffleError>>,
}

/// Accepts exactly `expected` connections and spawns a receiver for each.
pub struct Acceptor {
    listener: TcpListener,
    expected: usize,
    read_timeout: Option<Duration>,
}

impl Acceptor {
    pub fn new(listener: TcpListener, expected: usize, read_timeout: Option<Duration>) -> Self {
        Self {
            listener,
            expected,
            read_timeout,
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<Vec<InboundStream>, ShuffleError>> {
        tokio::spawn(self.run())
    }

    /// Returns once every expected peer has connected. The listener is
    /// dropped on return, so a surplus connection attempt is refused.
    pub async fn run(self) -> Result<Vec<InboundStream>, ShuffleError> {
        let mut inbound = Vec::with_capacity(self.expected);

        while inbound.len() < self.expected {
            let (stream, peer_addr) = self.listener.accept().await.map_err(ShuffleError::Accept)?;
            let index = inbound.len();
            tracing::info!(stream = index, %peer_addr, "inbound stream accepted");

            let (writer, reader) = queue::inbound(index);
            let task = tokio::spawn(receive_loop(stream, index, writer, self.read_timeout));

            inbound.push(InboundStream {
                index,
                peer_addr,
                queue: reader,
                task,
            });
        }

        tracing::debug!(accepted = inbound.len(), "acceptor done");
        Ok(inbound)
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Dial policy: fixed backoff between attempts, capped attempt count.
#[derive(Debug, Clone)]
pub struct Dialer {
    backoff: Duration,
    max_attempts: u32,
    nodelay: bool,
    buffer_bytes: usize,
}

impl Dialer {
    pub fn new(backoff: Duration, max_attempts: u32, nodelay: bool, buffer_bytes: usize) -> Self {
        Self {
            backoff,
            max_attempts,
            nodelay,
            buffer_bytes,
        }
    }

    pub fn from_config(config: &NetsortConfig) -> Self {
        Self::new(
            config.network.dial_backoff(),
            config.network.max_dial_attempts,
            config.network.nodelay,
            config.io.write_buffer_bytes,
        )
    }

    /// Connect to `peer`, retrying until it accepts or attempts run out.
    pub async fn dial(&self, peer: &PeerDescriptor) -> Result<OutboundStream, ShuffleError> {
        let addr = peer.addr();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    if self.nodelay {
                        stream
                            .set_nodelay(true)
                            .map_err(|source| ShuffleError::Dial {
                                node: peer.node_id,
                                addr: addr.clone(),
                                attempts: attempt,
                                source,
                            })?;
                    }
                    tracing::info!(peer = peer.node_id, %addr, attempt, "outbound stream connected");
                    return Ok(OutboundStream {
                        node: peer.node_id,
                        writer: BufWriter::with_capacity(self.buffer_bytes, stream),
                        frames_sent: 0,
                    });
                }
                Err(source) => {
                    if self.max_attempts != 0 && attempt >= self.max_attempts {
                        return Err(ShuffleError::Dial {
                            node: peer.node_id,
                            addr,
                            attempts: attempt,
                            source,
                        });
                    }
                    tracing::debug!(peer = peer.node_id, %addr, attempt, error = %source, "dial failed, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
    }
}

/// Write half of the mesh towards one peer.
#[derive(Debug)]
pub struct OutboundStream {
    node: usize,
    writer: BufWriter<TcpStream>,
    frames_sent: u64,
}

impl OutboundStream {
    pub fn node(&self) -> usize {
        self.node
    }

    pub async fn send(&mut self, frame: &Frame) -> Result<(), ShuffleError> {
        self.write(frame).await?;
        self.frames_sent += 1;
        Ok(())
    }

    /// Write the end-of-stream marker, flush, and shut down the write side.
    /// The peer sees every buffered frame before the close.
    pub async fn finish(mut self) -> Result<u64, ShuffleError> {
        self.write(&Frame::end_of_stream()).await?;
        let node = self.node;
        self.writer
            .shutdown()
            .await
            .map_err(|source| ShuffleError::Write { node, source })?;
        Ok(self.frames_sent)
    }

    async fn write(&mut self, frame: &Frame) -> Result<(), ShuffleError> {
        let node = self.node;
        self.writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|source| ShuffleError::Write { node, source })
    }
}

/// Outbound streams indexed by node id. Owned by the sender; the slot for
/// this node stays empty.
pub struct OutboundTable {
    self_id: usize,
    topology: ClusterTopology,
    dialer: Dialer,
    streams: Vec<Option<OutboundStream>>,
}

impl OutboundTable {
    pub fn new(self_id: usize, topology: ClusterTopology, dialer: Dialer) -> Self {
        let streams = (0..topology.len()).map(|_| None).collect();
        Self {
            self_id,
            topology,
            dialer,
            streams,
        }
    }

    /// Dial every other node concurrently. Returns once all are connected.
    pub async fn connect_all(&mut self) -> Result<(), ShuffleError> {
        let dialer = &self.dialer;
        let connected = try_join_all(
            self.topology
                .others(self.self_id)
                .map(|peer| dialer.dial(peer)),
        )
        .await?;

        for stream in connected {
            let node = stream.node();
            self.streams[node] = Some(stream);
        }
        tracing::info!(peers = self.topology.len() - 1, "mesh outbound connected");
        Ok(())
    }

    /// Stream to `node`, dialing it first if mesh setup did not.
    pub async fn stream_for(&mut self, node: usize) -> Result<&mut OutboundStream, ShuffleError> {
        let unknown = ShuffleError::UnknownNode {
            node,
            n_servers: self.topology.len(),
        };
        if node == self.self_id {
            return Err(unknown);
        }
        let peer = self.topology.peer(node).ok_or(unknown)?;
        let slot = &mut self.streams[node];
        if slot.is_none() {
            tracing::warn!(peer = node, "no pre-opened stream, dialing lazily");
            *slot = Some(self.dialer.dial(peer).await?);
        }
        slot.as_mut().ok_or(ShuffleError::UnknownNode {
            node,
            n_servers: self.topology.len(),
        })
    }

    /// Send end-of-stream on every outbound stream, including ones that
    /// never carried data. Returns data frames sent, indexed by node id.
    pub async fn finish_all(mut self) -> Result<Vec<u64>, ShuffleError> {
        let mut sent = vec![0u64; self.topology.len()];
        let others: Vec<usize> = self.topology.others(self.self_id).map(|p| p.node_id).collect();

        for node in others {
            self.stream_for(node).await?;
            if let Some(stream) = self.streams[node].take() {
                sent[node] = stream.finish().await?;
                tracing::debug!(peer = node, frames = sent[node], "outbound stream finished");
            }
        }
        Ok(sent)
    }
}
