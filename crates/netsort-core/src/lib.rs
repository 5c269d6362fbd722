//! netsort-core — shared types for the distributed shuffle-sort.
//! Record layout, wire framing, partitioning, topology and tuning config.
//! Nothing in here touches a socket.

pub mod config;
pub mod partition;
pub mod record;
pub mod topology;
pub mod wire;

pub use partition::Partitioner;
pub use record::{compare_keys, Key, Record, KEY_SIZE, RECORD_SIZE, VALUE_SIZE};
pub use topology::{ClusterTopology, PeerDescriptor};
pub use wire::{Control, Frame, FRAME_SIZE};
