//! netsort-shuffle — the mesh shuffle-sort engine.
//!
//! Each node binds its listener, dials every peer, streams its input shard
//! out to the owning nodes, collects what the peers stream back, sorts and
//! writes its output shard. [`NodeSession`] drives one node end to end.

pub mod collector;
pub mod error;
pub mod mesh;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod session;

pub use error::ShuffleError;
pub use session::{NodeReport, NodeSession};
