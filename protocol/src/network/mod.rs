//! # Network Module
//!
//! Everything the client exchanges with peers, minus the transport.
//!
//! ## Architecture
//!
//! ```text
//! gossip.rs  GossipTopic, GossipMessage, the Network seam, LoopbackNetwork
//! sync.rs    ChainSync: block store, orphan buffer, fork choice
//! ```
//!
//! ## Design Decisions
//!
//! - The protocol crate never opens a socket. A runtime implements
//!   [`Network`] and feeds received messages back through the client.
//! - `ChainSync` is plain data behind the client's `parking_lot::RwLock`;
//!   block processing is synchronous and fast, so no async lock is needed.
//! - Blocks travel bincode-encoded. Decoding happens inside `ChainSync` so a
//!   malformed payload is a sync error, not a transport error.

pub mod gossip;
pub mod sync;

pub use gossip::{GossipMessage, GossipTopic, LoopbackNetwork, Network};
pub use sync::{BlockStatus, ChainSync, SyncError, SyncRequest, SyncResponse};
