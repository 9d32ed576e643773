//! Node State & Lifecycle
//!
//! The single node this process runs: its position on the ring, its links to
//! the rest of the ring, and the slice of the key space it stores.
//!
//! ## Core Mechanisms
//! - **Single-owner actor**: one task owns the `Node` record outright; every
//!   read and write is a closure queued onto that task and executed in
//!   submission order. The queue is the node's only lock.
//! - **Lifecycle**: a node either creates a fresh ring (successor = itself)
//!   or joins an existing one through a bootstrap peer, and on a graceful
//!   departure hands its keys to the immediate successor.

pub mod actor;
pub mod service;
pub mod types;
