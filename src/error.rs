//! Error kinds the operator has to tell apart.
//!
//! Transport and routing failures inside the maintenance loops are logged
//! and absorbed there; these variants cover the cases that surface all the
//! way to the command shell.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DhtError {
    /// Get or Delete on a key the responsible node does not hold.
    #[error("no such key")]
    NoSuchKey,

    /// A lookup walked the ring past the hop ceiling without resolving.
    /// Usually transient; retry after the next maintenance cycle.
    #[error("lookup gave up after {0} hops")]
    LookupExhausted(usize),

    /// Operator supplied something that is not a routable `host:port`.
    #[error("invalid address {0:?}: expected <host>:<port>")]
    InvalidAddress(String),

    /// Operator command is not valid for the current lifecycle state.
    #[error("{0}")]
    InvalidState(&'static str),
}
