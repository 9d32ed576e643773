//! Wire Protocol
//!
//! Endpoint paths and Data Transfer Objects for internode communication.
//! These structures are serialized as JSON and sent over HTTP; one request
//! and one reply per call.

use crate::node::types::{Address, Key};
use crate::ring::id::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- API Endpoints ---

/// Liveness probe.
pub const ENDPOINT_PING: &str = "/ping";
/// One routing step towards the owner of an identifier.
pub const ENDPOINT_FIND_SUCCESSOR: &str = "/find_successor";
/// Hint that the sender believes it is the receiver's predecessor.
pub const ENDPOINT_NOTIFY: &str = "/notify";
/// Predecessor and successor list, exchanged during stabilization.
pub const ENDPOINT_NODE_LINKS: &str = "/links";
/// Store one key/value pair at the receiving node.
pub const ENDPOINT_PUT: &str = "/put";
/// Read one key from the receiving node's local store.
pub const ENDPOINT_GET: &str = "/get";
/// Remove one key from the receiving node's local store.
pub const ENDPOINT_DELETE: &str = "/delete";
/// Bulk merge, used when a departing node offloads its keys.
pub const ENDPOINT_PUT_ALL: &str = "/put_all";
/// Bulk handover of the keys a newly joined node now owns.
pub const ENDPOINT_GET_ALL: &str = "/get_all";
/// Debug snapshot plus the next hop for a full ring walk.
pub const ENDPOINT_DUMP: &str = "/dump";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub alive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindSuccessorRequest {
    /// Ring position whose owner is being looked up.
    pub id: Id,
}

/// One step of an iterative lookup. With `found` set, `address` is the
/// owner; otherwise it is the next node to ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResult {
    pub found: bool,
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyRequest {
    /// The sender's own address, offered as a predecessor candidate.
    pub candidate: Address,
}

/// Plain acknowledgment for calls with no other payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: Key,
    /// Overwrites any previous value for the key.
    pub value: String,
}

/// Request body for the calls addressed by key alone (Get, Delete).
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyRequest {
    pub key: Key,
}

/// Reply for Get and Delete. `None` never travels with a 200; a missing key
/// is reported through the status code instead.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutAllRequest {
    pub entries: HashMap<Key, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetAllRequest {
    /// Address of the node that just joined; the receiver hands over and
    /// deletes every key that address now owns.
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetAllResponse {
    pub entries: HashMap<Key, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DumpResponse {
    pub dump: String,
    /// The dumped node's immediate successor, so a caller can walk the ring.
    pub successor: Address,
}
