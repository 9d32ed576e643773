use crate::ring::id::{between, Id, KEY_BITS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

/// Successor list depth. Each extra entry is one more crash the ring can
/// absorb between stabilize rounds.
pub const MAX_SUCCESSORS: usize = 5;

/// Finger table size, 1-based: entries 1..=160, index 0 unused.
pub const FINGER_ENTRIES: usize = KEY_BITS + 1;

/// A peer's network location, an opaque `host:port` string. Nodes refer to
/// each other only by address, never by in-memory reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Ring position of the node at this address.
    pub fn id(&self) -> Id {
        Id::hash(self.0.as_bytes())
    }

    pub fn port(&self) -> Option<u16> {
        self.0.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [ {} ]", self.0, self.id())
    }
}

/// A user-chosen key. Owned by the first node at or past its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub String);

impl Key {
    pub fn id(&self) -> Id {
        Id::hash(self.0.as_bytes())
    }
}

/// The links a node reports during stabilization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLinks {
    pub predecessor: Option<Address>,
    pub successors: Vec<Address>,
}

/// State of the local ring member. Owned exclusively by the node actor;
/// `successors` is nonempty for as long as the node is a member (it holds
/// the node's own address iff the node is alone on the ring).
pub struct Node {
    pub address: Address,
    pub id: Id,
    pub successors: Vec<Address>,
    pub predecessor: Option<Address>,
    pub fingers: Vec<Option<Address>>,
    pub data: HashMap<Key, String>,
}

impl Node {
    pub fn new(address: Address) -> Self {
        let id = address.id();
        Node {
            address: address.clone(),
            id,
            successors: vec![address],
            predecessor: None,
            fingers: vec![None; FINGER_ENTRIES],
            data: HashMap::new(),
        }
    }

    /// The immediate successor on the ring.
    pub fn successor(&self) -> &Address {
        &self.successors[0]
    }

    /// One routing step: `(true, owner)` when `id` falls on our arc to the
    /// immediate successor, otherwise `(false, next_hop)`.
    pub fn find_successor_step(&self, id: &Id) -> (bool, Address) {
        let successor = self.successor().clone();
        if between(&self.id, id, &successor.id(), true) {
            (true, successor)
        } else {
            (false, self.closest_preceding_node(id))
        }
    }

    /// Highest finger strictly between our id and `id`. Absent entries are
    /// skipped; with no qualifying finger the immediate successor is the
    /// best hop we know.
    pub fn closest_preceding_node(&self, id: &Id) -> Address {
        for entry in self.fingers.iter().rev().flatten() {
            if between(&self.id, &entry.id(), id, false) {
                return entry.clone();
            }
        }
        self.successor().clone()
    }

    /// The immediate successor stopped answering: shift the list left and
    /// fall back to ourselves when nothing is left, so routing terminates.
    pub fn drop_failed_successor(&mut self) {
        self.successors.remove(0);
        if self.successors.is_empty() {
            self.successors.push(self.address.clone());
        }
    }

    /// Merge the links our successor reported: prepend it to its own list,
    /// truncate, and adopt a newly inserted node between us and it as the
    /// better immediate successor.
    pub fn merge_successor_links(&mut self, links: NodeLinks) {
        let head = self.successors[0].clone();
        let mut merged = Vec::with_capacity(MAX_SUCCESSORS + 1);
        merged.push(head.clone());
        merged.extend(links.successors);
        merged.truncate(MAX_SUCCESSORS);
        self.successors = merged;

        if let Some(candidate) = links.predecessor {
            if between(&self.id, &candidate.id(), &head.id(), false) {
                self.successors[0] = candidate;
            }
        }
    }

    /// A peer believes it is our predecessor. Adopt it when we have none, or
    /// when it sits between the current predecessor and us.
    pub fn consider_predecessor(&mut self, candidate: Address) {
        let adopt = match &self.predecessor {
            None => true,
            Some(current) => between(&current.id(), &candidate.id(), &self.id, false),
        };
        if adopt {
            self.predecessor = Some(candidate);
        }
    }

    /// Split off every key the node at `new_address` now owns, i.e. every
    /// key whose id is no longer on our arc `(new_address.id, self.id]`.
    /// The removed entries are returned for transfer.
    pub fn take_keys_for(&mut self, new_address: &Address) -> HashMap<Key, String> {
        let new_id = new_address.id();
        let moving: Vec<Key> = self
            .data
            .keys()
            .filter(|key| !between(&new_id, &key.id(), &self.id, true))
            .cloned()
            .collect();
        let mut transferred = HashMap::with_capacity(moving.len());
        for key in moving {
            if let Some(value) = self.data.remove(&key) {
                transferred.insert(key, value);
            }
        }
        transferred
    }

    /// Human-readable snapshot of everything this node knows.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "node {}", self.address);
        match &self.predecessor {
            Some(predecessor) => {
                let _ = writeln!(out, "predecessor: {}", predecessor);
            }
            None => {
                let _ = writeln!(out, "predecessor: (none)");
            }
        }
        let _ = writeln!(out, "successors:");
        for (i, successor) in self.successors.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, successor);
        }
        let _ = writeln!(out, "fingers:");
        let mut i = 1;
        while i < FINGER_ENTRIES {
            match &self.fingers[i] {
                None => i += 1,
                Some(entry) => {
                    let first = i;
                    while i + 1 < FINGER_ENTRIES && self.fingers[i + 1].as_ref() == Some(entry) {
                        i += 1;
                    }
                    let _ = writeln!(out, "  [{first}..{i}] -> {}", entry);
                    i += 1;
                }
            }
        }
        let _ = writeln!(out, "data ({} items):", self.data.len());
        for (key, value) in &self.data {
            let _ = writeln!(out, "  {} [ {} ] => {}", key.0, key.id(), value);
        }
        out
    }
}
