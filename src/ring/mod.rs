//! Ring Identifier Space
//!
//! The circular 160-bit identifier space every node and key is mapped onto.
//! Nodes hash their `host:port` address, keys hash their raw string; both
//! land on the same circle, and a key is owned by the first node at or past
//! its identifier.
//!
//! ## Core Mechanisms
//! - **Hashing**: SHA-1 over the UTF-8 bytes, kept big-endian so plain byte
//!   comparison is numeric comparison.
//! - **Circular ordering**: the `between` predicate decides membership on a
//!   clockwise arc, handling the wrap past zero. Every routing decision in
//!   the system reduces to this test.
//! - **Finger offsets**: `jump` computes the ring position `id + 2^(i-1)`
//!   that finger table entry `i` is responsible for covering.

pub mod id;
