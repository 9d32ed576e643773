//! Routing & Ring Maintenance
//!
//! The iterative lookup that walks the ring to a key's owner, and the three
//! periodic tasks that keep the ring healable under joins, departures and
//! crashes.
//!
//! ## Core Mechanisms
//! - **Iterative lookup**: the caller drives the walk hop by hop; each
//!   remote node only answers one local routing question. A hop ceiling
//!   bounds the damage a transiently inconsistent ring can do.
//! - **Stabilize / notify**: successor pointers heal in the forward
//!   direction, predecessor pointers in the backward direction. The tasks
//!   cooperate but never coordinate.
//! - **Finger repair**: a cursor sweeps the finger table entry by entry,
//!   collapsing the long runs of identical entries a sparse ring produces.

pub mod lookup;
pub mod maintenance;

#[cfg(test)]
mod tests;
