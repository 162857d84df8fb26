//! A red-black tree ordered map for Rust.
//!
//! This crate provides [`RBTreeMap`], an ordered key-value map with the familiar
//! `BTreeMap`-style API, plus neighbour queries that also work for keys that are not stored:
//!
//! - [`predecessor`](RBTreeMap::predecessor) - The entry with the greatest key below a given key
//! - [`successor`](RBTreeMap::successor) - The entry with the least key above a given key
//! - [`check_invariants`](RBTreeMap::check_invariants) - Full structural validation
//!
//! # Example
//!
//! ```
//! use rbtree_map::RBTreeMap;
//!
//! let mut scores = RBTreeMap::new();
//! scores.insert("Alice", 100);
//! scores.insert("Bob", 85);
//! scores.insert("Carol", 92);
//!
//! // Standard ordered-map operations
//! assert_eq!(scores.get("Bob"), Some(&85));
//! assert_eq!(scores.len(), 3);
//! assert_eq!(scores.first_key(), Some(&"Alice"));
//!
//! // Neighbour queries (O(log n)), present or absent keys alike
//! assert_eq!(scores.successor("Bob"), Some((&"Carol", &92)));
//! assert_eq!(scores.predecessor("Bz"), Some((&"Bob", &85)));
//!
//! // The tree is always balanced
//! assert_eq!(scores.check_invariants(), Ok(()));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **`sync`** (default) - [`sync::SyncRBTreeMap`], a `parking_lot` lock-guarded wrapper
//! - **`invariant-checks`** - Debug builds re-validate the whole tree after every mutation
//!
//! # Implementation
//!
//! Nodes are stored in a slot arena and linked by index, including a parent link per node.
//! Insertion and removal restore the red-black rules with at most two and three rotations
//! respectively, so the height never exceeds `2 * log2(n + 1)`.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: Unsafe code is limited to the mutable iterators, which split borrows of the two arenas.
// #![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod rbtree_map;
#[cfg(feature = "sync")]
pub mod sync;

pub use error::{Error, InvariantViolation};
pub use rbtree_map::RBTreeMap;
