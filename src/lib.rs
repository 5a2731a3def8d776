//! An arena-backed red-black tree for use as an ordered key index.
//!
//! This crate provides [`RbTree`], a self-balancing binary search tree over any [`Ord`] key type
//! that keeps O(log n) insertion, lookup and erasure under arbitrary insertion and deletion
//! order. It is meant as a building block beneath storage engines and similar systems that need
//! an ordered index with stable node handles.
//!
//! # Example
//!
//! ```
//! use rb_index::{RbTree, TreeError};
//!
//! let mut index = RbTree::new();
//! let alice = index.insert("alice").unwrap();
//! let carol = index.insert("carol").unwrap();
//! index.insert("bob").unwrap();
//!
//! // Handles survive rebalancing and the removal of other nodes.
//! assert_eq!(index.successor(alice), Ok(index.find("bob")));
//! assert_eq!(index.erase(carol), Ok("carol"));
//! assert_eq!(index.flatten(usize::MAX), ["alice", "bob"]);
//!
//! // A handle to an erased node is rejected rather than misused.
//! assert_eq!(index.erase(carol), Err(TreeError::InvalidHandle));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **No unsafe code** - Nodes live in an arena addressed by indices, not pointers
//! - **Checked handles** - [`NodeRef`]s are tagged with their tree and a slot generation
//! - **Fallible allocation** - Running out of memory is reported as [`TreeError::AllocFailed`]
//!
//! # Implementation
//!
//! Slot 0 of the node table is a permanently black sentinel that stands in for every absent
//! child and for the root's parent, so the rebalancing rules never have to test for a missing
//! node. Both rebalancing passes and the teardown walk are loops, so stack use does not grow with
//! the tree.
//!
//! Equal keys are allowed and kept in insertion order: a new key goes after every equal key
//! already present.

#![no_std]
#![forbid(unsafe_code)]
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
mod node_ref;
mod raw;

pub mod rb_tree;

pub use error::{TreeError, TreeResult};
pub use node_ref::NodeRef;
pub use rb_tree::RbTree;
