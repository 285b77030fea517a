//! Page codec for B-tree nodes.
//!
//! A node is a single fixed-size page. The codec packs a variable number of
//! variable-length key/value pairs (leaf nodes) or key/child-pointer pairs
//! (internal nodes) into that page and gives O(1) access to any entry by
//! index.
//!
//! # Page Format
//!
//! ```text
//! | type | nkeys |  pointers  |  offsets   | key-values | unused |
//! |  2B  |   2B  | nkeys × 8B | nkeys × 2B |     ...    |        |
//!
//! key-value record:
//! | key_len | val_len | key | val |
//! |   2B    |   2B    | ... | ... |
//! ```
//!
//! All integers are little-endian. The offset array stores the cumulative
//! size of the records before each index, so the start of any record is a
//! single addition away.
//!
//! # Usage
//!
//! ```
//! use bnode::{Node, NodeType, Page};
//!
//! let mut node = Node::init(Page::new(), NodeType::Leaf, 2)?;
//! node.append_kv(0, 0, b"k1", b"hi")?;
//! node.append_kv(1, 0, b"k3", b"hello")?;
//!
//! assert_eq!(node.key(1)?, b"k3");
//! assert_eq!(node.value(1)?, b"hello");
//! assert_eq!(node.total_bytes()?, 43);
//! # Ok::<(), bnode::NodeError>(())
//! ```
//!
//! Allocation, tree search, splitting and persistence live in the layers
//! above; they use [`Node::can_append`] and [`Node::total_bytes`] to decide
//! when a node has to be split.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod node;
mod page;

pub use config::{ConfigError, MAX_KEY_SIZE, MAX_VAL_SIZE, NodeConfig, PAGE_SIZE};
pub use node::{
    DecodedNode, Entries, Entry, INTERNAL, InternalEntry, InternalNode, LEAF, LeafEntry, LeafNode,
    Node, NodeError, NodeHeader, NodeType,
};
pub use page::{Page, PageId};
