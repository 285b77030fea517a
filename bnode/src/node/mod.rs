//! B-tree node pages.
//!
//! # Structure
//!
//! A node page is laid out left to right as:
//! - Header: node type and key count
//! - Pointer array: one child page id per entry (internal nodes), or
//!   placeholders (leaf nodes)
//! - Offset array: cumulative record sizes, `offset[0]` implicit
//! - KV region: length-prefixed key/value records
//!
//! # Usage
//!
//! ```
//! use bnode::node::{DecodedNode, Node, NodeType};
//! use bnode::Page;
//!
//! // Internal node: keys with child page ids.
//! let mut node = Node::init(Page::new(), NodeType::Internal, 2)?;
//! node.append_kv(0, 7, b"", b"")?;
//! node.append_kv(1, 9, b"m", b"")?;
//! assert_eq!(node.pointer(1)?, 9);
//!
//! let decoded = DecodedNode::decode(&node)?;
//! assert_eq!(decoded.node_type(), NodeType::Internal);
//! assert_eq!(decoded.encoded_size(), usize::from(node.total_bytes()?));
//! # Ok::<(), bnode::NodeError>(())
//! ```

mod codec;
mod decoded;
mod error;
mod header;
pub mod layout;

pub use codec::{Entries, Entry, Node};
pub use decoded::{DecodedNode, InternalEntry, InternalNode, LeafEntry, LeafNode};
pub use error::NodeError;
pub use header::{INTERNAL, LEAF, NodeHeader, NodeType};
