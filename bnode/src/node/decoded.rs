//! Decoded, owned view of a single node.
//!
//! The tree layer works with these when it needs to rearrange entries (e.g.
//! to insert in the middle or split): decode one page, edit the vectors,
//! encode into a fresh page. Children of an internal node stay page ids;
//! nothing below the decoded page is loaded.

use crate::config::{NodeConfig, PAGE_SIZE};
use crate::node::{Node, NodeError, NodeType, layout};
use crate::page::{Page, PageId};

/// A key and the child page holding keys from it up to the next key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalEntry {
    pub key: Vec<u8>,
    pub child: PageId,
}

/// A key-value pair stored in a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// An internal node. Its records are written with empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalNode {
    pub entries: Vec<InternalEntry>,
}

/// A leaf node. Its pointers are written as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafNode {
    pub entries: Vec<LeafEntry>,
}

/// A node decoded from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedNode {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl DecodedNode {
    /// Copy every entry of `node` out of the page.
    pub fn decode<B: AsRef<[u8]>>(node: &Node<B>) -> Result<Self, NodeError> {
        match node.node_type()? {
            NodeType::Internal => {
                let entries = node
                    .entries()
                    .map(|entry| {
                        entry.map(|e| InternalEntry {
                            key: e.key.to_vec(),
                            child: e.pointer,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Internal(InternalNode { entries }))
            }
            NodeType::Leaf => {
                let entries = node
                    .entries()
                    .map(|entry| {
                        entry.map(|e| LeafEntry {
                            key: e.key.to_vec(),
                            value: e.value.to_vec(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Leaf(LeafNode { entries }))
            }
        }
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Internal(_) => NodeType::Internal,
            Self::Leaf(_) => NodeType::Leaf,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Internal(node) => node.entries.len(),
            Self::Leaf(node) => node.entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer, key and value of every record, in order.
    fn records(&self) -> Vec<(u64, &[u8], &[u8])> {
        match self {
            Self::Internal(node) => node
                .entries
                .iter()
                .map(|e| (e.child, e.key.as_slice(), &[][..]))
                .collect(),
            Self::Leaf(node) => node
                .entries
                .iter()
                .map(|e| (0, e.key.as_slice(), e.value.as_slice()))
                .collect(),
        }
    }

    /// Size of the encoded page.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        layout::encoded_size(self.records().into_iter().map(|(_, key, val)| (key, val)))
    }

    /// Whether the node can be encoded into a single page.
    #[must_use]
    pub fn fits_in_page(&self) -> bool {
        self.encoded_size() <= PAGE_SIZE
    }

    /// Encode into `buf`, replacing whatever it held.
    ///
    /// Every check runs before the buffer is modified, so on error `buf`
    /// keeps its previous contents.
    ///
    /// # Errors
    ///
    /// `PageFull` if the node does not fit, `KeyTooLarge` / `ValueTooLarge`
    /// if a record exceeds the limits of `config`, and the errors of
    /// [`Node::init_with_config`].
    pub fn write_to<B>(&self, buf: B, config: NodeConfig) -> Result<Node<B>, NodeError>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let required = self.encoded_size();
        if required > PAGE_SIZE {
            return Err(NodeError::PageFull {
                required,
                capacity: PAGE_SIZE,
            });
        }

        let records = self.records();
        for (_, key, val) in &records {
            if key.len() > config.max_key_size {
                return Err(NodeError::KeyTooLarge {
                    len: key.len(),
                    max: config.max_key_size,
                });
            }
            if val.len() > config.max_val_size {
                return Err(NodeError::ValueTooLarge {
                    len: val.len(),
                    max: config.max_val_size,
                });
            }
        }

        let key_count = u16::try_from(records.len()).map_err(|_| NodeError::TooManyKeys {
            key_count: u16::MAX,
        })?;
        let mut node = Node::init_with_config(buf, config, self.node_type(), key_count)?;
        for (idx, (pointer, key, val)) in (0u16..).zip(records) {
            node.append_kv(idx, pointer, key, val)?;
        }
        Ok(node)
    }

    /// Encode into a fresh page with the default limits.
    pub fn to_page(&self) -> Result<Page, NodeError> {
        self.write_to(Page::new(), NodeConfig::DEFAULT)
            .map(Node::into_inner)
    }
}

impl From<InternalNode> for DecodedNode {
    fn from(node: InternalNode) -> Self {
        Self::Internal(node)
    }
}

impl From<LeafNode> for DecodedNode {
    fn from(node: LeafNode) -> Self {
        Self::Leaf(node)
    }
}
