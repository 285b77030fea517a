//! Node header: type tag and key count.

use crate::node::NodeError;
use crate::node::layout::HEADER_SIZE;

/// Type tag of an internal node (pointers address child pages).
pub const INTERNAL: u16 = 1;

/// Type tag of a leaf node (values hold user data).
pub const LEAF: u16 = 2;

/// Node type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NodeType {
    Internal = INTERNAL,
    Leaf = LEAF,
}

impl TryFrom<u16> for NodeType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            INTERNAL => Ok(Self::Internal),
            LEAF => Ok(Self::Leaf),
            _ => Err(value),
        }
    }
}

/// Header of a node page.
///
/// Layout:
/// - `node_type`: 2 bytes
/// - `key_count`: 2 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub node_type: NodeType,
    pub key_count: u16,
}

impl NodeHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    /// Serialize the header to bytes.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&(self.node_type as u16).to_le_bytes());
        buf[2..4].copy_from_slice(&self.key_count.to_le_bytes());
        buf
    }

    /// Deserialize a header from bytes.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, NodeError> {
        let tag = u16::from_le_bytes([bytes[0], bytes[1]]);
        let node_type = NodeType::try_from(tag).map_err(NodeError::InvalidNodeType)?;
        let key_count = u16::from_le_bytes([bytes[2], bytes[3]]);

        Ok(Self {
            node_type,
            key_count,
        })
    }
}
