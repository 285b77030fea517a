//! Reading and writing entries of a node page.
//!
//! [`Node`] is a thin view over a caller-owned buffer. It keeps no state of
//! its own beyond the size limits: every position is recomputed from the
//! header and offset array currently in the buffer.

// Positions are bounded by PAGE_SIZE, which is asserted to fit in u16.
#![allow(clippy::cast_possible_truncation)]

use crate::config::{NodeConfig, PAGE_SIZE};
use crate::node::NodeError;
use crate::node::header::{NodeHeader, NodeType};
use crate::node::layout::{self, KV_HEADER_SIZE, MAX_KEY_COUNT};

/// A node page codec over a byte buffer.
///
/// Works with any buffer of at least `PAGE_SIZE` bytes: [`crate::Page`],
/// `Vec<u8>`, `&[u8]` for reading, `&mut [u8]` for writing. Only the first
/// `PAGE_SIZE` bytes are used.
///
/// # Invariants
///
/// - The buffer is at least `PAGE_SIZE` bytes long.
/// - The key count in the header never exceeds `MAX_KEY_COUNT`, so the
///   pointer and offset arrays always lie inside the page.
pub struct Node<B> {
    buf: B,
    config: NodeConfig,
}

/// One entry of a node, borrowed from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    /// Child page id for internal nodes, placeholder for leaves.
    pub pointer: u64,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

/// Location of one KV record inside the page.
#[derive(Debug, Clone, Copy)]
struct Record {
    start: usize,
    key_len: usize,
    val_len: usize,
}

impl Record {
    const fn key_start(self) -> usize {
        self.start + KV_HEADER_SIZE
    }

    const fn val_start(self) -> usize {
        self.key_start() + self.key_len
    }

    const fn end(self) -> usize {
        self.val_start() + self.val_len
    }
}

impl<B: AsRef<[u8]>> Node<B> {
    /// Open an existing node page with the default size limits.
    ///
    /// # Errors
    ///
    /// Rejects buffers shorter than a page, unknown type tags and key counts
    /// whose fixed regions do not fit in a page.
    pub fn open(buf: B) -> Result<Self, NodeError> {
        Self::open_with_config(buf, NodeConfig::DEFAULT)
    }

    /// Open an existing node page with the given size limits.
    ///
    /// # Errors
    ///
    /// As [`Node::open`], plus `InvalidConfig` if `config` fails
    /// [`NodeConfig::validate`].
    pub fn open_with_config(buf: B, config: NodeConfig) -> Result<Self, NodeError> {
        let node = Self::wrap(buf, config)?;
        let header = node.header()?;
        if header.key_count > MAX_KEY_COUNT {
            return Err(NodeError::TooManyKeys {
                key_count: header.key_count,
            });
        }
        Ok(node)
    }

    fn wrap(buf: B, config: NodeConfig) -> Result<Self, NodeError> {
        let len = buf.as_ref().len();
        if len < PAGE_SIZE {
            let err = NodeError::BufferTooSmall {
                len,
                required: PAGE_SIZE,
            };
            tracing::debug!(%err, "rejected node buffer");
            return Err(err);
        }
        let config = config.validate().map_err(|err| {
            tracing::debug!(%err, "rejected node config");
            NodeError::InvalidConfig(err)
        })?;
        Ok(Self { buf, config })
    }

    /// The size limits applied by `append_kv`.
    #[must_use]
    pub const fn config(&self) -> NodeConfig {
        self.config
    }

    /// The page bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let buf = self.buf.as_ref();
        &buf[..buf.len().min(PAGE_SIZE)]
    }

    /// Give the buffer back.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Read the node header.
    pub fn header(&self) -> Result<NodeHeader, NodeError> {
        let bytes = self
            .as_bytes()
            .get(..NodeHeader::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| NodeError::BufferTooSmall {
                len: self.as_bytes().len(),
                required: PAGE_SIZE,
            })?;
        NodeHeader::from_bytes(bytes)
    }

    /// The node type from the header.
    pub fn node_type(&self) -> Result<NodeType, NodeError> {
        self.header().map(|h| h.node_type)
    }

    /// The number of entries, from the header.
    #[must_use]
    pub fn key_count(&self) -> u16 {
        // Never fails: `wrap` guarantees at least PAGE_SIZE bytes.
        self.read_u16(2).unwrap_or(0)
    }

    /// Child pointer of entry `idx`.
    pub fn pointer(&self, idx: u16) -> Result<u64, NodeError> {
        self.check_index(idx)?;
        self.read_u64(layout::pointer_pos(idx))
            .ok_or(NodeError::Corrupt {
                idx,
                reason: "pointer outside the page",
            })
    }

    /// Offset of record `idx` relative to the start of the KV region.
    ///
    /// `offset(0)` is always 0 and is not stored.
    pub fn offset(&self, idx: u16) -> Result<u16, NodeError> {
        self.check_index(idx)?;
        self.offset_at(idx)
    }

    /// Absolute position of record `idx` in the page.
    pub fn kv_position(&self, idx: u16) -> Result<u16, NodeError> {
        self.check_index(idx)?;
        self.kv_pos_at(idx).map(|pos| pos as u16)
    }

    /// Key of entry `idx`.
    pub fn key(&self, idx: u16) -> Result<&[u8], NodeError> {
        self.check_index(idx)?;
        let record = self.record(idx)?;
        self.slice(record.key_start(), record.val_start(), idx)
    }

    /// Value of entry `idx`.
    pub fn value(&self, idx: u16) -> Result<&[u8], NodeError> {
        self.check_index(idx)?;
        let record = self.record(idx)?;
        self.slice(record.val_start(), record.end(), idx)
    }

    /// Pointer, key and value of entry `idx`.
    pub fn entry(&self, idx: u16) -> Result<Entry<'_>, NodeError> {
        self.check_index(idx)?;
        let record = self.record(idx)?;
        Ok(Entry {
            pointer: self.pointer(idx)?,
            key: self.slice(record.key_start(), record.val_start(), idx)?,
            value: self.slice(record.val_start(), record.end(), idx)?,
        })
    }

    /// Iterate over all entries in index order.
    #[must_use]
    pub const fn entries(&self) -> Entries<'_, B> {
        Entries { node: self, next: 0 }
    }

    /// Encoded size of the node: the position just past the last record.
    ///
    /// Only meaningful once all `key_count` entries have been appended.
    pub fn total_bytes(&self) -> Result<u16, NodeError> {
        self.kv_pos_at(self.key_count()).map(|pos| pos as u16)
    }

    /// Whether an entry with the given key and value lengths could be
    /// appended at `idx` without exceeding the size limits or the page.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `idx` is not below the key count, `AppendOutOfOrder`
    /// if `idx` is not the next index to append.
    pub fn can_append(&self, idx: u16, key_len: usize, val_len: usize) -> Result<bool, NodeError> {
        self.check_index(idx)?;
        self.check_append_order(idx)?;
        if key_len > self.config.max_key_size || val_len > self.config.max_val_size {
            return Ok(false);
        }
        Ok(self.kv_pos_at(idx)? + layout::entry_size(key_len, val_len) <= PAGE_SIZE)
    }

    /// Check the whole node for consistency.
    ///
    /// Every record must lie inside the page, respect the size limits, and
    /// end exactly where the next offset says it does.
    pub fn verify(&self) -> Result<(), NodeError> {
        let result = self.verify_entries();
        if let Err(err) = &result {
            tracing::warn!(%err, "node verification failed");
        }
        result
    }

    fn verify_entries(&self) -> Result<(), NodeError> {
        let header = self.header()?;
        if header.key_count > MAX_KEY_COUNT {
            return Err(NodeError::TooManyKeys {
                key_count: header.key_count,
            });
        }

        for idx in 0..header.key_count {
            let record = self.record(idx)?;
            if record.key_len > self.config.max_key_size {
                return Err(NodeError::KeyTooLarge {
                    len: record.key_len,
                    max: self.config.max_key_size,
                });
            }
            if record.val_len > self.config.max_val_size {
                return Err(NodeError::ValueTooLarge {
                    len: record.val_len,
                    max: self.config.max_val_size,
                });
            }

            let expected = usize::from(self.offset_at(idx)?)
                + layout::entry_size(record.key_len, record.val_len);
            if usize::from(self.offset_at(idx + 1)?) != expected {
                return Err(NodeError::Corrupt {
                    idx,
                    reason: "offset does not match record length",
                });
            }
        }
        Ok(())
    }

    /// CRC32 of the encoded bytes `[0, total_bytes)`.
    pub fn checksum(&self) -> Result<u32, NodeError> {
        let len = usize::from(self.total_bytes()?);
        Ok(crc32fast::hash(&self.as_bytes()[..len]))
    }

    /// Compare the node's checksum against a stored one.
    pub fn verify_checksum(&self, expected: u32) -> Result<(), NodeError> {
        let actual = self.checksum()?;
        if actual != expected {
            tracing::warn!(expected, actual, "node checksum mismatch");
            return Err(NodeError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    fn check_index(&self, idx: u16) -> Result<(), NodeError> {
        let key_count = self.key_count();
        if idx >= key_count {
            return Err(NodeError::OutOfRange { idx, key_count });
        }
        Ok(())
    }

    /// `offset[idx]` for `idx` in `0..=key_count`.
    fn offset_at(&self, idx: u16) -> Result<u16, NodeError> {
        if idx == 0 {
            return Ok(0);
        }
        self.read_u16(layout::offset_pos(self.key_count(), idx))
            .ok_or(NodeError::Corrupt {
                idx,
                reason: "offset outside the page",
            })
    }

    /// Absolute position of `offset[idx]` for `idx` in `0..=key_count`.
    fn kv_pos_at(&self, idx: u16) -> Result<usize, NodeError> {
        let pos = layout::kv_region_start(self.key_count()) + usize::from(self.offset_at(idx)?);
        if pos > PAGE_SIZE {
            return Err(NodeError::Corrupt {
                idx,
                reason: "offset points past the page",
            });
        }
        Ok(pos)
    }

    fn record(&self, idx: u16) -> Result<Record, NodeError> {
        let start = self.kv_pos_at(idx)?;
        let lengths = self
            .read_u16(start)
            .zip(self.read_u16(start + 2))
            .ok_or(NodeError::Corrupt {
                idx,
                reason: "record header outside the page",
            })?;
        let record = Record {
            start,
            key_len: usize::from(lengths.0),
            val_len: usize::from(lengths.1),
        };
        if record.end() > PAGE_SIZE {
            return Err(NodeError::Corrupt {
                idx,
                reason: "record extends past the page",
            });
        }
        Ok(record)
    }

    fn slice(&self, start: usize, end: usize, idx: u16) -> Result<&[u8], NodeError> {
        self.as_bytes().get(start..end).ok_or(NodeError::Corrupt {
            idx,
            reason: "record extends past the page",
        })
    }

    fn read_u16(&self, pos: usize) -> Option<u16> {
        self.as_bytes()
            .get(pos..pos + 2)?
            .try_into()
            .ok()
            .map(u16::from_le_bytes)
    }

    fn read_u64(&self, pos: usize) -> Option<u64> {
        self.as_bytes()
            .get(pos..pos + 8)?
            .try_into()
            .ok()
            .map(u64::from_le_bytes)
    }

    /// Entries are appended once each, in increasing index order from 0.
    ///
    /// On a zero-initialised page `offset[idx]` (idx >= 1) only becomes
    /// non-zero once entry `idx - 1` is written, because every record is at
    /// least `KV_HEADER_SIZE` bytes.
    fn check_append_order(&self, idx: u16) -> Result<(), NodeError> {
        let previous_written = idx == 0 || self.offset_at(idx)? != 0;
        let already_written = self.offset_at(idx + 1)? != 0;
        if !previous_written || already_written {
            return Err(NodeError::AppendOutOfOrder { idx });
        }
        Ok(())
    }

    fn check_append(&self, idx: u16, key: &[u8], val: &[u8]) -> Result<(), NodeError> {
        self.check_index(idx)?;
        if key.len() > self.config.max_key_size {
            return Err(NodeError::KeyTooLarge {
                len: key.len(),
                max: self.config.max_key_size,
            });
        }
        if val.len() > self.config.max_val_size {
            return Err(NodeError::ValueTooLarge {
                len: val.len(),
                max: self.config.max_val_size,
            });
        }
        self.check_append_order(idx)?;

        let required = self.kv_pos_at(idx)? + layout::entry_size(key.len(), val.len());
        if required > PAGE_SIZE {
            return Err(NodeError::PageFull {
                required,
                capacity: PAGE_SIZE,
            });
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Node<B> {
    /// Zero the buffer and write a fresh header, with the default limits.
    ///
    /// This is the starting point for building a node: follow it with
    /// `key_count` calls to [`Node::append_kv`] for indices `0..key_count`.
    pub fn init(buf: B, node_type: NodeType, key_count: u16) -> Result<Self, NodeError> {
        Self::init_with_config(buf, NodeConfig::DEFAULT, node_type, key_count)
    }

    /// Zero the buffer and write a fresh header, with the given limits.
    ///
    /// # Errors
    ///
    /// `BufferTooSmall`, `InvalidConfig` or `TooManyKeys`, all before the
    /// buffer is touched.
    pub fn init_with_config(
        buf: B,
        config: NodeConfig,
        node_type: NodeType,
        key_count: u16,
    ) -> Result<Self, NodeError> {
        if key_count > MAX_KEY_COUNT {
            return Err(NodeError::TooManyKeys { key_count });
        }
        let mut node = Self::wrap(buf, config)?;
        node.page_mut().fill(0);
        node.set_header(node_type, key_count)?;
        Ok(node)
    }

    /// Write the header.
    ///
    /// Every position in the page depends on the key count, so this must
    /// happen before any entry is written.
    pub fn set_header(&mut self, node_type: NodeType, key_count: u16) -> Result<(), NodeError> {
        if key_count > MAX_KEY_COUNT {
            return Err(NodeError::TooManyKeys { key_count });
        }
        let header = NodeHeader {
            node_type,
            key_count,
        };
        self.write_at(0, &header.to_bytes(), 0)
    }

    /// Set the child pointer of entry `idx`.
    pub fn set_pointer(&mut self, idx: u16, value: u64) -> Result<(), NodeError> {
        self.check_index(idx)?;
        self.write_at(layout::pointer_pos(idx), &value.to_le_bytes(), idx)
    }

    /// Set `offset[idx]`. Setting `offset(0)` is a no-op.
    pub fn set_offset(&mut self, idx: u16, value: u16) -> Result<(), NodeError> {
        self.check_index(idx)?;
        self.write_offset(idx, value)
    }

    /// Append entry `idx`.
    ///
    /// Writes the pointer, then the key and value at `kv_position(idx)`, then
    /// `offset[idx + 1]`. Nothing is written if the entry is rejected.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if `idx` is not below the key count
    /// - `KeyTooLarge` / `ValueTooLarge` if a limit is exceeded
    /// - `AppendOutOfOrder` if entry `idx - 1` is missing or `idx` was
    ///   already written
    /// - `PageFull` if the record would extend past the page
    pub fn append_kv(&mut self, idx: u16, pointer: u64, key: &[u8], val: &[u8]) -> Result<(), NodeError> {
        if let Err(err) = self.check_append(idx, key, val) {
            tracing::debug!(idx, %err, "rejected append");
            return Err(err);
        }

        let start = self.kv_pos_at(idx)?;
        let next_offset = self.offset_at(idx)? + layout::entry_size(key.len(), val.len()) as u16;

        self.set_pointer(idx, pointer)?;
        self.write_at(start, &(key.len() as u16).to_le_bytes(), idx)?;
        self.write_at(start + 2, &(val.len() as u16).to_le_bytes(), idx)?;
        self.write_at(start + KV_HEADER_SIZE, key, idx)?;
        self.write_at(start + KV_HEADER_SIZE + key.len(), val, idx)?;
        self.write_offset(idx + 1, next_offset)?;

        tracing::trace!(idx, key_len = key.len(), val_len = val.len(), "appended entry");
        Ok(())
    }

    fn page_mut(&mut self) -> &mut [u8] {
        let buf = self.buf.as_mut();
        let len = buf.len().min(PAGE_SIZE);
        &mut buf[..len]
    }

    /// Write `offset[idx]` for `idx` in `0..=key_count`.
    fn write_offset(&mut self, idx: u16, value: u16) -> Result<(), NodeError> {
        if idx == 0 {
            return Ok(());
        }
        let pos = layout::offset_pos(self.key_count(), idx);
        self.write_at(pos, &value.to_le_bytes(), idx)
    }

    fn write_at(&mut self, pos: usize, bytes: &[u8], idx: u16) -> Result<(), NodeError> {
        let dst = self
            .page_mut()
            .get_mut(pos..pos + bytes.len())
            .ok_or(NodeError::Corrupt {
                idx,
                reason: "write outside the page",
            })?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

impl<B: AsRef<[u8]>> std::fmt::Debug for Node<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("header", &self.header())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Iterator over the entries of a node, in index order.
pub struct Entries<'a, B> {
    node: &'a Node<B>,
    next: u16,
}

impl<'a, B: AsRef<[u8]>> Iterator for Entries<'a, B> {
    type Item = Result<Entry<'a>, NodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.node.key_count() {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        Some(self.node.entry(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(self.node.key_count().saturating_sub(self.next));
        (remaining, Some(remaining))
    }
}

impl<B: AsRef<[u8]>> ExactSizeIterator for Entries<'_, B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::page::Page;

    /// Leaf `{"k1":"hi", "k3":"hello"}`.
    fn example_leaf() -> Node<Page> {
        let mut node = Node::init(Page::new(), NodeType::Leaf, 2).expect("should init");
        node.append_kv(0, 0, b"k1", b"hi").expect("should append");
        node.append_kv(1, 0, b"k3", b"hello").expect("should append");
        node
    }

    #[test]
    fn test_example_layout() {
        let node = example_leaf();

        let mut expected = vec![0x02, 0x00, 0x02, 0x00];
        expected.extend_from_slice(&[0u8; 16]);
        expected.extend_from_slice(&[0x08, 0x00, 0x13, 0x00]);
        expected.extend_from_slice(&[0x02, 0x00, 0x02, 0x00]);
        expected.extend_from_slice(b"k1hi");
        expected.extend_from_slice(&[0x02, 0x00, 0x05, 0x00]);
        expected.extend_from_slice(b"k3hello");

        assert_eq!(node.total_bytes().unwrap(), 43);
        assert_eq!(&node.as_bytes()[..43], expected.as_slice());
        assert!(node.as_bytes()[43..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_example_accessors() {
        let node = example_leaf();

        assert_eq!(node.node_type().unwrap(), NodeType::Leaf);
        assert_eq!(node.key_count(), 2);
        assert_eq!(node.offset(0).unwrap(), 0);
        assert_eq!(node.offset(1).unwrap(), 8);
        assert_eq!(node.kv_position(0).unwrap(), 24);
        assert_eq!(node.kv_position(1).unwrap(), 32);
        assert_eq!(node.key(0).unwrap(), b"k1");
        assert_eq!(node.value(0).unwrap(), b"hi");
        assert_eq!(node.key(1).unwrap(), b"k3");
        assert_eq!(node.value(1).unwrap(), b"hello");
        assert_eq!(node.pointer(1).unwrap(), 0);
        node.verify().unwrap();
    }

    #[test]
    fn test_internal_pointers() {
        let mut node = Node::init(Page::new(), NodeType::Internal, 3).unwrap();
        node.append_kv(0, 10, b"", b"").unwrap();
        node.append_kv(1, 20, b"m", b"").unwrap();
        node.append_kv(2, u64::MAX, b"t", b"").unwrap();

        assert_eq!(node.node_type().unwrap(), NodeType::Internal);
        assert_eq!(node.pointer(0).unwrap(), 10);
        assert_eq!(node.pointer(1).unwrap(), 20);
        assert_eq!(node.pointer(2).unwrap(), u64::MAX);
        assert_eq!(node.key(0).unwrap(), b"");
        assert_eq!(node.key(2).unwrap(), b"t");

        node.set_pointer(1, 21).unwrap();
        assert_eq!(node.pointer(1).unwrap(), 21);
        assert_eq!(node.key(1).unwrap(), b"m");
    }

    #[test]
    fn test_out_of_range() {
        let mut node = example_leaf();
        let expected = NodeError::OutOfRange {
            idx: 2,
            key_count: 2,
        };

        assert_eq!(node.pointer(2).unwrap_err(), expected);
        assert_eq!(node.offset(2).unwrap_err(), expected);
        assert_eq!(node.kv_position(2).unwrap_err(), expected);
        assert_eq!(node.key(2).unwrap_err(), expected);
        assert_eq!(node.value(2).unwrap_err(), expected);
        assert_eq!(node.entry(2).unwrap_err(), expected);
        assert_eq!(node.set_pointer(2, 1).unwrap_err(), expected);
        assert_eq!(node.set_offset(2, 1).unwrap_err(), expected);
        assert_eq!(node.append_kv(2, 0, b"k", b"v").unwrap_err(), expected);
        assert_eq!(node.can_append(2, 1, 1).unwrap_err(), expected);
    }

    #[test]
    fn test_empty_node() {
        let node = Node::init(Page::new(), NodeType::Leaf, 0).unwrap();
        assert_eq!(node.total_bytes().unwrap(), 4);
        assert_eq!(node.entries().count(), 0);
        assert!(matches!(
            node.offset(0),
            Err(NodeError::OutOfRange { idx: 0, key_count: 0 })
        ));
        node.verify().unwrap();
    }

    #[test]
    fn test_set_offset_zero_is_noop() {
        let mut node = example_leaf();
        let before = node.as_bytes().to_vec();

        node.set_offset(0, 1234).unwrap();
        assert_eq!(node.offset(0).unwrap(), 0);
        assert_eq!(node.as_bytes(), before.as_slice());

        node.set_offset(1, 9).unwrap();
        assert_eq!(node.offset(1).unwrap(), 9);
    }

    #[test]
    fn test_append_gap_rejected() {
        let mut node = Node::init(Page::new(), NodeType::Leaf, 3).unwrap();
        assert_eq!(
            node.append_kv(1, 0, b"a", b"b").unwrap_err(),
            NodeError::AppendOutOfOrder { idx: 1 }
        );
        assert_eq!(
            node.can_append(1, 1, 1).unwrap_err(),
            NodeError::AppendOutOfOrder { idx: 1 }
        );
        assert!(node.as_bytes()[4..].iter().all(|&b| b == 0));

        node.append_kv(0, 0, b"a", b"b").unwrap();
        assert_eq!(
            node.can_append(2, 1, 1).unwrap_err(),
            NodeError::AppendOutOfOrder { idx: 2 }
        );
        assert!(node.can_append(1, 1, 1).unwrap());
    }

    #[test]
    fn test_append_twice_rejected() {
        let mut node = Node::init(Page::new(), NodeType::Leaf, 2).unwrap();
        node.append_kv(0, 0, b"a", b"b").unwrap();
        assert_eq!(
            node.append_kv(0, 0, b"c", b"d").unwrap_err(),
            NodeError::AppendOutOfOrder { idx: 0 }
        );
        assert_eq!(
            node.can_append(0, 1, 1).unwrap_err(),
            NodeError::AppendOutOfOrder { idx: 0 }
        );
        assert_eq!(node.key(0).unwrap(), b"a");
    }

    #[test]
    fn test_oversized_key_and_value() {
        let mut node = Node::init(Page::new(), NodeType::Leaf, 1).unwrap();
        let key = vec![1u8; 1001];
        let val = vec![2u8; 3001];

        assert_eq!(
            node.append_kv(0, 0, &key, b"v").unwrap_err(),
            NodeError::KeyTooLarge {
                len: 1001,
                max: 1000
            }
        );
        assert_eq!(
            node.append_kv(0, 0, b"k", &val).unwrap_err(),
            NodeError::ValueTooLarge {
                len: 3001,
                max: 3000
            }
        );
        assert!(!node.can_append(0, 1001, 0).unwrap());

        node.append_kv(0, 0, &key[..1000], &val[..3000]).unwrap();
        assert_eq!(node.total_bytes().unwrap(), 4018);
    }

    #[test]
    fn test_page_full_leaves_page_unchanged() {
        let mut node = Node::init(Page::new(), NodeType::Leaf, 2).unwrap();
        let val = vec![7u8; 3000];
        node.append_kv(0, 0, b"first", &val).unwrap();
        let before = node.as_bytes().to_vec();

        assert!(!node.can_append(1, 5, 3000).unwrap());
        let err = node.append_kv(1, 0, b"second", &val).unwrap_err();
        assert_eq!(
            err,
            NodeError::PageFull {
                required: 24 + 3009 + 3010,
                capacity: PAGE_SIZE
            }
        );
        assert_eq!(node.as_bytes(), before.as_slice());

        // Exactly filling the page is fine.
        let room = PAGE_SIZE - usize::from(node.kv_position(0).unwrap()) - 3009 - 4;
        assert!(node.can_append(1, 0, room).unwrap());
        node.append_kv(1, 0, b"", &vec![1u8; room]).unwrap();
        assert_eq!(usize::from(node.total_bytes().unwrap()), PAGE_SIZE);
    }

    #[test]
    fn test_custom_config_limits() {
        let config = NodeConfig {
            max_key_size: 4,
            max_val_size: 8,
        };
        let mut node = Node::init_with_config(Page::new(), config, NodeType::Leaf, 1).unwrap();
        assert_eq!(
            node.append_kv(0, 0, b"toolong", b"v").unwrap_err(),
            NodeError::KeyTooLarge { len: 7, max: 4 }
        );
        node.append_kv(0, 0, b"key", b"value").unwrap();

        // Reopening with stricter limits flags the stored entry.
        let strict = NodeConfig {
            max_key_size: 2,
            max_val_size: 8,
        };
        let reopened = Node::open_with_config(node.as_bytes(), strict).unwrap();
        assert_eq!(
            reopened.verify().unwrap_err(),
            NodeError::KeyTooLarge { len: 3, max: 2 }
        );
    }

    #[test]
    fn test_rejects_config_that_overflows_a_page() {
        let oversized = NodeConfig {
            max_key_size: 4000,
            max_val_size: 4000,
        };
        let expected = NodeError::InvalidConfig(ConfigError::CapacityExceeded {
            required: 4 + 8 + 2 + 4 + 8000,
            capacity: PAGE_SIZE,
        });

        let mut buf = vec![0xEEu8; PAGE_SIZE];
        assert_eq!(
            Node::init_with_config(buf.as_mut_slice(), oversized, NodeType::Leaf, 1).unwrap_err(),
            expected
        );
        assert!(buf.iter().all(|&b| b == 0xEE));

        let node = example_leaf();
        assert_eq!(
            Node::open_with_config(node.as_bytes(), oversized).unwrap_err(),
            expected
        );

        // The largest config that still fits is accepted.
        let exact = NodeConfig {
            max_key_size: 1000,
            max_val_size: 3078,
        };
        assert!(Node::init_with_config(Page::new(), exact, NodeType::Leaf, 1).is_ok());
    }

    #[test]
    fn test_too_many_keys_leaves_buffer_untouched() {
        let mut buf = vec![0xEEu8; PAGE_SIZE];
        assert_eq!(
            Node::init(buf.as_mut_slice(), NodeType::Leaf, 410).unwrap_err(),
            NodeError::TooManyKeys { key_count: 410 }
        );
        assert!(buf.iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn test_open_rejects_malformed_buffers() {
        let short = vec![0u8; PAGE_SIZE - 1];
        assert_eq!(
            Node::open(short.as_slice()).unwrap_err(),
            NodeError::BufferTooSmall {
                len: PAGE_SIZE - 1,
                required: PAGE_SIZE
            }
        );

        let zeroed = Page::new();
        assert_eq!(
            Node::open(zeroed.as_bytes().as_slice()).unwrap_err(),
            NodeError::InvalidNodeType(0)
        );

        let mut bytes = [0u8; PAGE_SIZE];
        bytes[0] = 2;
        bytes[2..4].copy_from_slice(&410u16.to_le_bytes());
        assert_eq!(
            Node::open(bytes.as_slice()).unwrap_err(),
            NodeError::TooManyKeys { key_count: 410 }
        );
    }

    #[test]
    fn test_set_header_rejects_too_many_keys() {
        assert_eq!(
            Node::init(Page::new(), NodeType::Leaf, 410).unwrap_err(),
            NodeError::TooManyKeys { key_count: 410 }
        );
        assert!(Node::init(Page::new(), NodeType::Leaf, 409).is_ok());
    }

    #[test]
    fn test_init_zeroes_reused_buffer() {
        let node = example_leaf();
        let page = node.into_inner();

        let mut node = Node::init(page, NodeType::Internal, 1).unwrap();
        assert!(node.as_bytes()[4..].iter().all(|&b| b == 0));
        node.append_kv(0, 99, b"k", b"").unwrap();
        assert_eq!(node.pointer(0).unwrap(), 99);
    }

    #[test]
    fn test_larger_buffer_uses_first_page() {
        let mut buf = vec![0xAAu8; PAGE_SIZE + 100];
        {
            let mut node = Node::init(buf.as_mut_slice(), NodeType::Leaf, 1).unwrap();
            node.append_kv(0, 0, b"k", b"v").unwrap();
            assert_eq!(node.as_bytes().len(), PAGE_SIZE);
        }
        assert!(buf[PAGE_SIZE..].iter().all(|&b| b == 0xAA));

        let node = Node::open(buf).unwrap();
        assert_eq!(node.value(0).unwrap(), b"v");
    }

    #[test]
    fn test_corrupt_lengths_do_not_panic() {
        let node = example_leaf();
        let mut bytes = node.as_bytes().to_vec();
        // Key length of record 1 claims 0xFFFF bytes.
        bytes[32] = 0xFF;
        bytes[33] = 0xFF;

        let node = Node::open(bytes).unwrap();
        assert_eq!(node.key(0).unwrap(), b"k1");
        assert_eq!(
            node.key(1).unwrap_err(),
            NodeError::Corrupt {
                idx: 1,
                reason: "record extends past the page"
            }
        );
        assert!(node.verify().is_err());
    }

    #[test]
    fn test_corrupt_offset_detected() {
        let node = example_leaf();
        let mut bytes = node.as_bytes().to_vec();
        // offset[1] = 9 instead of 8.
        bytes[20] = 9;

        let node = Node::open(bytes).unwrap();
        assert_eq!(
            node.verify().unwrap_err(),
            NodeError::Corrupt {
                idx: 0,
                reason: "offset does not match record length"
            }
        );

        let mut bytes = node.into_inner();
        // offset[1] far past the page.
        bytes[20..22].copy_from_slice(&u16::MAX.to_le_bytes());
        let node = Node::open(bytes).unwrap();
        assert_eq!(
            node.kv_position(1).unwrap_err(),
            NodeError::Corrupt {
                idx: 1,
                reason: "offset points past the page"
            }
        );
    }

    #[test]
    fn test_checksum() {
        let node = example_leaf();
        let checksum = node.checksum().unwrap();
        assert_eq!(checksum, crc32fast::hash(&node.as_bytes()[..43]));
        node.verify_checksum(checksum).unwrap();

        let mut bytes = node.as_bytes().to_vec();
        bytes[40] ^= 0x01;
        let node = Node::open(bytes).unwrap();
        assert!(matches!(
            node.verify_checksum(checksum),
            Err(NodeError::ChecksumMismatch { expected, .. }) if expected == checksum
        ));
    }

    #[test]
    fn test_entries_iterator() {
        let node = example_leaf();
        let entries: Vec<Entry<'_>> = node.entries().collect::<Result<_, _>>().unwrap();

        assert_eq!(node.entries().len(), 2);
        assert_eq!(
            entries,
            vec![
                Entry {
                    pointer: 0,
                    key: b"k1",
                    value: b"hi"
                },
                Entry {
                    pointer: 0,
                    key: b"k3",
                    value: b"hello"
                },
            ]
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            NodeError::OutOfRange {
                idx: 3,
                key_count: 2
            }
            .to_string(),
            "index 3 out of range for node with 2 keys"
        );
        assert_eq!(
            NodeError::PageFull {
                required: 5000,
                capacity: 4096
            }
            .to_string(),
            "node needs 5000 bytes but a page holds 4096"
        );
        assert_eq!(
            NodeError::AppendOutOfOrder { idx: 4 }.to_string(),
            "entry 4 appended out of order"
        );
        assert_eq!(
            NodeError::InvalidConfig(ConfigError::CapacityExceeded {
                required: 5000,
                capacity: 4096
            })
            .to_string(),
            "invalid node config: node with one maximum-size entry needs 5000 bytes but a page holds 4096"
        );
    }
}
