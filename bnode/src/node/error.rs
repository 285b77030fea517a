use crate::config::ConfigError;

/// Errors that can occur when reading or writing a node page.
///
/// None of these are fatal to the codec. The tree layer decides whether a
/// condition is a bug (e.g. `OutOfRange`) or an expected boundary (e.g.
/// `PageFull`, which means the node has to be split).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Index is not below the node's key count.
    OutOfRange { idx: u16, key_count: u16 },
    /// Appending the entry would grow the node past the page.
    PageFull { required: usize, capacity: usize },
    /// Key is longer than the configured maximum.
    KeyTooLarge { len: usize, max: usize },
    /// Value is longer than the configured maximum.
    ValueTooLarge { len: usize, max: usize },
    /// Buffer is shorter than a page.
    BufferTooSmall { len: usize, required: usize },
    /// Header carries a type tag other than internal or leaf.
    InvalidNodeType(u16),
    /// Header, pointer and offset arrays alone would not fit in a page.
    TooManyKeys { key_count: u16 },
    /// Entries must be appended once each, in increasing index order from 0.
    AppendOutOfOrder { idx: u16 },
    /// Offsets or record lengths are inconsistent.
    Corrupt { idx: u16, reason: &'static str },
    /// Page checksum does not match the stored one.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Size limits under which a maximum-size entry would not fit a page.
    InvalidConfig(ConfigError),
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { idx, key_count } => {
                write!(f, "index {idx} out of range for node with {key_count} keys")
            }
            Self::PageFull { required, capacity } => {
                write!(f, "node needs {required} bytes but a page holds {capacity}")
            }
            Self::KeyTooLarge { len, max } => {
                write!(f, "key too large: {len} bytes (max {max})")
            }
            Self::ValueTooLarge { len, max } => {
                write!(f, "value too large: {len} bytes (max {max})")
            }
            Self::BufferTooSmall { len, required } => {
                write!(f, "buffer too small: {len} bytes (need {required})")
            }
            Self::InvalidNodeType(tag) => write!(f, "invalid node type: {tag}"),
            Self::TooManyKeys { key_count } => {
                write!(f, "{key_count} keys do not fit in a page")
            }
            Self::AppendOutOfOrder { idx } => {
                write!(f, "entry {idx} appended out of order")
            }
            Self::Corrupt { idx, reason } => write!(f, "corrupt entry {idx}: {reason}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidConfig(err) => write!(f, "invalid node config: {err}"),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}
