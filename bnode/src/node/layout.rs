//! Position arithmetic for the node page format.
//!
//! Every region's start is derived from the sizes of the regions before it:
//!
//! ```text
//! header      [0, 4)
//! pointers    [4, 4 + 8N)
//! offsets     [4 + 8N, 4 + 10N)      slot j holds offset[j + 1]
//! key-values  [4 + 10N, total_bytes)
//! ```
//!
//! These functions are pure; they never look at page contents.

use crate::config::PAGE_SIZE;

/// Size of the node header: type (2 bytes) + key count (2 bytes).
pub const HEADER_SIZE: usize = 4;

/// Size of one pointer array entry.
pub const POINTER_SIZE: usize = 8;

/// Size of one offset array slot.
pub const OFFSET_SIZE: usize = 2;

/// Size of the length prefix of a KV record: key length + value length.
pub const KV_HEADER_SIZE: usize = 4;

/// Fixed bytes each entry costs outside of its KV record.
const PER_KEY_SIZE: usize = POINTER_SIZE + OFFSET_SIZE;

/// Largest key count whose header, pointer and offset arrays fit in a page.
#[allow(clippy::cast_possible_truncation)] // (4096 - 4) / 10 fits in u16
pub const MAX_KEY_COUNT: u16 = ((PAGE_SIZE - HEADER_SIZE) / PER_KEY_SIZE) as u16;

/// Position of pointer `idx`.
#[must_use]
pub const fn pointer_pos(idx: u16) -> usize {
    HEADER_SIZE + POINTER_SIZE * idx as usize
}

/// Position of the stored slot for `offset[idx]`.
///
/// `offset[0]` is never stored, so `idx` must be at least 1.
#[must_use]
pub const fn offset_pos(key_count: u16, idx: u16) -> usize {
    debug_assert!(idx >= 1, "offset[0] is implicit");
    HEADER_SIZE + POINTER_SIZE * key_count as usize + OFFSET_SIZE * (idx as usize - 1)
}

/// Start of the KV region for a node with `key_count` entries.
#[must_use]
pub const fn kv_region_start(key_count: u16) -> usize {
    HEADER_SIZE + PER_KEY_SIZE * key_count as usize
}

/// Encoded size of a single KV record.
#[must_use]
pub const fn entry_size(key_len: usize, val_len: usize) -> usize {
    KV_HEADER_SIZE + key_len + val_len
}

/// Encoded size of a node with `key_count` entries whose KV records take
/// `kv_bytes` in total.
#[must_use]
pub const fn node_size(key_count: usize, kv_bytes: usize) -> usize {
    HEADER_SIZE + PER_KEY_SIZE * key_count + kv_bytes
}

/// Encoded size of a node holding exactly `entries`, in order.
///
/// The tree layer uses this to decide whether a set of entries needs to be
/// split across pages before encoding any of them.
pub fn encoded_size<'a, I>(entries: I) -> usize
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let (count, kv_bytes) = entries
        .into_iter()
        .fold((0, 0), |(count, bytes), (key, val)| {
            (count + 1, bytes + entry_size(key.len(), val.len()))
        });
    node_size(count, kv_bytes)
}

/// Whether a node holding exactly `entries` fits into one page.
pub fn fits_in_page<'a, I>(entries: I) -> bool
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    encoded_size(entries) <= PAGE_SIZE
}
