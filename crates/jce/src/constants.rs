//! Wire type ids and decoder limits.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

/// Longest string payload accepted by the decoder (100 MiB).
pub const MAX_STRING_LENGTH: usize = 100 * 1024 * 1024;

/// Largest element count accepted for lists, maps and simple lists.
pub const MAX_CONTAINER_SIZE: usize = 10_000_000;

/// Deepest container nesting accepted by every decoder.
pub const MAX_DEPTH: usize = 100;

/// Tags up to this value fit in the header's high nibble.
pub const MAX_INLINE_TAG: u8 = 14;

/// The 4-bit type id carried in the low nibble of every header byte.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize,
)]
#[repr(u8)]
pub enum WireType {
    Int1 = 0,
    Int2 = 1,
    Int4 = 2,
    Int8 = 3,
    Float = 4,
    Double = 5,
    String1 = 6,
    String4 = 7,
    Map = 8,
    List = 9,
    StructBegin = 10,
    StructEnd = 11,
    ZeroTag = 12,
    SimpleList = 13,
}
