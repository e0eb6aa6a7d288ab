//! Compiled value precision.
//!
//! Exactly one scalar precision is baked into the engine at build time and
//! recorded in the store header flags: `f32` by default, `f64` behind the
//! `double` feature. A file written by one build is rejected by the other
//! at open time.

use std::cmp::Ordering;

#[cfg(feature = "double")]
pub type Value = f64;

#[cfg(not(feature = "double"))]
pub type Value = f32;

/// Width of one encoded value field.
pub const VALUE_SIZE: usize = std::mem::size_of::<Value>();

/// Sentinel for derived statistics that have not been computed.
pub const UNKNOWN: Value = Value::INFINITY;

/// Total order over values, used to sort the median scratch buffer.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    a.total_cmp(b)
}

/// Affine remap of `value` from `[min_a, max_a]` to `[min_b, max_b]`.
///
/// Division by zero when `min_a == max_a` is not special-cased; callers
/// must guard single-valued ranges.
pub fn remap(value: Value, min_a: Value, max_a: Value, min_b: Value, max_b: Value) -> Value {
    (value - min_a) * (max_b - min_b) / (max_a - min_a) + min_b
}

/// Decode one little-endian value field at `offset`.
pub(crate) fn read_value(bytes: &[u8], offset: usize) -> Value {
    let mut buf = [0u8; VALUE_SIZE];
    buf.copy_from_slice(&bytes[offset..offset + VALUE_SIZE]);
    Value::from_le_bytes(buf)
}
