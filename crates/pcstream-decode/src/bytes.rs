//! Little-endian field readers.
//!
//! Readers return `None` instead of panicking when the field would extend
//! past the end of the buffer, so callers can choose between failing and
//! skipping.

#[inline]
fn field<const N: usize>(bytes: &[u8], at: usize) -> Option<[u8; N]> {
    bytes.get(at..at.checked_add(N)?)?.try_into().ok()
}

#[inline]
pub(crate) fn u8_at(bytes: &[u8], at: usize) -> Option<u8> {
    bytes.get(at).copied()
}

#[inline]
pub(crate) fn u16_at(bytes: &[u8], at: usize) -> Option<u16> {
    field(bytes, at).map(u16::from_le_bytes)
}

#[inline]
pub(crate) fn u32_at(bytes: &[u8], at: usize) -> Option<u32> {
    field(bytes, at).map(u32::from_le_bytes)
}

#[inline]
pub(crate) fn u64_at(bytes: &[u8], at: usize) -> Option<u64> {
    field(bytes, at).map(u64::from_le_bytes)
}

#[inline]
pub(crate) fn i8_at(bytes: &[u8], at: usize) -> Option<i8> {
    field(bytes, at).map(i8::from_le_bytes)
}

#[inline]
pub(crate) fn i16_at(bytes: &[u8], at: usize) -> Option<i16> {
    field(bytes, at).map(i16::from_le_bytes)
}

#[inline]
pub(crate) fn i32_at(bytes: &[u8], at: usize) -> Option<i32> {
    field(bytes, at).map(i32::from_le_bytes)
}

#[inline]
pub(crate) fn i64_at(bytes: &[u8], at: usize) -> Option<i64> {
    field(bytes, at).map(i64::from_le_bytes)
}

#[inline]
pub(crate) fn f32_at(bytes: &[u8], at: usize) -> Option<f32> {
    field(bytes, at).map(f32::from_le_bytes)
}

#[inline]
pub(crate) fn f64_at(bytes: &[u8], at: usize) -> Option<f64> {
    field(bytes, at).map(f64::from_le_bytes)
}
