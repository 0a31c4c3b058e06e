//! Fixed-width unsigned integers as they appear on the wire
//!
//! Layer fields (sync markers, sizes, identifiers, checksums) are all
//! unsigned integers of 1, 2, 4 or 8 bytes. [`WireInt`] gives them one
//! endian-parameterized read/write surface so layers stay generic over both
//! width and byte order.

use crate::error::{ProtocolError, ProtocolResult};
use crate::sink::ByteSink;
use byteorder::ByteOrder;
use std::fmt;

/// Widest integer a layer field can hold
pub const MAX_WIRE_WIDTH: usize = 8;

/// Unsigned integer with a fixed serialized width
pub trait WireInt:
    Copy + Default + Eq + Ord + fmt::Debug + fmt::LowerHex + Send + Sync + 'static
{
    /// Serialized width in bytes
    const WIDTH: usize;

    /// Largest representable value, widened
    const MAX_U64: u64;

    /// Decode from the first `WIDTH` bytes of `bytes`
    ///
    /// Callers check the length first; see [`decode`].
    fn read_from<E: ByteOrder>(bytes: &[u8]) -> Self;

    /// Encode into the first `WIDTH` bytes of `out`
    fn write_to<E: ByteOrder>(self, out: &mut [u8]);

    fn to_u64(self) -> u64;

    /// Keep only the low `WIDTH` bytes of `value`
    fn from_u64_truncating(value: u64) -> Self;

    fn try_from_u64(value: u64) -> Option<Self> {
        (value <= Self::MAX_U64).then(|| Self::from_u64_truncating(value))
    }
}

impl WireInt for u8 {
    const WIDTH: usize = 1;
    const MAX_U64: u64 = u8::MAX as u64;

    fn read_from<E: ByteOrder>(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write_to<E: ByteOrder>(self, out: &mut [u8]) {
        out[0] = self;
    }

    fn to_u64(self) -> u64 {
        self as u64
    }

    fn from_u64_truncating(value: u64) -> Self {
        value as u8
    }
}

macro_rules! impl_wire_int {
    ($ty:ty, $width:expr, $read:ident, $write:ident) => {
        impl WireInt for $ty {
            const WIDTH: usize = $width;
            const MAX_U64: u64 = <$ty>::MAX as u64;

            fn read_from<E: ByteOrder>(bytes: &[u8]) -> Self {
                E::$read(bytes)
            }

            fn write_to<E: ByteOrder>(self, out: &mut [u8]) {
                E::$write(out, self)
            }

            fn to_u64(self) -> u64 {
                self as u64
            }

            fn from_u64_truncating(value: u64) -> Self {
                value as $ty
            }
        }
    };
}

impl_wire_int!(u16, 2, read_u16, write_u16);
impl_wire_int!(u32, 4, read_u32, write_u32);
impl_wire_int!(u64, 8, read_u64, write_u64);

/// Decode one integer from the front of `buf`, reporting short input
#[inline]
pub fn decode<T: WireInt, E: ByteOrder>(buf: &[u8], context: &'static str) -> ProtocolResult<T> {
    if buf.len() < T::WIDTH {
        return Err(ProtocolError::not_enough_data(T::WIDTH, buf.len(), context));
    }
    Ok(T::read_from::<E>(buf))
}

/// Encode one integer into a sink
#[inline]
pub fn encode<T: WireInt, E: ByteOrder>(value: T, sink: &mut dyn ByteSink) -> ProtocolResult<()> {
    let mut scratch = [0u8; MAX_WIRE_WIDTH];
    value.write_to::<E>(&mut scratch[..T::WIDTH]);
    sink.put(&scratch[..T::WIDTH])
}

/// Overwrite one integer at the front of an already written span
#[inline]
pub fn patch<T: WireInt, E: ByteOrder>(
    value: T,
    buf: &mut [u8],
    context: &'static str,
) -> ProtocolResult<()> {
    if buf.len() < T::WIDTH {
        return Err(ProtocolError::not_enough_data(T::WIDTH, buf.len(), context));
    }
    value.write_to::<E>(buf);
    Ok(())
}
