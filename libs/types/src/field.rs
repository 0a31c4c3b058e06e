//! Minimal field primitives
//!
//! Messages are sequences of fields. Only the shapes the layer contracts
//! need are provided here: a fixed-width integer and a length-prefixed byte
//! run. Richer encodings belong to the application.

use crate::error::{ProtocolError, ProtocolResult};
use crate::sink::ByteSink;
use crate::wire::{self, WireInt};
use byteorder::{BigEndian, ByteOrder};
use std::marker::PhantomData;

/// One serializable unit of a message
pub trait Field {
    type Value: ?Sized;

    fn value(&self) -> &Self::Value;

    /// Exact serialized size of the current value
    fn length(&self) -> usize;

    fn valid(&self) -> bool {
        true
    }

    /// Consume this field from the front of `buf`
    ///
    /// `buf` only advances on success.
    fn read(&mut self, buf: &mut &[u8]) -> ProtocolResult<()>;

    fn write(&self, sink: &mut dyn ByteSink) -> ProtocolResult<()>;
}

/// Fixed-width unsigned integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntField<T, E = BigEndian> {
    value: T,
    _order: PhantomData<E>,
}

impl<T: WireInt, E: ByteOrder> IntField<T, E> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            _order: PhantomData,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: WireInt, E: ByteOrder> Field for IntField<T, E> {
    type Value = T;

    fn value(&self) -> &T {
        &self.value
    }

    fn length(&self) -> usize {
        T::WIDTH
    }

    fn read(&mut self, buf: &mut &[u8]) -> ProtocolResult<()> {
        self.value = wire::decode::<T, E>(buf, "integer field")?;
        *buf = &buf[T::WIDTH..];
        Ok(())
    }

    fn write(&self, sink: &mut dyn ByteSink) -> ProtocolResult<()> {
        wire::encode::<T, E>(self.value, sink)
    }
}

/// Byte run prefixed by its length as an `L` integer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BytesField<L = u8, E = BigEndian> {
    data: Vec<u8>,
    _prefix: PhantomData<(L, E)>,
}

impl<L: WireInt, E: ByteOrder> BytesField<L, E> {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            _prefix: PhantomData,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn set(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
    }
}

impl<L: WireInt, E: ByteOrder> Field for BytesField<L, E> {
    type Value = [u8];

    fn value(&self) -> &[u8] {
        &self.data
    }

    fn length(&self) -> usize {
        L::WIDTH + self.data.len()
    }

    /// The prefix must be able to express the run length
    fn valid(&self) -> bool {
        self.data.len() as u64 <= L::MAX_U64
    }

    fn read(&mut self, buf: &mut &[u8]) -> ProtocolResult<()> {
        let raw = wire::decode::<L, E>(buf, "byte run length")?.to_u64();
        let len = usize::try_from(raw).map_err(|_| {
            ProtocolError::invalid_data("byte run", format!("length {raw} exceeds address space"))
        })?;
        if len > buf.len() - L::WIDTH {
            let need = L::WIDTH.saturating_add(len);
            return Err(ProtocolError::not_enough_data(need, buf.len(), "byte run"));
        }
        let total = L::WIDTH + len;
        self.data.clear();
        self.data.extend_from_slice(&buf[L::WIDTH..total]);
        *buf = &buf[total..];
        Ok(())
    }

    fn write(&self, sink: &mut dyn ByteSink) -> ProtocolResult<()> {
        let len = L::try_from_u64(self.data.len() as u64).ok_or_else(|| {
            ProtocolError::invalid_data(
                "byte run",
                format!("{} bytes exceed the {}-byte length prefix", self.data.len(), L::WIDTH),
            )
        })?;
        if sink.remaining() < self.length() {
            return Err(ProtocolError::buffer_overflow(
                self.length(),
                sink.remaining(),
                "byte run",
            ));
        }
        wire::encode::<L, E>(len, sink)?;
        sink.put(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::LittleEndian;

    #[test]
    fn test_int_field_read_advances_cursor() {
        let bytes = [0x12, 0x34, 0xFF];
        let mut cursor = &bytes[..];
        let mut field = IntField::<u16>::default();
        field.read(&mut cursor).unwrap();
        assert_eq!(field.get(), 0x1234);
        assert_eq!(cursor, &[0xFF]);
    }

    #[test]
    fn test_int_field_short_read_leaves_cursor() {
        let bytes = [0x12];
        let mut cursor = &bytes[..];
        let mut field = IntField::<u32, LittleEndian>::default();
        assert!(field.read(&mut cursor).is_err());
        assert_eq!(cursor.len(), 1);
    }

    #[test]
    fn test_bytes_field_huge_prefix_is_not_enough_data() {
        let bytes = [0xFF; 9];
        let mut cursor = &bytes[..];
        let mut field = BytesField::<u64>::default();
        let err = field.read(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::NotEnoughData { need: usize::MAX, got: 9, .. }
        ) || matches!(err, ProtocolError::InvalidData { .. }));
        assert_eq!(cursor.len(), 9);

        let bytes = [0x00, 0x00, 0x00, 0x05, b'a', b'b'];
        let mut cursor = &bytes[..];
        let err = BytesField::<u32>::default().read(&mut cursor).unwrap_err();
        assert_eq!(err, ProtocolError::not_enough_data(9, 6, "byte run"));
    }

    #[test]
    fn test_bytes_field_layout() {
        let field = BytesField::<u8>::new(b"hi".to_vec());
        let mut out = Vec::new();
        field.write(&mut out).unwrap();
        assert_eq!(out, vec![2, b'h', b'i']);
        assert_eq!(field.length(), out.len());

        let mut decoded = BytesField::<u8>::default();
        let mut cursor = &out[..];
        decoded.read(&mut cursor).unwrap();
        assert_eq!(decoded.as_bytes(), b"hi");
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_bytes_field_rejects_oversized_run() {
        let field = BytesField::<u8>::new(vec![0u8; 300]);
        assert!(!field.valid());
        let mut out = Vec::new();
        let err = field.write(&mut out).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidData { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_bytes_field_truncated_run() {
        let bytes = [5, 1, 2];
        let mut cursor = &bytes[..];
        let mut field = BytesField::<u8>::default();
        let err = field.read(&mut cursor).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(cursor.len(), 3);
    }
}
