use super::{ProtocolLayer, WriteStatus};
use std::marker::PhantomData;
use strata_types::wire::{self, MAX_WIRE_WIDTH};
use strata_types::{ByteOrder, OutputSink, ProtocolError, ProtocolResult, WireInt};
use tracing::trace;

/// Leading constant marker that delimits frames
///
/// A mismatch is reported as soon as the bytes available disagree with the
/// marker, even before all of its bytes have arrived.
#[derive(Debug)]
pub struct SyncLayer<T, E, N> {
    marker: T,
    encoded: [u8; MAX_WIRE_WIDTH],
    next: N,
    _order: PhantomData<E>,
}

impl<T: WireInt, E: ByteOrder, N> SyncLayer<T, E, N> {
    pub fn new(marker: T, next: N) -> Self {
        let mut encoded = [0u8; MAX_WIRE_WIDTH];
        marker.write_to::<E>(&mut encoded[..T::WIDTH]);
        Self {
            marker,
            encoded,
            next,
            _order: PhantomData,
        }
    }

    pub fn marker(&self) -> T {
        self.marker
    }

    pub fn next(&self) -> &N {
        &self.next
    }

    fn marker_bytes(&self) -> &[u8] {
        &self.encoded[..T::WIDTH]
    }
}

impl<T: WireInt, E: ByteOrder, N: ProtocolLayer> ProtocolLayer for SyncLayer<T, E, N> {
    type Message = N::Message;
    type MsgPtr = N::MsgPtr;

    fn read(&mut self, msg: &mut Option<Self::MsgPtr>, buf: &[u8]) -> ProtocolResult<usize> {
        let seen = buf.len().min(T::WIDTH);
        if buf[..seen] != self.marker_bytes()[..seen] {
            let mut padded = [0u8; MAX_WIRE_WIDTH];
            padded[..seen].copy_from_slice(&buf[..seen]);
            let actual = T::read_from::<E>(&padded);
            trace!(expected = ?self.marker, ?actual, "Sync marker mismatch");
            return Err(ProtocolError::invalid_sync(
                self.marker.to_u64(),
                actual.to_u64(),
                T::WIDTH,
            ));
        }
        if seen < T::WIDTH {
            return Err(ProtocolError::not_enough_data(T::WIDTH, buf.len(), "sync marker"));
        }

        let consumed = self.next.read(msg, &buf[T::WIDTH..])?;
        Ok(T::WIDTH + consumed)
    }

    fn write<S: OutputSink>(&self, msg: &Self::Message, sink: &mut S) -> ProtocolResult<WriteStatus> {
        wire::encode::<T, E>(self.marker, sink)?;
        self.next.write(msg, sink)
    }

    fn update(&self, msg: &Self::Message, buf: &mut [u8]) -> ProtocolResult<usize> {
        if buf.len() < T::WIDTH {
            return Err(ProtocolError::not_enough_data(T::WIDTH, buf.len(), "sync update"));
        }
        let inner = self.next.update(msg, &mut buf[T::WIDTH..])?;
        Ok(T::WIDTH + inner)
    }

    fn length(&self, msg: &Self::Message) -> usize {
        T::WIDTH + self.next.length(msg)
    }

    fn cover_trailing(&mut self, bytes: usize) {
        self.next.cover_trailing(bytes);
    }

    fn frame_marker(&self) -> Option<u8> {
        self.marker_bytes().first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::fixtures::{self, Fixture, Id};
    use strata_types::{BigEndian, Status};

    fn layer() -> SyncLayer<u16, BigEndian, Id> {
        SyncLayer::new(0xABCD, fixtures::id_layer())
    }

    #[test]
    fn test_marker_then_inner() {
        let mut sync = layer();
        let mut msg = None;
        let consumed = sync.read(&mut msg, &[0xAB, 0xCD, 0x01, 0x12, 0x34]).unwrap();
        assert_eq!(consumed, 5);
        assert!(matches!(msg.as_deref(), Some(Fixture::MsgA(a)) if a.value.get() == 0x1234));
    }

    #[test]
    fn test_partial_marker_waits_for_more() {
        let mut sync = layer();
        let mut msg = None;
        let err = sync.read(&mut msg, &[0xAB]).unwrap_err();
        assert_eq!(err.status(), Status::NotEnoughData);
        assert!(msg.is_none());
    }

    #[test]
    fn test_mismatch_reported_from_first_byte() {
        let mut sync = layer();
        let mut msg = None;
        let err = sync.read(&mut msg, &[0x00]).unwrap_err();
        assert_eq!(err.status(), Status::ProtocolError);

        let err = sync.read(&mut msg, &[0xCD, 0xAB, 0x01]).unwrap_err();
        match err {
            ProtocolError::InvalidSync { diagnosis, .. } => {
                assert_eq!(diagnosis, "byte order (endianness) mismatch")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_write_emits_marker() {
        let sync = layer();
        let mut out = Vec::new();
        let status = sync.write(&fixtures::msg_b(7, 9), &mut out).unwrap();
        assert_eq!(status, WriteStatus::Complete);
        assert_eq!(out, vec![0xAB, 0xCD, 0x02, 7, 9]);
        assert_eq!(sync.length(&fixtures::msg_b(7, 9)), out.len());
        assert_eq!(sync.frame_marker(), Some(0xAB));
    }
}
