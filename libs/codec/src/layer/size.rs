use super::{ProtocolLayer, WriteStatus};
use std::marker::PhantomData;
use strata_types::wire;
use strata_types::{ByteOrder, Message, OutputSink, ProtocolError, ProtocolResult, WireInt};
use tracing::trace;

/// Count of the bytes that follow the size field
///
/// The value covers the inner chain plus `trailing` bytes appended by outer
/// layers (typically the checksum). Inner layers only ever see the
/// `value - trailing` bytes of their own window.
#[derive(Debug)]
pub struct SizeLayer<T, E, N> {
    trailing: usize,
    max_frame_size: usize,
    next: N,
    _field: PhantomData<(T, E)>,
}

impl<T: WireInt, E: ByteOrder, N> SizeLayer<T, E, N> {
    pub fn new(next: N) -> Self {
        Self {
            trailing: 0,
            max_frame_size: usize::try_from(T::MAX_U64)
                .unwrap_or(usize::MAX)
                .min(usize::MAX - T::WIDTH),
            next,
            _field: PhantomData,
        }
    }

    /// Largest size value accepted on read and produced on write
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size.min(usize::MAX - T::WIDTH);
        self
    }

    /// Bytes appended after the inner chain that the size value counts
    pub fn trailing(&self) -> usize {
        self.trailing
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn next(&self) -> &N {
        &self.next
    }
}

impl<T: WireInt, E: ByteOrder, N: ProtocolLayer> SizeLayer<T, E, N> {
    fn size_value(&self, msg: &N::Message) -> ProtocolResult<T> {
        let value = self.next.length(msg) + self.trailing;
        if value > self.max_frame_size {
            return Err(ProtocolError::invalid_data(
                msg.name(),
                format!(
                    "framed size {value} exceeds max_frame_size {}",
                    self.max_frame_size
                ),
            ));
        }
        T::try_from_u64(value as u64).ok_or_else(|| {
            ProtocolError::invalid_data(
                msg.name(),
                format!("framed size {value} does not fit a {}-byte size field", T::WIDTH),
            )
        })
    }
}

impl<T: WireInt, E: ByteOrder, N: ProtocolLayer> ProtocolLayer for SizeLayer<T, E, N> {
    type Message = N::Message;
    type MsgPtr = N::MsgPtr;

    fn read(&mut self, msg: &mut Option<Self::MsgPtr>, buf: &[u8]) -> ProtocolResult<usize> {
        let raw = wire::decode::<T, E>(buf, "size field")?.to_u64();
        let min = self.trailing as u64;
        let max = self.max_frame_size as u64;
        if raw < min || raw > max {
            trace!(value = raw, min, max, "Size field out of range");
            return Err(ProtocolError::MalformedSize { value: raw, min, max });
        }

        // bounded by max_frame_size, which leaves room for the field itself
        let declared = raw as usize;
        let total = T::WIDTH
            .checked_add(declared)
            .ok_or(ProtocolError::MalformedSize { value: raw, min, max })?;
        if buf.len() < total {
            return Err(ProtocolError::not_enough_data(total, buf.len(), "sized frame"));
        }

        let window = &buf[T::WIDTH..total - self.trailing];
        match self.next.read(msg, window) {
            Ok(consumed) => {
                if consumed < window.len() {
                    trace!(
                        skipped = window.len() - consumed,
                        "Skipping unread bytes inside sized window"
                    );
                }
                Ok(total - self.trailing)
            }
            Err(ProtocolError::NotEnoughData { need, .. }) => {
                *msg = None;
                Err(ProtocolError::SizeMismatch {
                    declared,
                    need: need + self.trailing,
                    context: "inner layers overran the sized window",
                })
            }
            Err(err) => {
                *msg = None;
                Err(err)
            }
        }
    }

    fn write<S: OutputSink>(&self, msg: &Self::Message, sink: &mut S) -> ProtocolResult<WriteStatus> {
        let value = self.size_value(msg)?;
        wire::encode::<T, E>(value, sink)?;
        self.next.write(msg, sink)
    }

    fn update(&self, msg: &Self::Message, buf: &mut [u8]) -> ProtocolResult<usize> {
        let value = self.size_value(msg)?;
        wire::patch::<T, E>(value, buf, "size update")?;
        let inner = self.next.update(msg, &mut buf[T::WIDTH..])?;
        Ok(T::WIDTH + inner)
    }

    fn length(&self, msg: &Self::Message) -> usize {
        T::WIDTH + self.next.length(msg)
    }

    fn cover_trailing(&mut self, bytes: usize) {
        self.trailing += bytes;
    }
}
