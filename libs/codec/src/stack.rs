//! # Protocol Stack - Assembled Layer Chain
//!
//! ## Purpose
//!
//! [`ProtocolStack`] is the public face of a composed layer chain: it reads
//! one frame into a message handle, writes a message as one frame and runs
//! the update pass for forward-only sinks. [`StackBuilder`] composes the
//! chain from the inside out, taking runtime values (sync marker, frame
//! limit, whether the size counts the checksum) from a [`StackConfig`].
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_codec::{BasicSum, HeapAllocator, MessageRegistry, StackBuilder};
//! # use strata_codec::{define_message, message_set, IntField, Message};
//! # define_message! { pub struct MsgA: u8 = 0x01 { pub value: IntField<u16> } }
//! # message_set! { pub enum Demo: u8, handler DemoHandler { MsgA } }
//!
//! // SYNC(2B) | SIZE(2B) | ID(1B) | PAYLOAD | CHECKSUM(2B)
//! let registry = Arc::new(MessageRegistry::<Demo>::from_set());
//! let mut stack = StackBuilder::new(registry, HeapAllocator)
//!     .size::<u16>()
//!     .checksum(BasicSum::<u16>::new())
//!     .sync::<u16>()?
//!     .build();
//!
//! let frame = stack.encode_to_vec(&Demo::from(MsgA { value: IntField::new(0x1234) }))?;
//! assert_eq!(frame, [0xAB, 0xCD, 0x00, 0x05, 0x01, 0x12, 0x34, 0x00, 0x4C]);
//!
//! let outcome = stack.read(&frame);
//! assert!(outcome.is_success());
//! assert_eq!(outcome.consumed, frame.len());
//! # Ok::<(), strata_codec::ProtocolError>(())
//! ```

use crate::allocation::{AllocationPolicy, ConfiguredAllocator, MessageHandle};
use crate::checksum::ChecksumAlgorithm;
use crate::layer::{
    ChecksumLayer, IdLayer, PayloadLayer, ProtocolLayer, SizeLayer, SyncLayer, WriteStatus,
};
use crate::registry::MessageRegistry;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_config::StackConfig;
use strata_types::{
    BigEndian, ByteOrder, Message, OutputSink, ProtocolError, ProtocolResult, Status, WireInt,
};
use tracing::debug;

/// Result of reading one frame
///
/// On success `message` holds the populated handle; on failure it is empty,
/// nothing is consumed and `error` carries the diagnosis.
#[derive(Debug)]
pub struct ReadOutcome<P> {
    pub status: Status,
    pub message: Option<P>,
    pub consumed: usize,
    pub error: Option<ProtocolError>,
}

impl<P> ReadOutcome<P> {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Convert into a `Result`, keeping the handle and consumed count
    pub fn into_result(self) -> ProtocolResult<(P, usize)> {
        match (self.message, self.error) {
            (Some(message), None) => Ok((message, self.consumed)),
            (_, Some(err)) => Err(err),
            (None, None) => Err(ProtocolError::MissingMessage {
                context: "read outcome",
            }),
        }
    }
}

/// A complete layer chain ready to read and write frames
#[derive(Debug)]
pub struct ProtocolStack<L> {
    layers: L,
}

impl<L: ProtocolLayer> ProtocolStack<L> {
    pub fn new(layers: L) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &L {
        &self.layers
    }

    /// Read one frame from the front of `buf`
    pub fn read(&mut self, buf: &[u8]) -> ReadOutcome<L::MsgPtr> {
        match self.try_read(buf) {
            Ok((message, consumed)) => ReadOutcome {
                status: Status::Success,
                message: Some(message),
                consumed,
                error: None,
            },
            Err(err) => ReadOutcome {
                status: err.status(),
                message: None,
                consumed: 0,
                error: Some(err),
            },
        }
    }

    /// Read one frame, returning the message handle and bytes consumed
    pub fn try_read(&mut self, buf: &[u8]) -> ProtocolResult<(L::MsgPtr, usize)> {
        let mut slot = None;
        let consumed = self.layers.read(&mut slot, buf)?;
        let message = slot.ok_or(ProtocolError::MissingMessage {
            context: "stack read",
        })?;
        debug!(name = message.name(), consumed, "Frame decoded");
        Ok((message, consumed))
    }

    /// Write `msg` as one frame
    ///
    /// Fails with `BufferOverflow` before writing anything if the sink cannot
    /// hold the whole frame. On [`WriteStatus::UpdateRequired`] the frame is
    /// not final until [`update`](Self::update) ran over the written bytes.
    pub fn write<S: OutputSink>(&self, msg: &L::Message, sink: &mut S) -> ProtocolResult<WriteStatus> {
        let length = self.length(msg);
        if sink.remaining() < length {
            return Err(ProtocolError::buffer_overflow(
                length,
                sink.remaining(),
                "stack write",
            ));
        }

        let status = self.layers.write(msg, sink)?;
        debug!(name = msg.name(), length, ?status, "Frame encoded");
        Ok(status)
    }

    /// Second pass over a frame written to a forward-only sink
    ///
    /// `buf` must start at the frame's first byte and hold the whole frame.
    pub fn update(&self, msg: &L::Message, buf: &mut [u8]) -> ProtocolResult<usize> {
        self.layers.update(msg, buf)
    }

    /// Exact framed length of `msg`
    pub fn length(&self, msg: &L::Message) -> usize {
        self.layers.length(msg)
    }

    /// Encode `msg` into a fresh buffer in one pass
    pub fn encode_to_vec(&self, msg: &L::Message) -> ProtocolResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.length(msg));
        if self.write(msg, &mut out)? == WriteStatus::UpdateRequired {
            self.update(msg, &mut out)?;
        }
        Ok(out)
    }

    /// First byte of every frame, when the outermost layer is a sync marker
    pub fn frame_marker(&self) -> Option<u8> {
        self.layers.frame_marker()
    }
}

/// Composes a protocol stack from the innermost layer outwards
///
/// Every layer uses the byte order `E`. Call
/// [`with_config`](Self::with_config) before adding layers whose runtime
/// values come from the configuration.
pub struct StackBuilder<E, L> {
    layers: L,
    config: StackConfig,
    _order: PhantomData<E>,
}

impl<M, A> StackBuilder<BigEndian, IdLayer<BigEndian, A, PayloadLayer<M, A::Handle>>>
where
    M: Message,
    A: AllocationPolicy<M>,
{
    /// Big-endian stack with an id layer over `registry`
    pub fn new(registry: Arc<MessageRegistry<M>>, allocator: A) -> Self {
        Self::with_byte_order(registry, allocator)
    }
}

impl<M: Message> StackBuilder<
    BigEndian,
    IdLayer<BigEndian, ConfiguredAllocator<M>, PayloadLayer<M, MessageHandle<M>>>,
> {
    /// Big-endian stack whose allocation mode and runtime values come from `config`
    pub fn from_config(registry: Arc<MessageRegistry<M>>, config: StackConfig) -> Self {
        let allocator = ConfiguredAllocator::new(config.allocation);
        Self::with_byte_order(registry, allocator).with_config(config)
    }
}

impl<E, M, A> StackBuilder<E, IdLayer<E, A, PayloadLayer<M, A::Handle>>>
where
    E: ByteOrder,
    M: Message,
    A: AllocationPolicy<M>,
{
    /// Stack in byte order `E` with an id layer over `registry`
    pub fn with_byte_order(registry: Arc<MessageRegistry<M>>, allocator: A) -> Self {
        Self {
            layers: IdLayer::new(registry, allocator, PayloadLayer::new()),
            config: StackConfig::default(),
            _order: PhantomData,
        }
    }
}

impl<E: ByteOrder, L: ProtocolLayer> StackBuilder<E, L> {
    /// Use `config` for the layers added after this call
    pub fn with_config(mut self, config: StackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Add a size field counting everything after it
    pub fn size<T: WireInt>(self) -> StackBuilder<E, SizeLayer<T, E, L>> {
        let field_max = usize::try_from(T::MAX_U64).unwrap_or(usize::MAX);
        let max_frame_size = self.config.max_frame_size.min(field_max);
        let layer = SizeLayer::new(self.layers).with_max_frame_size(max_frame_size);
        StackBuilder {
            layers: layer,
            config: self.config,
            _order: PhantomData,
        }
    }

    /// Add a trailing checksum over everything produced so far
    ///
    /// When `size_covers_checksum` is set, an inner size field counts the
    /// checksum bytes.
    pub fn checksum<C: ChecksumAlgorithm>(mut self, algorithm: C) -> StackBuilder<E, ChecksumLayer<C, E, L>> {
        if self.config.size_covers_checksum {
            self.layers.cover_trailing(C::Value::WIDTH);
        }
        let StackBuilder { layers, config, .. } = self;
        StackBuilder {
            layers: ChecksumLayer::new(algorithm, layers),
            config,
            _order: PhantomData,
        }
    }

    /// Add a sync marker using the configured `sync_marker`
    pub fn sync<T: WireInt>(self) -> ProtocolResult<StackBuilder<E, SyncLayer<T, E, L>>> {
        let marker = T::try_from_u64(self.config.sync_marker).ok_or_else(|| {
            ProtocolError::InvalidConfig(format!(
                "sync_marker {:#x} does not fit a {}-byte field",
                self.config.sync_marker,
                T::WIDTH
            ))
        })?;
        Ok(self.sync_marker(marker))
    }

    /// Add a sync marker with an explicit value
    pub fn sync_marker<T: WireInt>(self, marker: T) -> StackBuilder<E, SyncLayer<T, E, L>> {
        let StackBuilder { layers, config, .. } = self;
        StackBuilder {
            layers: SyncLayer::new(marker, layers),
            config,
            _order: PhantomData,
        }
    }

    pub fn build(self) -> ProtocolStack<L> {
        ProtocolStack::new(self.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::HeapAllocator;
    use crate::checksum::BasicSum;
    use crate::layer::fixtures::{self, Fixture};
    use strata_config::AllocationMode;
    use strata_types::{LittleEndian, SliceWriter, StreamWriter};

    const REFERENCE_FRAME: [u8; 9] = [0xAB, 0xCD, 0x00, 0x05, 0x01, 0x12, 0x34, 0x00, 0x4C];

    fn reference_stack(
    ) -> ProtocolStack<impl ProtocolLayer<Message = Fixture, MsgPtr = Box<Fixture>>> {
        StackBuilder::new(fixtures::registry(), HeapAllocator)
            .size::<u16>()
            .checksum(BasicSum::<u16>::new())
            .sync::<u16>()
            .unwrap()
            .build()
    }

    #[test]
    fn test_reference_frame_round_trip() {
        let mut stack = reference_stack();
        let msg = fixtures::msg_a(0x1234);
        assert_eq!(stack.length(&msg), REFERENCE_FRAME.len());
        assert_eq!(stack.encode_to_vec(&msg).unwrap(), REFERENCE_FRAME);

        let outcome = stack.read(&REFERENCE_FRAME);
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.consumed, 9);
        let (message, _) = outcome.into_result().unwrap();
        assert!(matches!(&*message, Fixture::MsgA(a) if a.value.get() == 0x1234));
    }

    #[test]
    fn test_failed_read_consumes_nothing() {
        let mut stack = reference_stack();
        let mut frame = REFERENCE_FRAME;
        frame[8] = 0x4D;

        let outcome = stack.read(&frame);
        assert_eq!(outcome.status, Status::ProtocolError);
        assert_eq!(outcome.consumed, 0);
        assert!(outcome.message.is_none());
        assert!(matches!(outcome.error, Some(ProtocolError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_short_slice_overflows_before_writing() {
        let stack = reference_stack();
        let mut buf = [0u8; 8];
        let mut sink = SliceWriter::new(&mut buf);
        let err = stack.write(&fixtures::msg_a(1), &mut sink).unwrap_err();
        assert_eq!(err.status(), Status::BufferOverflow);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_slice_writer_completes_in_one_pass() {
        let stack = reference_stack();
        let mut buf = [0u8; 16];
        let mut sink = SliceWriter::new(&mut buf);
        let status = stack.write(&fixtures::msg_a(0x1234), &mut sink).unwrap();
        assert_eq!(status, WriteStatus::Complete);
        assert_eq!(sink.written(), REFERENCE_FRAME);
    }

    #[test]
    fn test_forward_only_sink_matches_after_update() {
        let stack = reference_stack();
        let msg = fixtures::msg_a(0x1234);

        let mut sink = StreamWriter::new(Vec::new());
        assert_eq!(stack.write(&msg, &mut sink).unwrap(), WriteStatus::UpdateRequired);
        let mut streamed = sink.into_inner();
        assert_ne!(streamed, REFERENCE_FRAME);

        assert_eq!(stack.update(&msg, &mut streamed).unwrap(), REFERENCE_FRAME.len());
        assert_eq!(streamed, REFERENCE_FRAME);
    }

    #[test]
    fn test_sync_marker_must_fit_field() {
        let config = StackConfig {
            sync_marker: 0x1_0000,
            ..StackConfig::default()
        };
        let err = StackBuilder::new(fixtures::registry(), HeapAllocator)
            .with_config(config)
            .sync::<u16>()
            .err()
            .unwrap();
        assert!(matches!(err, ProtocolError::InvalidConfig(_)));
    }

    #[test]
    fn test_size_excluding_checksum() {
        let config = StackConfig {
            size_covers_checksum: false,
            ..StackConfig::default()
        };
        let stack = StackBuilder::new(fixtures::registry(), HeapAllocator)
            .with_config(config)
            .size::<u16>()
            .checksum(BasicSum::<u16>::new())
            .build();
        let frame = stack.encode_to_vec(&fixtures::msg_a(0x1234)).unwrap();
        assert_eq!(frame, [0x00, 0x03, 0x01, 0x12, 0x34, 0x00, 0x4A]);
    }

    #[test]
    fn test_little_endian_stack() {
        let mut stack = StackBuilder::<LittleEndian, _>::with_byte_order(
            fixtures::registry(),
            HeapAllocator,
        )
        .size::<u16>()
        .checksum(BasicSum::<u16>::new())
        .sync::<u16>()
        .unwrap()
        .build();

        let frame = stack.encode_to_vec(&fixtures::msg_a(0x1234)).unwrap();
        assert_eq!(frame, [0xCD, 0xAB, 0x05, 0x00, 0x01, 0x34, 0x12, 0x4C, 0x00]);
        assert!(stack.read(&frame).is_success());
        assert_eq!(stack.frame_marker(), Some(0xCD));
    }

    #[test]
    fn test_from_config_in_place_allocation() {
        let config = StackConfig {
            allocation: AllocationMode::InPlace,
            ..StackConfig::default()
        };
        let mut stack = StackBuilder::from_config(fixtures::registry(), config)
            .size::<u16>()
            .checksum(BasicSum::<u16>::new())
            .sync::<u16>()
            .unwrap()
            .build();

        let (first, _) = stack.try_read(&REFERENCE_FRAME).unwrap();
        let err = stack.try_read(&REFERENCE_FRAME).unwrap_err();
        assert!(matches!(err, ProtocolError::SlotOccupied { .. }));

        drop(first);
        assert!(stack.try_read(&REFERENCE_FRAME).is_ok());
    }
}
