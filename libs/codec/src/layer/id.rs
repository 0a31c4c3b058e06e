use super::{ProtocolLayer, WriteStatus};
use crate::allocation::AllocationPolicy;
use crate::registry::MessageRegistry;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_types::wire;
use strata_types::{ByteOrder, Message, OutputSink, ProtocolError, ProtocolResult, Status, WireInt};
use tracing::trace;

type IdOf<N> = <<N as ProtocolLayer>::Message as Message>::Id;

/// Message identifier; creates the message object for the inner layers
///
/// The message is acquired through the allocation policy before the payload
/// is read and released again if anything inside fails. When several types
/// share the identifier and a payload rejects its data, the next type
/// registered for that identifier is tried.
pub struct IdLayer<E, A, N: ProtocolLayer> {
    registry: Arc<MessageRegistry<N::Message>>,
    allocator: A,
    next: N,
    _order: PhantomData<E>,
}

impl<E: ByteOrder, A, N: ProtocolLayer> IdLayer<E, A, N>
where
    A: AllocationPolicy<N::Message, Handle = N::MsgPtr>,
{
    pub fn new(registry: Arc<MessageRegistry<N::Message>>, allocator: A, next: N) -> Self {
        Self {
            registry,
            allocator,
            next,
            _order: PhantomData,
        }
    }

    pub fn registry(&self) -> &Arc<MessageRegistry<N::Message>> {
        &self.registry
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn next(&self) -> &N {
        &self.next
    }
}

impl<E, A: std::fmt::Debug, N: ProtocolLayer + std::fmt::Debug> std::fmt::Debug for IdLayer<E, A, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdLayer")
            .field("registered", &self.registry.len())
            .field("allocator", &self.allocator)
            .field("next", &self.next)
            .finish()
    }
}

impl<E: ByteOrder, A, N: ProtocolLayer> ProtocolLayer for IdLayer<E, A, N>
where
    A: AllocationPolicy<N::Message, Handle = N::MsgPtr>,
{
    type Message = N::Message;
    type MsgPtr = N::MsgPtr;

    fn read(&mut self, msg: &mut Option<Self::MsgPtr>, buf: &[u8]) -> ProtocolResult<usize> {
        let width = IdOf::<N>::WIDTH;
        let id: IdOf<N> = wire::decode::<IdOf<N>, E>(buf, "message id")?;
        let rest = &buf[width..];

        let variants = self.registry.variants(id);
        if variants.is_empty() {
            trace!(?id, "No message registered for id");
            return Err(ProtocolError::InvalidMsgId {
                id: id.to_u64(),
                registered: self.registry.len(),
            });
        }

        let mut last_err = None;
        for (occurrence, descriptor) in variants.iter().enumerate() {
            *msg = Some(self.allocator.acquire(descriptor.construct)?);
            match self.next.read(msg, rest) {
                Ok(consumed) => {
                    trace!(?id, name = descriptor.name, occurrence, "Message created");
                    return Ok(width + consumed);
                }
                Err(err) => {
                    *msg = None;
                    if err.status() != Status::InvalidData {
                        return Err(err);
                    }
                    trace!(?id, name = descriptor.name, occurrence, %err, "Variant rejected payload");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or(ProtocolError::InvalidMsgId {
            id: id.to_u64(),
            registered: self.registry.len(),
        }))
    }

    fn write<S: OutputSink>(&self, msg: &Self::Message, sink: &mut S) -> ProtocolResult<WriteStatus> {
        wire::encode::<IdOf<N>, E>(msg.id(), sink)?;
        self.next.write(msg, sink)
    }

    fn update(&self, msg: &Self::Message, buf: &mut [u8]) -> ProtocolResult<usize> {
        let width = IdOf::<N>::WIDTH;
        if buf.len() < width {
            return Err(ProtocolError::not_enough_data(width, buf.len(), "id update"));
        }
        let inner = self.next.update(msg, &mut buf[width..])?;
        Ok(width + inner)
    }

    fn length(&self, msg: &Self::Message) -> usize {
        IdOf::<N>::WIDTH + self.next.length(msg)
    }

    fn cover_trailing(&mut self, bytes: usize) {
        self.next.cover_trailing(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{HeapAllocator, InPlaceAllocator, SlotHandle};
    use crate::layer::fixtures::{self, Fixture};
    use crate::layer::PayloadLayer;
    use crate::{define_message, message_set, IntField, StaticMessage};
    use strata_types::{BigEndian, ByteSink, Field};

    /// Single digit; rejects anything above 9
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Digit {
        value: IntField<u8>,
    }

    impl StaticMessage for Digit {
        const MSG_ID: u8 = 0x10;
        const NAME: &'static str = "Digit";
    }

    impl Message for Digit {
        type Id = u8;

        fn id(&self) -> u8 {
            Self::MSG_ID
        }

        fn name(&self) -> &'static str {
            Self::NAME
        }

        fn read(&mut self, buf: &mut &[u8]) -> ProtocolResult<()> {
            let mut cursor = *buf;
            self.value.read(&mut cursor)?;
            if self.value.get() > 9 {
                return Err(ProtocolError::invalid_data(Self::NAME, "not a digit"));
            }
            *buf = cursor;
            Ok(())
        }

        fn write(&self, sink: &mut dyn ByteSink) -> ProtocolResult<()> {
            self.value.write(sink)
        }

        fn length(&self) -> usize {
            self.value.length()
        }
    }

    define_message! {
        /// Any byte, registered under the same id as `Digit`
        pub struct Octet: u8 = 0x10 {
            pub value: IntField<u8>,
        }
    }

    message_set! {
        pub enum Numeric: u8, handler NumericHandler {
            Digit,
            Octet,
        }
    }

    fn numeric_layer() -> IdLayer<BigEndian, HeapAllocator, PayloadLayer<Numeric, Box<Numeric>>> {
        IdLayer::new(
            Arc::new(MessageRegistry::from_set()),
            HeapAllocator,
            PayloadLayer::new(),
        )
    }

    #[test]
    fn test_unknown_id_with_empty_registry() {
        let mut layer: IdLayer<BigEndian, HeapAllocator, PayloadLayer<Fixture, Box<Fixture>>> =
            IdLayer::new(Arc::new(MessageRegistry::empty()), HeapAllocator, PayloadLayer::new());
        let mut msg = None;
        let err = layer.read(&mut msg, &[0x01, 0x12, 0x34]).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidMsgId { id: 1, registered: 0 });
        assert_eq!(err.status(), Status::InvalidMsgId);
        assert!(msg.is_none());
    }

    #[test]
    fn test_known_id_constructs_matching_type() {
        let mut layer = fixtures::id_layer();
        let mut msg = None;
        assert_eq!(layer.read(&mut msg, &[0x02, 0x07, 0x09]).unwrap(), 3);
        match msg.as_deref() {
            Some(Fixture::MsgB(b)) => assert_eq!((b.first.get(), b.second.get()), (7, 9)),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_next_variant_tried_on_invalid_data() {
        let mut layer = numeric_layer();

        let mut msg = None;
        layer.read(&mut msg, &[0x10, 0x05]).unwrap();
        assert!(matches!(msg.as_deref(), Some(Numeric::Digit(_))));

        let mut msg = None;
        layer.read(&mut msg, &[0x10, 0x42]).unwrap();
        assert!(matches!(msg.as_deref(), Some(Numeric::Octet(o)) if o.value.get() == 0x42));
    }

    #[test]
    fn test_short_payload_does_not_retry() {
        let mut layer = numeric_layer();
        let mut msg = None;
        let err = layer.read(&mut msg, &[0x10]).unwrap_err();
        assert_eq!(err.status(), Status::NotEnoughData);
        assert!(msg.is_none());
    }

    #[test]
    fn test_failed_read_releases_in_place_slot() {
        let allocator = InPlaceAllocator::<Fixture>::new();
        let mut layer: IdLayer<BigEndian, InPlaceAllocator<Fixture>, PayloadLayer<Fixture, SlotHandle<Fixture>>> =
            IdLayer::new(fixtures::registry(), allocator, PayloadLayer::new());

        let mut msg = None;
        assert!(layer.read(&mut msg, &[0x01, 0x12]).is_err());
        assert!(msg.is_none());
        assert!(!layer.allocator().is_occupied());

        layer.read(&mut msg, &[0x01, 0x12, 0x34]).unwrap();
        assert!(layer.allocator().is_occupied());

        // previous handle still alive
        let mut second = None;
        let err = layer.read(&mut second, &[0x01, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, ProtocolError::SlotOccupied { occupant: "MsgA" }));

        drop(msg);
        layer.read(&mut second, &[0x02, 0x01, 0x02]).unwrap();
        assert!(matches!(second.as_deref(), Some(Fixture::MsgB(_))));
    }

    #[test]
    fn test_write_prefixes_id() {
        let layer = fixtures::id_layer();
        let mut out = Vec::new();
        layer.write(&fixtures::msg_a(0xBEEF), &mut out).unwrap();
        assert_eq!(out, vec![0x01, 0xBE, 0xEF]);
    }
}
