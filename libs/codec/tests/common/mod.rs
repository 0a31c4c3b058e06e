//! Shared protocol definitions and stack helpers for codec integration tests

#![allow(dead_code)]

use std::sync::Arc;
use strata_codec::{
    define_message, message_set, BasicSum, BytesField, HeapAllocator, IntField, Message,
    MessageRegistry, ProtocolLayer, ProtocolStack, StackBuilder, StackConfig,
};

/// Reference frame: MsgA(0x1234) on SYNC(2B) | SIZE(2B) | ID(1B) | PAYLOAD | CHECKSUM(2B)
pub const REFERENCE_FRAME: [u8; 9] = [0xAB, 0xCD, 0x00, 0x05, 0x01, 0x12, 0x34, 0x00, 0x4C];

define_message! {
    /// One 16-bit value
    pub struct MsgA: u8 = 0x01 {
        pub value: IntField<u16>,
    }
}

define_message! {
    pub struct MsgB: u8 = 0x02 {
        pub first: IntField<u8>,
        pub second: IntField<u8>,
    }
}

define_message! {
    /// Variable length text
    pub struct Note: u8 = 0x03 {
        pub seq: IntField<u32>,
        pub text: BytesField<u8>,
    }
}

message_set! {
    pub enum TestProtocol: u8, handler TestHandler {
        MsgA,
        MsgB,
        Note,
    }
}

/// Records every message it receives
#[derive(Debug, Default)]
pub struct Recorder {
    pub values: Vec<u16>,
    pub pairs: Vec<(u8, u8)>,
    pub notes: Vec<(u32, Vec<u8>)>,
    pub fallback: usize,
}

impl TestHandler for Recorder {
    fn handle_message(&mut self, _msg: &dyn Message<Id = u8>) {
        self.fallback += 1;
    }

    fn handle_msg_a(&mut self, msg: &MsgA) {
        self.values.push(msg.value.get());
    }

    fn handle_msg_b(&mut self, msg: &MsgB) {
        self.pairs.push((msg.first.get(), msg.second.get()));
    }

    fn handle_note(&mut self, msg: &Note) {
        self.notes.push((msg.seq.get(), msg.text.as_bytes().to_vec()));
    }
}

impl Recorder {
    pub fn total(&self) -> usize {
        self.values.len() + self.pairs.len() + self.notes.len() + self.fallback
    }
}

pub fn msg_a(value: u16) -> TestProtocol {
    MsgA {
        value: IntField::new(value),
    }
    .into()
}

pub fn msg_b(first: u8, second: u8) -> TestProtocol {
    MsgB {
        first: IntField::new(first),
        second: IntField::new(second),
    }
    .into()
}

pub fn note(seq: u32, text: &[u8]) -> TestProtocol {
    Note {
        seq: IntField::new(seq),
        text: BytesField::new(text),
    }
    .into()
}

pub fn registry() -> Arc<MessageRegistry<TestProtocol>> {
    Arc::new(MessageRegistry::from_set())
}

/// Reference stack over the test protocol with boxed messages
pub fn reference_stack(
) -> ProtocolStack<impl ProtocolLayer<Message = TestProtocol, MsgPtr = Box<TestProtocol>>> {
    StackBuilder::new(registry(), HeapAllocator)
        .size::<u16>()
        .checksum(BasicSum::<u16>::new())
        .sync::<u16>()
        .expect("default sync marker fits u16")
        .build()
}

/// Reference layout with allocation and resync taken from `config`
pub fn configured_stack(
    registry: Arc<MessageRegistry<TestProtocol>>,
    config: StackConfig,
) -> ProtocolStack<impl ProtocolLayer<Message = TestProtocol>> {
    StackBuilder::from_config(registry, config)
        .size::<u16>()
        .checksum(BasicSum::<u16>::new())
        .sync::<u16>()
        .expect("sync marker fits u16")
        .build()
}

/// Encode with the reference stack
pub fn frame(msg: &TestProtocol) -> Vec<u8> {
    reference_stack()
        .encode_to_vec(msg)
        .expect("test message encodes")
}
