//! # Strata Protocol Codec - Layered Transport Stacks
//!
//! ## Purpose
//!
//! This crate contains the "Rules" layer of Strata: everything needed to
//! turn a raw byte stream into typed, dispatched messages and back.
//! - Protocol layers (sync marker, size, message id, checksum, payload)
//! - Stack composition through a typed builder
//! - Message registry mapping identifiers to constructors
//! - Allocation policies (heap or a single in-place slot)
//! - Double dispatch of decoded messages to handlers
//! - A streaming frame processor with resynchronization
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → applications / tools
//!     ↑           ↓              ↓
//! Pure Data   Layer Rules    Handlers
//! Fields      Framing        Transports
//! Sinks       Dispatch       CLIs
//! ```
//!
//! ## Receive Path
//!
//! ```text
//! bytes → SyncLayer → ChecksumLayer → SizeLayer → IdLayer → PayloadLayer
//!                                                   │
//!                                     registry + allocation policy
//!                                                   │
//!                               handle ← Message::read ← new message
//! ```
//!
//! Each layer validates its own field and delegates the rest. The id layer
//! creates the message before the payload is read and releases it if any
//! layer fails, so a failed read never leaves a half-populated message.
//!
//! ## Send Path
//!
//! `length()` is computed first, then `write` descends the layers. Random
//! access sinks complete checksums in the same pass; forward-only sinks get a
//! placeholder plus [`WriteStatus::UpdateRequired`] and a later `update`.
//!
//! ## What This Crate Does NOT Contain
//! - Concrete transports (sockets, serial ports)
//! - Field encodings beyond integers and length-prefixed byte runs
//! - Schema languages or reflection

// Macros first so every module can use them
mod macros;

// Core modules
pub mod allocation;
pub mod checksum;
pub mod dispatch;
pub mod layer;
pub mod processor;
pub mod registry;
pub mod stack;

// Re-export key types for convenience
pub use allocation::{
    AllocationPolicy, ConfiguredAllocator, HeapAllocator, InPlaceAllocator, MessageHandle,
    SlotHandle,
};
pub use checksum::{BasicSum, ChecksumAlgorithm, Crc32};
pub use dispatch::{dispatch, Dispatch};
pub use layer::{
    ChecksumLayer, IdLayer, PayloadLayer, ProtocolLayer, SizeLayer, SyncLayer, WriteStatus,
};
pub use processor::{FrameProcessor, ProcessorStats};
pub use registry::{Constructor, Descriptor, MessageRegistry, MessageSet};
pub use stack::{ProtocolStack, ReadOutcome, StackBuilder};

// Re-export the data layer so protocol definitions need one import
pub use strata_config::{AllocationMode, ResyncStrategy, StackConfig};
pub use strata_types::{
    BigEndian, ByteOrder, ByteSink, BytesField, Field, IntField, LittleEndian, Message,
    OutputSink, ProtocolError, ProtocolResult, SliceWriter, StaticMessage, Status, StreamWriter,
    WireInt,
};

#[doc(hidden)]
pub use paste;
