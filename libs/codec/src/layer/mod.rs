//! # Protocol Layers - One Transport Concern per Stage
//!
//! ## Purpose
//!
//! A protocol stack is a strict linear chain of layers, outermost first,
//! terminated by [`PayloadLayer`]. Each layer owns exactly one wire field
//! (sync marker, size, identifier, checksum) and its next inner layer. It
//! validates or produces its field and delegates the remaining bytes.
//!
//! ## Contracts
//!
//! - **read**: consumes from the front of `buf` only; on
//!   `NotEnoughData` the caller retries the whole stack from the same
//!   position once more input arrived. On any failure the message slot is
//!   left empty.
//! - **write**: emits this layer's field and delegates. A layer whose value
//!   depends on later bytes either completes in the same pass (random-access
//!   sinks) or leaves a placeholder and returns
//!   [`WriteStatus::UpdateRequired`].
//! - **update**: second pass over the exact bytes produced by `write`,
//!   patching placeholders in place.
//! - **length**: pure; equals the number of bytes `write` produces.
//!
//! ## Reference Composition
//!
//! ```text
//! SyncLayer → ChecksumLayer → SizeLayer → IdLayer → PayloadLayer
//!   SYNC(2B) | SIZE(2B) | ID(1B) | PAYLOAD | CHECKSUM(2B)
//! ```

mod checksum;
mod id;
mod payload;
mod size;
mod sync;

pub use checksum::ChecksumLayer;
pub use id::IdLayer;
pub use payload::PayloadLayer;
pub use size::SizeLayer;
pub use sync::SyncLayer;

use std::ops::DerefMut;
use strata_types::{Message, OutputSink, ProtocolResult, Status};

/// Successful write outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Every byte holds its final value
    Complete,
    /// A field holds a placeholder; run `update` over the written bytes
    UpdateRequired,
}

impl WriteStatus {
    /// Outcome of a layer given the outcome of its inner layers
    pub fn and(self, inner: WriteStatus) -> WriteStatus {
        match (self, inner) {
            (WriteStatus::Complete, WriteStatus::Complete) => WriteStatus::Complete,
            _ => WriteStatus::UpdateRequired,
        }
    }

    pub fn status(self) -> Status {
        match self {
            WriteStatus::Complete => Status::Success,
            WriteStatus::UpdateRequired => Status::UpdateRequired,
        }
    }
}

/// One stage of a protocol stack
pub trait ProtocolLayer {
    type Message: Message;

    /// Owning handle to a message produced while reading
    type MsgPtr: DerefMut<Target = Self::Message>;

    /// Decode one frame from the front of `buf`, returning bytes consumed
    ///
    /// On success `msg` holds the populated message; on failure it is empty.
    fn read(&mut self, msg: &mut Option<Self::MsgPtr>, buf: &[u8]) -> ProtocolResult<usize>;

    fn write<S: OutputSink>(&self, msg: &Self::Message, sink: &mut S)
        -> ProtocolResult<WriteStatus>;

    /// Patch placeholders in `buf`, which starts at this layer's first byte
    fn update(&self, msg: &Self::Message, buf: &mut [u8]) -> ProtocolResult<usize>;

    /// Serialized length of this layer and everything inside it
    fn length(&self, msg: &Self::Message) -> usize;

    /// Tell the nearest inner size layer that an outer layer appends
    /// `bytes` after the inner chain and the size must count them
    fn cover_trailing(&mut self, bytes: usize);

    /// First byte of every frame, if the stack has a fixed one
    fn frame_marker(&self) -> Option<u8> {
        None
    }
}
