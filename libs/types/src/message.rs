//! The message contract shared by concrete messages and message sets

use crate::error::ProtocolResult;
use crate::sink::ByteSink;
use crate::wire::WireInt;
use std::fmt;

/// One application-level unit carried in a frame payload
///
/// `length()` must equal the number of bytes the next `write` produces;
/// size layers rely on it before any byte is emitted.
pub trait Message: fmt::Debug {
    /// Numeric identifier type used by the protocol's id field
    type Id: WireInt;

    fn id(&self) -> Self::Id;

    /// Static type name used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Populate fields from the front of `buf`, advancing it by exactly the
    /// bytes consumed on success
    fn read(&mut self, buf: &mut &[u8]) -> ProtocolResult<()>;

    fn write(&self, sink: &mut dyn ByteSink) -> ProtocolResult<()>;

    fn length(&self) -> usize;

    /// All fields hold acceptable values
    fn valid(&self) -> bool {
        true
    }
}

/// Concrete message type with an identifier known at compile time
///
/// Registries are built from these constants, never from an instance.
pub trait StaticMessage: Message + Default {
    const MSG_ID: Self::Id;
    const NAME: &'static str;
}
