//! # Strata Types - Wire Primitives and Message Contract
//!
//! ## Purpose
//!
//! Pure data definitions shared by every Strata crate: the status taxonomy
//! and error type every layer reports through, fixed-width wire integers,
//! the minimal field primitives messages are built from, the byte sinks
//! frames are encoded into, and the [`Message`] trait.
//!
//! ## Architecture Role
//!
//! ```text
//! strata-types  →  strata-codec  →  applications / strata-inspect
//!   (data)           (rules)           (usage)
//! ```
//!
//! Nothing here knows about layers or stacks. The codec crate composes these
//! pieces into framing rules.
//!
//! ## Sink Categories
//!
//! [`OutputSink::RANDOM_ACCESS`] splits sinks into rewindable buffers
//! ([`SliceWriter`], `Vec<u8>`) and forward-only streams ([`StreamWriter`]).
//! Fields whose value depends on bytes written after them are completed in
//! one pass on the former and need a second update pass on the latter.

pub mod error;
pub mod field;
pub mod message;
pub mod sink;
pub mod wire;

pub use error::{ProtocolError, ProtocolResult, Status};
pub use field::{BytesField, Field, IntField};
pub use message::{Message, StaticMessage};
pub use sink::{ByteSink, OutputSink, SliceWriter, StreamWriter};
pub use wire::WireInt;

// Byte order markers used to parameterize fields and layers
pub use byteorder::{BigEndian, ByteOrder, LittleEndian};
