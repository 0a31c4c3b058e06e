//! # Message Registry - Identifier to Constructor Lookup
//!
//! ## Purpose
//!
//! Maps numeric message identifiers to constructors for the concrete types
//! of a message set. The table is built once from descriptors known at
//! compile time, sorted by identifier and never modified afterwards, so one
//! registry can be shared by every stack speaking the protocol.
//!
//! ## Duplicate Identifiers
//!
//! Several types may share an identifier (protocol variants distinguished by
//! payload content). Entries with equal ids keep their registration order and
//! are addressed by occurrence index; the id layer tries them in turn when a
//! payload read rejects the data.
//!
//! ## Performance Profile
//!
//! - **Lookup**: binary search over a contiguous slice, `O(log n)`
//! - **Construction**: plain `fn() -> M` pointers, no boxing or captures

use std::fmt;
use strata_types::Message;

/// Constructor producing a default-initialized message of one concrete type
pub type Constructor<M> = fn() -> M;

/// Static description of one registrable message type
pub struct Descriptor<M: Message> {
    pub id: M::Id,
    pub name: &'static str,
    pub construct: Constructor<M>,
}

impl<M: Message> Descriptor<M> {
    pub fn new(id: M::Id, name: &'static str, construct: Constructor<M>) -> Self {
        Self {
            id,
            name,
            construct,
        }
    }
}

impl<M: Message> Clone for Descriptor<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Message> Copy for Descriptor<M> {}

impl<M: Message> fmt::Debug for Descriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// A message type whose variants are known at compile time
///
/// Implemented by the enums generated with [`message_set!`](crate::message_set).
pub trait MessageSet: Message + Sized {
    /// One descriptor per concrete type, in registration order
    fn descriptors() -> Vec<Descriptor<Self>>;
}

/// Sorted, immutable identifier table
#[derive(Debug)]
pub struct MessageRegistry<M: Message> {
    entries: Vec<Descriptor<M>>,
}

impl<M: Message> MessageRegistry<M> {
    /// Build a registry from descriptors; equal ids keep their relative order
    pub fn new(mut entries: Vec<Descriptor<M>>) -> Self {
        entries.sort_by_key(|entry| entry.id);
        Self { entries }
    }

    /// Registry that recognizes no identifier
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry covering every type of a message set
    pub fn from_set() -> Self
    where
        M: MessageSet,
    {
        Self::new(M::descriptors())
    }

    /// First constructor registered for `id`
    pub fn lookup(&self, id: M::Id) -> Option<Constructor<M>> {
        self.lookup_nth(id, 0)
    }

    /// Constructor of the `occurrence`-th type registered for `id`
    pub fn lookup_nth(&self, id: M::Id, occurrence: usize) -> Option<Constructor<M>> {
        self.variants(id).get(occurrence).map(|entry| entry.construct)
    }

    /// Number of types registered for `id`
    pub fn count(&self, id: M::Id) -> usize {
        self.variants(id).len()
    }

    /// The run of entries sharing `id`, in registration order
    pub fn variants(&self, id: M::Id) -> &[Descriptor<M>] {
        let start = self.entries.partition_point(|entry| entry.id < id);
        let len = self.entries[start..].partition_point(|entry| entry.id == id);
        &self.entries[start..start + len]
    }

    /// Distinct identifiers in ascending order
    pub fn ids(&self) -> Vec<M::Id> {
        let mut ids: Vec<M::Id> = self.entries.iter().map(|entry| entry.id).collect();
        ids.dedup();
        ids
    }

    pub fn descriptors(&self) -> &[Descriptor<M>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
