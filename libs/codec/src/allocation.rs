//! Allocation policies for messages created by the id layer
//!
//! The id layer never constructs a message directly: it hands the registry's
//! constructor to a policy and stores the returned handle. Dropping the
//! handle destroys the message and, for the in-place policy, frees the slot.

use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use strata_config::AllocationMode;
use strata_types::{Message, ProtocolError, ProtocolResult};
use tracing::{error, trace};

/// Where newly constructed messages live
pub trait AllocationPolicy<M> {
    /// Owning handle; dropping it destroys the message
    type Handle: DerefMut<Target = M>;

    fn acquire(&mut self, construct: fn() -> M) -> ProtocolResult<Self::Handle>;
}

/// Boxes every message; any number may be alive at once
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl<M> AllocationPolicy<M> for HeapAllocator {
    type Handle = Box<M>;

    fn acquire(&mut self, construct: fn() -> M) -> ProtocolResult<Box<M>> {
        Ok(Box::new(construct()))
    }
}

struct Slot<M> {
    occupied: Cell<bool>,
    occupant: Cell<&'static str>,
    value: UnsafeCell<MaybeUninit<M>>,
}

/// Constructs messages into one slot reserved when the allocator is created
///
/// At most one message is alive at a time. Acquiring while the previous
/// handle is still alive fails with [`ProtocolError::SlotOccupied`].
pub struct InPlaceAllocator<M> {
    slot: Rc<Slot<M>>,
}

impl<M> InPlaceAllocator<M> {
    pub fn new() -> Self {
        Self {
            slot: Rc::new(Slot {
                occupied: Cell::new(false),
                occupant: Cell::new(""),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            }),
        }
    }

    /// A handle into the slot is still alive
    pub fn is_occupied(&self) -> bool {
        self.slot.occupied.get()
    }
}

impl<M> Default for InPlaceAllocator<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for InPlaceAllocator<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InPlaceAllocator")
            .field("occupied", &self.is_occupied())
            .field("occupant", &self.slot.occupant.get())
            .finish()
    }
}

impl<M: Message> AllocationPolicy<M> for InPlaceAllocator<M> {
    type Handle = SlotHandle<M>;

    fn acquire(&mut self, construct: fn() -> M) -> ProtocolResult<SlotHandle<M>> {
        if self.slot.occupied.get() {
            let occupant = self.slot.occupant.get();
            error!(
                occupant,
                "In-place slot acquired while a previous message is still alive"
            );
            return Err(ProtocolError::SlotOccupied { occupant });
        }

        let message = construct();
        self.slot.occupant.set(message.name());
        // SAFETY: the slot is unoccupied, so no handle can observe the value
        // while it is overwritten; the previous value was dropped in place
        // when its handle went away.
        unsafe {
            (*self.slot.value.get()).write(message);
        }
        self.slot.occupied.set(true);
        trace!(occupant = self.slot.occupant.get(), "In-place slot claimed");

        Ok(SlotHandle {
            slot: Rc::clone(&self.slot),
        })
    }
}

/// Owning handle to the message held in an [`InPlaceAllocator`] slot
pub struct SlotHandle<M> {
    slot: Rc<Slot<M>>,
}

impl<M> Deref for SlotHandle<M> {
    type Target = M;

    fn deref(&self) -> &M {
        // SAFETY: a handle exists only while the slot is occupied and
        // initialized, and it is the only path to the value.
        unsafe { (*self.slot.value.get()).assume_init_ref() }
    }
}

impl<M> DerefMut for SlotHandle<M> {
    fn deref_mut(&mut self) -> &mut M {
        // SAFETY: as for `deref`; `&mut self` guarantees exclusive access
        // because there is never more than one handle per slot.
        unsafe { (*self.slot.value.get()).assume_init_mut() }
    }
}

impl<M> Drop for SlotHandle<M> {
    fn drop(&mut self) {
        // SAFETY: the value was initialized by `acquire` and this handle is
        // its sole owner; the occupancy flag is cleared after the drop so no
        // new value can be written before the old one is gone.
        unsafe { (*self.slot.value.get()).assume_init_drop() };
        self.slot.occupied.set(false);
    }
}

impl<M: fmt::Debug> fmt::Debug for SlotHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotHandle").field(&**self).finish()
    }
}

/// Heap or in-place allocation, chosen once at construction
#[derive(Debug)]
pub enum ConfiguredAllocator<M> {
    Heap(HeapAllocator),
    InPlace(InPlaceAllocator<M>),
}

impl<M> ConfiguredAllocator<M> {
    pub fn new(mode: AllocationMode) -> Self {
        match mode {
            AllocationMode::Heap => Self::Heap(HeapAllocator),
            AllocationMode::InPlace => Self::InPlace(InPlaceAllocator::new()),
        }
    }

    pub fn mode(&self) -> AllocationMode {
        match self {
            Self::Heap(_) => AllocationMode::Heap,
            Self::InPlace(_) => AllocationMode::InPlace,
        }
    }
}

impl<M: Message> AllocationPolicy<M> for ConfiguredAllocator<M> {
    type Handle = MessageHandle<M>;

    fn acquire(&mut self, construct: fn() -> M) -> ProtocolResult<MessageHandle<M>> {
        match self {
            Self::Heap(heap) => heap.acquire(construct).map(MessageHandle::Boxed),
            Self::InPlace(slot) => slot.acquire(construct).map(MessageHandle::InPlace),
        }
    }
}

/// Handle produced by a [`ConfiguredAllocator`]
#[derive(Debug)]
pub enum MessageHandle<M> {
    Boxed(Box<M>),
    InPlace(SlotHandle<M>),
}

impl<M> Deref for MessageHandle<M> {
    type Target = M;

    fn deref(&self) -> &M {
        match self {
            Self::Boxed(message) => &**message,
            Self::InPlace(message) => &**message,
        }
    }
}

impl<M> DerefMut for MessageHandle<M> {
    fn deref_mut(&mut self) -> &mut M {
        match self {
            Self::Boxed(message) => &mut **message,
            Self::InPlace(message) => &mut **message,
        }
    }
}
