//! Generational handles for fonts and shaped text buffers.
//!
//! Handles are `slotmap` keys: an `(index, generation)` pair. Freeing a slot
//! bumps its generation, so a stale handle is reported as
//! [`TextError::InvalidHandle`] instead of silently aliasing whatever resource
//! reuses the slot.

use slotmap::{Key, SlotMap, new_key_type};

use crate::error::{TextError, TextResult};

new_key_type! {
    /// Identifies a font (or a linked variation of a font) in a [`FontCache`].
    ///
    /// [`FontCache`]: crate::FontCache
    pub struct FontId;

    /// Identifies a shaped text buffer owned by a text server.
    pub struct BufferId;
}

macro_rules! impl_raw_conversions {
    ($ty:ty) => {
        impl $ty {
            /// Convert to a raw u64 for FFI or serialization.
            #[inline]
            pub fn as_raw(self) -> u64 {
                self.data().as_ffi()
            }

            /// Reconstruct a handle from [`as_raw`](Self::as_raw).
            ///
            /// The result is not checked against any table; a stale or
            /// fabricated value is detected on first use.
            #[inline]
            pub fn from_raw(raw: u64) -> Self {
                Self::from(slotmap::KeyData::from_ffi(raw))
            }
        }
    };
}

impl_raw_conversions!(FontId);
impl_raw_conversions!(BufferId);

/// A slot arena mapping generational handles to resources.
///
/// All accessors return [`TextError::InvalidHandle`] for unknown or freed
/// handles; none of them panic.
#[derive(Debug)]
pub struct HandleTable<K: Key, V> {
    slots: SlotMap<K, V>,
    kind: &'static str,
}

impl<K: Key, V> HandleTable<K, V> {
    /// Create an empty table. `kind` names the resource in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            slots: SlotMap::with_key(),
            kind,
        }
    }

    /// Store a resource and return its handle.
    pub fn insert(&mut self, value: V) -> K {
        self.slots.insert(value)
    }

    /// Borrow the resource behind a handle.
    pub fn get(&self, key: K) -> TextResult<&V> {
        self.slots.get(key).ok_or(self.invalid())
    }

    /// Mutably borrow the resource behind a handle.
    pub fn get_mut(&mut self, key: K) -> TextResult<&mut V> {
        let kind = self.kind;
        self.slots
            .get_mut(key)
            .ok_or(TextError::InvalidHandle { kind })
    }

    /// Free a handle, returning its resource.
    pub fn remove(&mut self, key: K) -> TextResult<V> {
        let kind = self.kind;
        self.slots
            .remove(key)
            .ok_or(TextError::InvalidHandle { kind })
    }

    /// Whether the handle refers to a live resource.
    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table holds no resources.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over live handles and their resources.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.slots.iter()
    }

    fn invalid(&self) -> TextError {
        TextError::InvalidHandle { kind: self.kind }
    }
}
