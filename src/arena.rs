//! Generational slot arena used for tiles and markers.
//!
//! Labels refer back to their owner through a [`Handle`]. Removing an item
//! bumps its slot's generation, so a handle held across a tile eviction fails
//! to resolve instead of pointing at whatever reused the slot.

use std::fmt;

use crate::error::{LabelError, LabelResult};

/// Slot index plus the generation it was issued for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Raw slot index (for diagnostics only).
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}@gen{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Items addressed by generation-checked handles.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Like [`Arena::get`], reporting stale handles as errors.
    pub fn resolve(&self, handle: Handle) -> LabelResult<&T> {
        self.get(handle).ok_or(LabelError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> LabelResult<&mut T> {
        self.get_mut(handle).ok_or(LabelError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handle() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));
        let b = arena.insert("b");

        // Same slot, new generation
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b), Some(&"b"));
        assert!(matches!(arena.resolve(a), Err(LabelError::StaleHandle { .. })));
        assert!(arena.remove(a).is_none());
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut arena = Arena::new();
        let handles: Vec<Handle> = (0..4).map(|i| arena.insert(i)).collect();
        arena.remove(handles[1]);
        let values: Vec<i32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 3]);
        assert_eq!(arena.len(), 3);
    }
}
