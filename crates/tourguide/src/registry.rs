#![forbid(unsafe_code)]

//! Step registry: which steps are mounted, and which element each annotates.
//!
//! Entries live in a generational slot arena. [`attach`](StepRegistry::attach)
//! hands back a [`StepKey`]; once the entry is detached the slot's generation
//! moves on, so an old key resolves to nothing instead of to whatever step
//! reuses the slot.
//!
//! # Invariants
//!
//! 1. Step ids are unique across live entries.
//! 2. [`sorted`](StepRegistry::sorted) orders by `order` ascending, ties by
//!    first attach.
//! 3. A key resolves only while the entry it was issued for is attached.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TourError};
use crate::step::{ElementHandle, TourStep};

/// What to do when a step id is attached twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the existing entry (last write wins). The entry keeps its key
    /// and its position among equal `order` values.
    #[default]
    Overwrite,
    /// Refuse the second attach with [`TourError::DuplicateStep`].
    Reject,
}

/// Generational key for a registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepKey {
    index: u32,
    generation: u32,
}

/// A registered step and the element it annotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub step: TourStep,
    pub element: ElementHandle,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    entry: Option<Registration>,
}

#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_id: AHashMap<String, StepKey>,
    next_seq: u64,
    policy: DuplicatePolicy,
}

impl StepRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register `step` as annotating `element`.
    pub fn attach(&mut self, step: TourStep, element: ElementHandle) -> Result<StepKey> {
        if let Some(&key) = self.by_id.get(&step.id) {
            if self.policy == DuplicatePolicy::Reject {
                return Err(TourError::duplicate(step.id));
            }
            tracing::debug!(step = %step.id, ?element, "overwriting registered tour step");
            if let Some(entry) = self.slot_entry_mut(key) {
                entry.step = step;
                entry.element = element;
            }
            return Ok(key);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let id = step.id.clone();
        let registration = Registration { step, element, seq };

        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(registration);
                StepKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(registration),
                });
                StepKey {
                    index,
                    generation: 0,
                }
            }
        };

        tracing::trace!(step = %id, ?element, "tour step attached");
        self.by_id.insert(id, key);
        Ok(key)
    }

    /// Remove the step registered under `id`. Unknown ids are ignored.
    pub fn detach(&mut self, id: &str) -> Option<Registration> {
        let key = self.by_id.remove(id)?;
        let slot = self.slots.get_mut(key.index as usize)?;
        let entry = slot.entry.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        tracing::trace!(step = %id, "tour step detached");
        entry
    }

    /// Remove the step `key` was issued for, if it is still attached.
    pub fn detach_key(&mut self, key: StepKey) -> Option<Registration> {
        let id = self.resolve(key)?.step.id.clone();
        self.detach(&id)
    }

    pub fn resolve(&self, key: StepKey) -> Option<&Registration> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub fn get(&self, id: &str) -> Option<&Registration> {
        self.by_id.get(id).and_then(|&key| self.resolve(key))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    /// All live entries, sorted by `order` then attach sequence.
    pub fn sorted(&self) -> Vec<&Registration> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|r| (r.step.order, r.seq));
        entries
    }

    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.by_id.clear();
    }

    fn slot_entry_mut(&mut self, key: StepKey) -> Option<&mut Registration> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_mut()
    }
}
