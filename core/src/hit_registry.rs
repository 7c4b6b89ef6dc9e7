use std::collections::HashMap;

use crate::target_pool::TargetId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitEntry {
    pub hit_count: u32,
    pub scored: bool,
}

/// Per-round hit bookkeeping. Entries are created on first contact and
/// `scored` flips to true at most once per id until `clear()`.
#[derive(Debug, Default)]
pub struct HitRegistry {
    entries: HashMap<TargetId, HitEntry>,
}

impl HitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a collision. Returns true when the target has reached `min_hits`
    /// and is not yet scored, i.e. it should be scored now.
    pub fn record_collision(&mut self, id: TargetId, min_hits: u32) -> bool {
        let entry = self.entries.entry(id).or_default();
        entry.hit_count = entry.hit_count.saturating_add(1);
        entry.hit_count >= min_hits && !entry.scored
    }

    /// Flip `scored` to true. Returns false if it already was.
    pub fn mark_scored(&mut self, id: TargetId) -> bool {
        let entry = self.entries.entry(id).or_default();
        if entry.scored {
            return false;
        }
        entry.scored = true;
        true
    }

    pub fn is_scored(&self, id: TargetId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.scored)
    }

    pub fn get(&self, id: TargetId) -> Option<HitEntry> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
