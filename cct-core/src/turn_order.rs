//! Initiative order and the turn cursor.
//!
//! The order is a plain sequence of combatants plus the index of whoever is
//! acting. It is fully sorted when combat starts and each time the cursor
//! wraps; in between, new arrivals are slotted in relative to the cursor so
//! they act at the right point of the current round.

use crate::world::{Combatant, CombatantId, CombatantKind};
use std::cmp::Ordering;
use tracing::debug;

/// Ordering key: initiative descending, then PCs before monsters.
///
/// Entries that compare equal keep their relative order under a stable sort.
pub fn initiative_ordering(a: &Combatant, b: &Combatant) -> Ordering {
    b.initiative
        .cmp(&a.initiative)
        .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
}

fn kind_rank(kind: CombatantKind) -> u8 {
    match kind {
        CombatantKind::PlayerCharacter => 0,
        CombatantKind::Monster => 1,
    }
}

/// How a removal moved the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShift {
    /// The removed entry came after the cursor.
    Unchanged,
    /// An earlier entry was removed; the cursor followed the active combatant.
    Followed,
    /// The active combatant itself was removed, or the cursor fell off the end.
    Reset,
}

/// Result of moving the cursor to the next combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub index: usize,
    /// The cursor went past the last entry and the order was re-sorted.
    pub wrapped: bool,
}

/// Ordered combatants and the active cursor.
#[derive(Debug, Clone, Default)]
pub struct TurnOrder {
    entries: Vec<Combatant>,
    cursor: usize,
}

impl TurnOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append without sorting; used before combat starts.
    pub fn push(&mut self, combatant: Combatant) -> usize {
        self.entries.push(combatant);
        self.entries.len() - 1
    }

    /// Sort the whole order and put the cursor on the first entry.
    pub fn sort_for_combat_start(&mut self) {
        self.entries.sort_by(initiative_ordering);
        self.cursor = 0;
    }

    /// Slot a combatant in during combat and return where it landed.
    ///
    /// A newcomer with higher initiative than the active combatant would
    /// already have acted this round, so it goes right after the cursor and
    /// slides past any following entries with initiative at least its own.
    /// Otherwise it goes before the first entry after the cursor with
    /// strictly lower initiative. Both rules reduce to the same forward scan
    /// and never land at or before the cursor.
    pub fn insert_during_combat(&mut self, combatant: Combatant) -> usize {
        let Some(current) = self.entries.get(self.cursor) else {
            return self.push(combatant);
        };

        let already_passed = combatant.initiative > current.initiative;
        let index = self
            .entries
            .iter()
            .enumerate()
            .skip(self.cursor + 1)
            .find(|(_, e)| e.initiative < combatant.initiative)
            .map(|(i, _)| i)
            .unwrap_or(self.entries.len());

        debug!(
            label = %combatant.display_label,
            initiative = combatant.initiative,
            cursor = self.cursor,
            index,
            already_passed,
            "Inserting combatant mid-combat"
        );

        self.entries.insert(index, combatant);
        index
    }

    /// Remove a combatant, keeping the cursor on whoever was active.
    ///
    /// Returns `None` if `id` is not in the order.
    pub fn remove(&mut self, id: CombatantId) -> Option<(Combatant, CursorShift)> {
        let index = self.position(id)?;
        let removed = self.entries.remove(index);

        let shift = match index.cmp(&self.cursor) {
            Ordering::Equal => {
                self.cursor = 0;
                CursorShift::Reset
            }
            Ordering::Less => {
                self.cursor -= 1;
                CursorShift::Followed
            }
            Ordering::Greater => CursorShift::Unchanged,
        };

        Some((removed, shift))
    }

    /// Move the cursor forward, re-sorting when it wraps past the end.
    ///
    /// Returns `None` when the order is empty.
    pub fn advance(&mut self) -> Option<Advance> {
        if self.entries.is_empty() {
            return None;
        }

        if self.cursor + 1 >= self.entries.len() {
            self.sort_for_combat_start();
            Some(Advance {
                index: 0,
                wrapped: true,
            })
        } else {
            self.cursor += 1;
            Some(Advance {
                index: self.cursor,
                wrapped: false,
            })
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active(&self) -> Option<&Combatant> {
        self.entries.get(self.cursor)
    }

    pub fn active_mut(&mut self) -> Option<&mut Combatant> {
        self.entries.get_mut(self.cursor)
    }

    pub fn position(&self, id: CombatantId) -> Option<usize> {
        self.entries.iter().position(|c| c.id == id)
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.entries.iter_mut().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Combatant> {
        self.entries.iter_mut()
    }

    pub fn as_slice(&self) -> &[Combatant] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }
}
