//! Projected-slot arena.
//!
//! Slots are append-only records addressed by [`SlotId`]. A qualified slot
//! always wraps a slot with a smaller id, so qualification chains cannot
//! form cycles and `original_slot` always terminates.

use crate::view::{
    block::BlockId, literal::Literal, member::MemberPath, member::OutputMember,
    predicate::Predicate,
};
use std::collections::HashMap;

///
/// SlotId
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

///
/// SlotColumn
///
/// A slot together with the output column it stands for.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotColumn {
    pub slot: SlotId,
    pub output: OutputMember,
}

///
/// Slot
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Slot {
    /// A member of the scanned row.
    Member(MemberPath),

    /// A constant; identical at every nesting level.
    Constant(Literal),

    /// Boolean condition over the scanned row, projected as a flag.
    Flag(Predicate),

    /// `CASE WHEN .. THEN .. ELSE .. END` over sibling slots.
    Case {
        whens: Vec<(SlotColumn, SlotColumn)>,
        otherwise: Option<SlotColumn>,
    },

    /// `wraps`, re-addressed through the output of `block`.
    Qualified { block: BlockId, wraps: SlotId },
}

///
/// SlotArena
///

#[derive(Debug, Default)]
pub struct SlotArena {
    slots: Vec<Slot>,
    qualified: HashMap<(BlockId, SlotId), SlotId>,
}

impl SlotArena {
    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append a slot.
    ///
    /// Returns `None` when it references a slot this arena does not hold.
    pub(crate) fn push(&mut self, slot: Slot) -> Option<SlotId> {
        let valid = match &slot {
            Slot::Case { whens, otherwise } => whens
                .iter()
                .flat_map(|(when, then)| [when, then])
                .chain(otherwise)
                .all(|column| self.contains(column.slot)),
            Slot::Qualified { wraps, .. } => self.contains(*wraps),
            Slot::Member(_) | Slot::Constant(_) | Slot::Flag(_) => true,
        };
        if !valid {
            return None;
        }

        self.slots.push(slot);

        Some(SlotId(self.slots.len() - 1))
    }

    /// Re-address `slot` through `block`.
    ///
    /// Never mutates `slot`. Case slots are rebuilt with every arm
    /// qualified individually; constants are returned as is.
    pub fn deep_qualify(&mut self, block: BlockId, slot: SlotId) -> Option<SlotId> {
        match self.get(slot)?.clone() {
            Slot::Constant(_) => Some(slot),
            Slot::Case { whens, otherwise } => {
                let mut qualified = Vec::with_capacity(whens.len());
                for (when, then) in whens {
                    qualified.push((
                        self.qualify_column(block, when)?,
                        self.qualify_column(block, then)?,
                    ));
                }
                let otherwise = match otherwise {
                    Some(column) => Some(self.qualify_column(block, column)?),
                    None => None,
                };

                self.push(Slot::Case {
                    whens: qualified,
                    otherwise,
                })
            }
            Slot::Member(_) | Slot::Flag(_) | Slot::Qualified { .. } => {
                if let Some(existing) = self.qualified.get(&(block, slot)) {
                    return Some(*existing);
                }
                let id = self.push(Slot::Qualified { block, wraps: slot })?;
                self.qualified.insert((block, slot), id);

                Some(id)
            }
        }
    }

    /// Follow qualification wrappers down to the leaf slot.
    #[must_use]
    pub fn original_slot(&self, mut slot: SlotId) -> SlotId {
        while let Some(Slot::Qualified { wraps, .. }) = self.get(slot) {
            slot = *wraps;
        }

        slot
    }

    /// Number of qualification levels above the leaf.
    #[must_use]
    pub fn depth(&self, mut slot: SlotId) -> usize {
        let mut depth = 0;
        while let Some(Slot::Qualified { wraps, .. }) = self.get(slot) {
            slot = *wraps;
            depth += 1;
        }

        depth
    }

    fn qualify_column(&mut self, block: BlockId, column: SlotColumn) -> Option<SlotColumn> {
        Some(SlotColumn {
            slot: self.deep_qualify(block, column.slot)?,
            output: column.output,
        })
    }

    fn contains(&self, id: SlotId) -> bool {
        id.0 < self.slots.len()
    }
}

///
/// TESTS
///
