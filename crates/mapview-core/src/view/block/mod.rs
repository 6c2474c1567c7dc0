//! Compiled view tree: extent scans composed by joins and unions.
//!
//! Blocks are immutable once built, apart from the join-tree context a join
//! assigns to each child exactly once. Both emitters (`text`, `structure`)
//! read the same nodes.

mod builder;
mod structure;
mod text;


pub use builder::{ColumnRef, ExtentColumn, ExtentSpec, OnClause, ViewTreeBuilder};

use crate::view::{
    escape::{ReservedKeywords, format_identifier, format_qualified_name},
    member::{ExtentRef, OutputMember},
    predicate::Predicate,
    slot::{Slot, SlotArena, SlotId},
};

///
/// BlockId
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

///
/// JoinKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    FullOuter,
}

impl JoinKind {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::LeftOuter => "LEFT OUTER JOIN",
            Self::FullOuter => "FULL OUTER JOIN",
        }
    }

    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Inner => 0x01,
            Self::LeftOuter => 0x02,
            Self::FullOuter => 0x03,
        }
    }
}

///
/// SlotInfo
///
/// One projected column of a block.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotInfo {
    pub slot: SlotId,
    pub output: OutputMember,
}

impl SlotInfo {
    #[must_use]
    pub fn alias(&self) -> String {
        self.output.field_alias()
    }
}

///
/// JoinTreeContext
///
/// Where a join child's row lives inside the cumulative joined row: the
/// chain of intermediate join variables, then the child's own variable.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinTreeContext {
    pub parent_qualifiers: Vec<String>,
    pub leaf: String,
}

///
/// OnColumn
///
/// A resolved on-clause operand: column `column` of join child `child`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OnColumn {
    pub child: usize,
    pub column: usize,
}

///
/// BlockKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockKind {
    Extent {
        extent: ExtentRef,
        distinct: bool,
    },

    /// `on[s - 1]` joins child `s` onto the join of children `0..s`; the
    /// right operand of every pair is a column of child `s`.
    Join {
        kind: JoinKind,
        on: Vec<Vec<(OnColumn, OnColumn)>>,
    },

    Union,
}

///
/// Block
///

#[derive(Clone, Debug)]
pub struct Block {
    alias: String,
    kind: BlockKind,
    columns: Vec<SlotInfo>,
    children: Vec<BlockId>,
    predicate: Predicate,
    join_context: Option<JoinTreeContext>,
}

impl Block {
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[must_use]
    pub const fn kind(&self) -> &BlockKind {
        &self.kind
    }

    #[must_use]
    pub fn columns(&self) -> &[SlotInfo] {
        &self.columns
    }

    #[must_use]
    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    #[must_use]
    pub const fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[must_use]
    pub const fn join_context(&self) -> Option<&JoinTreeContext> {
        self.join_context.as_ref()
    }
}

///
/// ViewTree
///
/// A finished block tree with its slot arena and root.
///

#[derive(Debug)]
pub struct ViewTree {
    blocks: Vec<Block>,
    slots: SlotArena,
    root: BlockId,
}

impl ViewTree {
    #[must_use]
    pub const fn root(&self) -> BlockId {
        self.root
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    #[must_use]
    pub const fn slots(&self) -> &SlotArena {
        &self.slots
    }

    /// Number of blocks reachable from the root.
    #[must_use]
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            count += 1;
            pending.extend_from_slice(self.node(id).children());
        }

        count
    }

    /// Column aliases of the root block, in projection order.
    #[must_use]
    pub fn output_columns(&self) -> Vec<String> {
        self.node(self.root).columns.iter().map(SlotInfo::alias).collect()
    }

    /// `<block alias>.<column alias>` for a qualified slot; the bare column
    /// alias otherwise.
    #[must_use]
    pub fn qualified_name(
        &self,
        slot: SlotId,
        output: &OutputMember,
        keywords: &dyn ReservedKeywords,
    ) -> String {
        let alias = output.field_alias();
        match self.slots.get(slot) {
            Some(Slot::Qualified { block, .. }) => {
                format_qualified_name([self.node(*block).alias(), alias.as_str()], keywords)
            }
            _ => format_identifier(&alias, keywords).into_owned(),
        }
    }

    // Ids held by a tree are always its own.
    fn node(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }
}

/// Variable bound to the left input of join step `step` (1-based): the first
/// child for step 1, the previous step's joined row afterwards.
fn join_left_var(join: &str, first: &str, step: usize) -> String {
    if step == 1 {
        first.to_string()
    } else {
        format!("{join}_{}", step - 1)
    }
}

/// Field path from the row produced by join step `step` down to the row of
/// child `child`. Step 0 is the first child itself.
fn join_path(join: &str, children: &[&str], step: usize, child: usize) -> Vec<String> {
    let innermost = if child == 0 { 1 } else { child + 1 };
    let mut path: Vec<String> = (innermost..=step)
        .rev()
        .map(|s| join_left_var(join, children[0], s))
        .collect();
    if child > 0 {
        path.push(children[child].to_string());
    }

    path
}
