use super::{
    Block, BlockId, BlockKind, JoinKind, JoinTreeContext, OnColumn, SlotInfo, ViewTree, join_path,
};
use crate::view::{
    ViewError,
    literal::Literal,
    member::{ExtentRef, MemberPath, OutputMember},
    predicate::Predicate,
    slot::{Slot, SlotArena, SlotColumn, SlotId},
};
use std::{
    collections::{HashMap, HashSet},
    fmt,
};

///
/// ExtentColumn
///
/// One projected column of an extent scan. Case arms name other columns of
/// the same extent by their output alias.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ExtentColumn {
    Member {
        member: MemberPath,
        output: MemberPath,
    },
    Constant {
        value: Literal,
        output: MemberPath,
    },
    Flag {
        index: usize,
        condition: Predicate,
    },
    Case {
        output: MemberPath,
        whens: Vec<(String, String)>,
        otherwise: Option<String>,
    },
}

impl ExtentColumn {
    /// A member projected under its own name.
    #[must_use]
    pub fn member(member: MemberPath) -> Self {
        Self::Member {
            output: member.clone(),
            member,
        }
    }

    #[must_use]
    pub const fn renamed(member: MemberPath, output: MemberPath) -> Self {
        Self::Member { member, output }
    }

    #[must_use]
    pub fn constant(value: impl Into<Literal>, output: MemberPath) -> Self {
        Self::Constant {
            value: value.into(),
            output,
        }
    }

    #[must_use]
    pub const fn flag(index: usize, condition: Predicate) -> Self {
        Self::Flag { index, condition }
    }

    #[must_use]
    pub fn case<W, T>(
        output: MemberPath,
        whens: impl IntoIterator<Item = (W, T)>,
        otherwise: Option<&str>,
    ) -> Self
    where
        W: Into<String>,
        T: Into<String>,
    {
        Self::Case {
            output,
            whens: whens
                .into_iter()
                .map(|(when, then)| (when.into(), then.into()))
                .collect(),
            otherwise: otherwise.map(str::to_string),
        }
    }

    #[must_use]
    pub fn output(&self) -> OutputMember {
        match self {
            Self::Member { output, .. }
            | Self::Constant { output, .. }
            | Self::Case { output, .. } => OutputMember::Member(output.clone()),
            Self::Flag { index, .. } => OutputMember::Flag(*index),
        }
    }
}

///
/// ExtentSpec
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ExtentSpec {
    pub extent: ExtentRef,
    pub columns: Vec<ExtentColumn>,
    pub predicate: Predicate,
    pub distinct: bool,
}

impl ExtentSpec {
    #[must_use]
    pub fn new(extent: ExtentRef) -> Self {
        Self {
            extent,
            columns: Vec::new(),
            predicate: Predicate::True,
            distinct: false,
        }
    }

    #[must_use]
    pub fn column(mut self, column: ExtentColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Conjoin `predicate` onto the scan filter.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Predicate::and([self.predicate, predicate]);
        self
    }

    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

///
/// ColumnRef
///
/// Column `column` (output alias) of join child `child`.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ColumnRef {
    pub child: usize,
    pub column: String,
}

impl ColumnRef {
    #[must_use]
    pub fn new(child: usize, column: impl Into<String>) -> Self {
        Self {
            child,
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.child, self.column)
    }
}

///
/// OnClause
///
/// Conjunction of column equalities joining one child onto its left side.
///

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct OnClause {
    pub pairs: Vec<(ColumnRef, ColumnRef)>,
}

impl OnClause {
    #[must_use]
    pub fn equals(left: ColumnRef, right: ColumnRef) -> Self {
        Self {
            pairs: vec![(left, right)],
        }
    }

    #[must_use]
    pub fn and_equals(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.pairs.push((left, right));
        self
    }
}

///
/// ViewTreeBuilder
///
/// Assembles blocks bottom-up. Every block gets the alias `T<n>` in
/// creation order; each block may become the child of at most one parent.
///

#[derive(Debug, Default)]
pub struct ViewTreeBuilder {
    blocks: Vec<Block>,
    slots: SlotArena,
    consumed: HashSet<BlockId>,
}

impl ViewTreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaf block scanning one extent.
    pub fn extent(&mut self, spec: ExtentSpec) -> Result<BlockId, ViewError> {
        let alias = self.next_alias();
        let ExtentSpec {
            extent,
            columns,
            predicate,
            distinct,
        } = spec;

        if columns.is_empty() {
            return Err(ViewError::EmptyProjection { alias });
        }
        let mut seen = HashSet::new();
        for column in &columns {
            let name = column.output().field_alias();
            if !seen.insert(name.clone()) {
                return Err(ViewError::DuplicateColumn { alias, column: name });
            }
        }

        // leaves first, so case arms can reference them regardless of order
        let mut resolved: Vec<Option<SlotInfo>> = Vec::with_capacity(columns.len());
        let mut leaves: HashMap<String, SlotColumn> = HashMap::new();
        for column in &columns {
            let slot = match column {
                ExtentColumn::Member { member, .. } => Slot::Member(member.clone()),
                ExtentColumn::Constant { value, .. } => Slot::Constant(value.clone()),
                ExtentColumn::Flag { condition, .. } => Slot::Flag(condition.clone().normalized()),
                ExtentColumn::Case { .. } => {
                    resolved.push(None);
                    continue;
                }
            };
            let output = column.output();
            let slot = self.push_slot(&alias, slot)?;
            leaves.insert(
                output.field_alias(),
                SlotColumn {
                    slot,
                    output: output.clone(),
                },
            );
            resolved.push(Some(SlotInfo { slot, output }));
        }

        for (column, info) in columns.iter().zip(resolved.iter_mut()) {
            let ExtentColumn::Case {
                output,
                whens,
                otherwise,
            } = column
            else {
                continue;
            };
            if whens.is_empty() {
                return Err(ViewError::EmptyCase {
                    alias,
                    column: output.field_alias(),
                });
            }

            let lookup = |name: &String| {
                leaves
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ViewError::UnknownColumn {
                        alias: alias.clone(),
                        column: name.clone(),
                    })
            };
            let whens = whens
                .iter()
                .map(|(when, then)| -> Result<_, ViewError> {
                    Ok((lookup(when)?, lookup(then)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let otherwise = otherwise.as_ref().map(lookup).transpose()?;

            let slot = self.push_slot(&alias, Slot::Case { whens, otherwise })?;
            *info = Some(SlotInfo {
                slot,
                output: OutputMember::Member(output.clone()),
            });
        }

        Ok(self.push_block(Block {
            alias,
            kind: BlockKind::Extent { extent, distinct },
            columns: resolved.into_iter().flatten().collect(),
            children: Vec::new(),
            predicate: predicate.normalized(),
            join_context: None,
        }))
    }

    /// Left-associative join: `on[s - 1]` joins child `s` onto the join of
    /// children `0..s`.
    pub fn join(
        &mut self,
        kind: JoinKind,
        children: Vec<BlockId>,
        on: Vec<OnClause>,
    ) -> Result<BlockId, ViewError> {
        let alias = self.next_alias();
        if children.len() < 2 {
            return Err(ViewError::TooFewChildren {
                alias,
                found: children.len(),
            });
        }
        if on.len() != children.len() - 1 {
            return Err(ViewError::OnClauseCountMismatch {
                alias,
                expected: children.len() - 1,
                found: on.len(),
            });
        }
        self.check_children(&alias, &children)?;

        let mut resolved = Vec::with_capacity(on.len());
        for (index, clause) in on.into_iter().enumerate() {
            let step = index + 1;
            if clause.pairs.is_empty() {
                return Err(ViewError::EmptyOnClause { alias, step });
            }

            let mut pairs = Vec::with_capacity(clause.pairs.len());
            for (a, b) in &clause.pairs {
                let (left, right) = if a.child < step && b.child == step {
                    (a, b)
                } else if b.child < step && a.child == step {
                    (b, a)
                } else {
                    let offending = if a.child > step || b.child == step { a } else { b };
                    return Err(ViewError::DanglingOnClauseSlot {
                        alias,
                        column: self.describe(&children, offending),
                    });
                };
                pairs.push((
                    self.resolve_on(&alias, &children, left)?,
                    self.resolve_on(&alias, &children, right)?,
                ));
            }
            resolved.push(pairs);
        }

        // passthrough projection; aliases must stay unique across children
        let mut seen = HashSet::new();
        for &child in &children {
            for info in &self.blocks[child.0].columns {
                let column = info.alias();
                if !seen.insert(column.clone()) {
                    return Err(ViewError::DuplicateColumn { alias, column });
                }
            }
        }

        let mut columns = Vec::new();
        for &child in &children {
            let offered = self.blocks[child.0].columns.clone();
            for info in offered {
                let slot = self.qualify(&alias, child, info.slot)?;
                columns.push(SlotInfo {
                    slot,
                    output: info.output,
                });
            }
        }

        let names: Vec<String> = children
            .iter()
            .map(|child| self.blocks[child.0].alias.clone())
            .collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let steps = children.len() - 1;
        for (index, &child) in children.iter().enumerate() {
            let mut path = join_path(&alias, &names, steps, index);
            let leaf = path.pop().unwrap_or_default();
            self.assign_context(
                &alias,
                child,
                JoinTreeContext {
                    parent_qualifiers: path,
                    leaf,
                },
            )?;
        }
        self.consumed.extend(children.iter().copied());

        Ok(self.push_block(Block {
            alias,
            kind: BlockKind::Join { kind, on: resolved },
            columns,
            children,
            predicate: Predicate::True,
            join_context: None,
        }))
    }

    /// `UNION ALL` of congruent children, in order.
    pub fn union(&mut self, children: Vec<BlockId>) -> Result<BlockId, ViewError> {
        let alias = self.next_alias();
        if children.len() < 2 {
            return Err(ViewError::TooFewChildren {
                alias,
                found: children.len(),
            });
        }
        self.check_children(&alias, &children)?;

        let first = children[0];
        let expected = self.blocks[first.0].columns.clone();
        for child in &children[1..] {
            let found = &self.blocks[child.0].columns;
            if found.len() != expected.len() {
                return Err(ViewError::UnionArityMismatch {
                    alias,
                    expected: expected.len(),
                    found: found.len(),
                });
            }
            for (position, (want, got)) in expected.iter().zip(found).enumerate() {
                if want.output != got.output {
                    return Err(ViewError::UnionColumnMismatch {
                        alias,
                        position,
                        expected: want.alias(),
                        found: got.alias(),
                    });
                }
            }
        }

        let mut columns = Vec::with_capacity(expected.len());
        for info in expected {
            columns.push(SlotInfo {
                slot: self.qualify(&alias, first, info.slot)?,
                output: info.output,
            });
        }
        self.consumed.extend(children.iter().copied());

        Ok(self.push_block(Block {
            alias,
            kind: BlockKind::Union,
            columns,
            children,
            predicate: Predicate::True,
            join_context: None,
        }))
    }

    /// Freeze the tree rooted at `root`.
    pub fn finish(self, root: BlockId) -> Result<ViewTree, ViewError> {
        if root.0 >= self.blocks.len() {
            return Err(ViewError::UnknownBlock {
                alias: self.next_alias(),
                block: root.0,
            });
        }

        Ok(ViewTree {
            blocks: self.blocks,
            slots: self.slots,
            root,
        })
    }

    fn next_alias(&self) -> String {
        format!("T{}", self.blocks.len() + 1)
    }

    fn push_block(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);

        BlockId(self.blocks.len() - 1)
    }

    fn push_slot(&mut self, alias: &str, slot: Slot) -> Result<SlotId, ViewError> {
        self.slots.push(slot).ok_or_else(|| ViewError::UnknownSlot {
            alias: alias.to_string(),
            slot: self.slots.len(),
        })
    }

    fn qualify(&mut self, alias: &str, block: BlockId, slot: SlotId) -> Result<SlotId, ViewError> {
        self.slots
            .deep_qualify(block, slot)
            .ok_or_else(|| ViewError::UnknownSlot {
                alias: alias.to_string(),
                slot: slot.index(),
            })
    }

    fn check_children(&self, alias: &str, children: &[BlockId]) -> Result<(), ViewError> {
        let mut listed = HashSet::new();
        for &child in children {
            let Some(block) = self.blocks.get(child.0) else {
                return Err(ViewError::UnknownBlock {
                    alias: alias.to_string(),
                    block: child.0,
                });
            };
            if self.consumed.contains(&child) || !listed.insert(child) {
                return Err(ViewError::BlockReused {
                    alias: alias.to_string(),
                    child: block.alias.clone(),
                });
            }
        }

        Ok(())
    }

    fn assign_context(
        &mut self,
        alias: &str,
        child: BlockId,
        context: JoinTreeContext,
    ) -> Result<(), ViewError> {
        let block = &mut self.blocks[child.0];
        if block.join_context.is_some() {
            return Err(ViewError::BlockReused {
                alias: alias.to_string(),
                child: block.alias.clone(),
            });
        }
        block.join_context = Some(context);

        Ok(())
    }

    fn resolve_on(
        &self,
        alias: &str,
        children: &[BlockId],
        column: &ColumnRef,
    ) -> Result<OnColumn, ViewError> {
        children
            .get(column.child)
            .and_then(|child| {
                self.blocks[child.0]
                    .columns
                    .iter()
                    .position(|info| info.alias() == column.column)
            })
            .map(|index| OnColumn {
                child: column.child,
                column: index,
            })
            .ok_or_else(|| ViewError::DanglingOnClauseSlot {
                alias: alias.to_string(),
                column: self.describe(children, column),
            })
    }

    // `T2.Id` when the child exists, the raw reference otherwise.
    fn describe(&self, children: &[BlockId], column: &ColumnRef) -> String {
        match children.get(column.child) {
            Some(child) => format!("{}.{}", self.blocks[child.0].alias, column.column),
            None => column.to_string(),
        }
    }
}
