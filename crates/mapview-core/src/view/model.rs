//! Resolved mapping input consumed by the view compiler.

use crate::view::{
    ViewError,
    block::{BlockId, ExtentSpec, JoinKind, OnClause, ViewTree, ViewTreeBuilder},
    member::ExtentRef,
};
use std::fmt;

///
/// ModelState
///
/// Progress of the external model visitation. Only `Resolved` models may
/// be compiled.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ModelState {
    #[default]
    None,
    Normalized,
    Resolved,
    ResolveAttempted,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Normalized => "normalized",
            Self::Resolved => "resolved",
            Self::ResolveAttempted => "resolve_attempted",
        };
        write!(f, "{label}")
    }
}

///
/// CellTree
///
/// Join/union shape of the mapping cells behind one view.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum CellTree {
    Fragment(ExtentSpec),
    Join {
        kind: JoinKind,
        children: Vec<Self>,
        on: Vec<OnClause>,
    },
    Union(Vec<Self>),
}

impl CellTree {
    #[must_use]
    pub const fn fragment(spec: ExtentSpec) -> Self {
        Self::Fragment(spec)
    }

    #[must_use]
    pub const fn join(kind: JoinKind, children: Vec<Self>, on: Vec<OnClause>) -> Self {
        Self::Join { kind, children, on }
    }

    #[must_use]
    pub const fn union(children: Vec<Self>) -> Self {
        Self::Union(children)
    }

    /// Number of extent fragments in the tree.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        match self {
            Self::Fragment(_) => 1,
            Self::Join { children, .. } | Self::Union(children) => {
                children.iter().map(Self::fragment_count).sum()
            }
        }
    }

    /// Build the block tree bottom-up.
    pub fn to_view_tree(&self) -> Result<ViewTree, ViewError> {
        let mut builder = ViewTreeBuilder::new();
        let root = self.build(&mut builder)?;

        builder.finish(root)
    }

    fn build(&self, builder: &mut ViewTreeBuilder) -> Result<BlockId, ViewError> {
        match self {
            Self::Fragment(spec) => builder.extent(spec.clone()),
            Self::Join { kind, children, on } => {
                let children = children
                    .iter()
                    .map(|child| child.build(builder))
                    .collect::<Result<Vec<_>, _>>()?;

                builder.join(*kind, children, on.clone())
            }
            Self::Union(children) => {
                let children = children
                    .iter()
                    .map(|child| child.build(builder))
                    .collect::<Result<Vec<_>, _>>()?;

                builder.union(children)
            }
        }
    }
}

///
/// ViewDefinition
///
/// One extent's mapping view as handed over by the model layer.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ViewDefinition {
    pub extent: ExtentRef,
    pub state: ModelState,
    pub tree: CellTree,
}

impl ViewDefinition {
    #[must_use]
    pub const fn new(extent: ExtentRef, state: ModelState, tree: CellTree) -> Self {
        Self {
            extent,
            state,
            tree,
        }
    }

    #[must_use]
    pub const fn resolved(extent: ExtentRef, tree: CellTree) -> Self {
        Self::new(extent, ModelState::Resolved, tree)
    }
}

///
/// TESTS
///
