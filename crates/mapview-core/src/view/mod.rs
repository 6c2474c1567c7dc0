//! Mapping-view compilation.
//!
//! Resolved cell trees become block trees (extent scans, joins, unions)
//! that emit an escaped query string and an expression tree from the same
//! nodes. Tree-shape defects surface at build time and must not be deferred
//! to emission.

pub mod block;
pub mod compiler;
pub mod escape;
pub mod expr;
pub mod fingerprint;
pub mod literal;
pub mod member;
pub mod model;
pub mod predicate;
pub mod slot;

pub use block::{
    Block, BlockId, BlockKind, ColumnRef, ExtentColumn, ExtentSpec, JoinKind, JoinTreeContext,
    OnClause, OnColumn, SlotInfo, ViewTree, ViewTreeBuilder,
};
pub use compiler::{CompiledView, ViewCompiler, ViewSet};
pub use escape::{EntitySqlKeywords, NoKeywords, ReservedKeywords};
pub use expr::{Binding, Expr};
pub use fingerprint::MappingFingerprint;
pub use literal::Literal;
pub use member::{ExtentRef, MemberPath, OutputMember};
pub use model::{CellTree, ModelState, ViewDefinition};
pub use predicate::{CompareOp, Predicate};
pub use slot::{Slot, SlotArena, SlotColumn, SlotId};

use thiserror::Error as ThisError;

///
/// ViewError
///
/// Tree-shape and construction defects. Every block-level variant names
/// the alias of the block being built.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ViewError {
    #[error("block {alias}: child block {child} is already part of another block")]
    BlockReused { alias: String, child: String },

    #[error("block {alias}: on-clause references {column}, which neither join side exposes")]
    DanglingOnClauseSlot { alias: String, column: String },

    #[error("block {alias}: column '{column}' is projected more than once")]
    DuplicateColumn { alias: String, column: String },

    #[error("block {alias}: case column '{column}' has no when arms")]
    EmptyCase { alias: String, column: String },

    #[error("block {alias}: on-clause for join step {step} has no conditions")]
    EmptyOnClause { alias: String, step: usize },

    #[error("block {alias}: projection is empty")]
    EmptyProjection { alias: String },

    #[error("invalid extent reference '{extent}'")]
    InvalidExtent { extent: String },

    #[error("invalid member path '{path}'")]
    InvalidMemberPath { path: String },

    #[error("block {alias}: expected {expected} on-clauses, found {found}")]
    OnClauseCountMismatch {
        alias: String,
        expected: usize,
        found: usize,
    },

    #[error("block {alias}: needs at least two children, found {found}")]
    TooFewChildren { alias: String, found: usize },

    #[error("block {alias}: union children project {expected} and {found} columns")]
    UnionArityMismatch {
        alias: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "block {alias}: union column {position} is '{expected}' in the first child but '{found}' in another"
    )]
    UnionColumnMismatch {
        alias: String,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("block {alias}: unknown child block #{block}")]
    UnknownBlock { alias: String, block: usize },

    #[error("block {alias}: case arm references unknown column '{column}'")]
    UnknownColumn { alias: String, column: String },

    #[error("block {alias}: unknown slot #{slot}")]
    UnknownSlot { alias: String, slot: usize },

    #[error("mapping model is {state}, expected resolved")]
    UnresolvedModel { state: ModelState },
}
