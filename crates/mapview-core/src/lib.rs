//! Core runtime for mapview: structurally keyed query-artifact caches and
//! the mapping-view compiler, plus configuration and observability.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod cache;
pub mod config;
pub mod error;
pub mod obs;
pub mod view;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        cache::{CacheKey, CommandKind, MergeOption, NullSemantics, ParameterShape},
        view::{
            CellTree, ColumnRef, CompareOp, ExtentColumn, ExtentRef, ExtentSpec, JoinKind,
            Literal, MemberPath, ModelState, OnClause, Predicate, ViewDefinition,
        },
    };
}
