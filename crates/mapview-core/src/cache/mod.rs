//! Structurally keyed caches for compiled query artifacts.
//!
//! Keys capture the identity of a plan, command template, shaper, or mapping
//! view. Stores are safe for concurrent readers and writers and publish
//! values atomically behind `Arc`.

mod caches;
mod key;
mod shape;
mod store;

pub use caches::QueryCaches;
pub use key::{
    CacheKey, CacheKeyKind, CommandKind, ExpressionKeyParts, KeyIdentity, MergeOption,
    NullSemantics,
};
pub use shape::{Parameter, ParameterShape, ShapeToken};
pub use store::{CacheEntry, CacheStats, CacheStore, FillPolicy, StoreKind};

use thiserror::Error as ThisError;

///
/// KeyError
///
/// Construction defects detected while building a cache key.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyError {
    #[error("parameter '{name}' appears more than once")]
    DuplicateParameter { name: String },

    #[error("column map fingerprint must not be empty")]
    EmptyColumnMap,

    #[error("expression fingerprint must not be empty")]
    EmptyExpressionFingerprint,

    #[error("extent name must not be empty")]
    EmptyExtentName,

    #[error("include path token must not be empty when present")]
    EmptyIncludePaths,

    #[error("parameter '{name}' has an empty type name")]
    EmptyParameterType { name: String },

    #[error("query text must not be empty")]
    EmptyQueryText,

    #[error("result type must not be empty")]
    EmptyResultType,

    #[error("invalid parameter name '{name}'")]
    InvalidParameterName { name: String },
}
