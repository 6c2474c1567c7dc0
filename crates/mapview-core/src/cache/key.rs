//! Cache key identity and hit/aging bookkeeping.
//!
//! Equality and hashing consider identity only. Bookkeeping counters are
//! interior-mutable so they can be bumped through a shared reference while
//! the key sits inside a store.

use crate::{
    cache::{KeyError, ParameterShape, ShapeToken},
    view::MappingFingerprint,
};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
};
use ulid::Ulid;

///
/// CommandKind
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CommandKind {
    #[default]
    Text,
    StoredProcedure,
    TableDirect,
}

///
/// MergeOption
///
/// Result materialization option requested by the caller.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MergeOption {
    #[default]
    AppendOnly,
    OverwriteChanges,
    PreserveChanges,
    NoTracking,
}

///
/// NullSemantics
///
/// How `=` treats nulls in the compiled query.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum NullSemantics {
    #[default]
    Database,
    Language,
}

///
/// CacheKeyKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CacheKeyKind {
    Identity,
    Command,
    Expression,
    Shaper,
    View,
}

///
/// ExpressionKeyParts
///
/// Call-site inputs for an expression-tree query key.
///

#[derive(Clone, Debug, Default)]
pub struct ExpressionKeyParts {
    pub fingerprint: String,
    pub parameters: ParameterShape,
    pub include_paths: Option<String>,
    pub merge_option: MergeOption,
    pub result_type: String,
    pub streaming: bool,
    pub null_semantics: NullSemantics,
}

///
/// KeyIdentity
///
/// The identity fields of a key. Variants never compare equal to each other,
/// even when their payloads coincide. Strings compare ordinally.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum KeyIdentity {
    Identity(Ulid),
    Command {
        kind: CommandKind,
        text: String,
        parameters: ShapeToken,
    },
    Expression {
        fingerprint: String,
        parameters: ShapeToken,
        include_paths: Option<String>,
        merge_option: MergeOption,
        result_type: String,
        streaming: bool,
        null_semantics: NullSemantics,
    },
    Shaper {
        column_map: String,
        merge_option: MergeOption,
        value_layer: bool,
    },
    View {
        extent: String,
        fingerprint: MappingFingerprint,
    },
}

impl KeyIdentity {
    #[must_use]
    pub const fn kind(&self) -> CacheKeyKind {
        match self {
            Self::Identity(_) => CacheKeyKind::Identity,
            Self::Command { .. } => CacheKeyKind::Command,
            Self::Expression { .. } => CacheKeyKind::Expression,
            Self::Shaper { .. } => CacheKeyKind::Shaper,
            Self::View { .. } => CacheKeyKind::View,
        }
    }
}

///
/// CacheKey
///
/// Identity of one compiled artifact plus its hit count and aging index.
///

pub struct CacheKey {
    identity: KeyIdentity,
    hit_count: AtomicU32,
    aging_index: AtomicU64,
}

impl CacheKey {
    const fn from_identity(identity: KeyIdentity) -> Self {
        Self {
            identity,
            hit_count: AtomicU32::new(0),
            aging_index: AtomicU64::new(0),
        }
    }

    /// Key for a query that already carries an identity assigned elsewhere.
    #[must_use]
    pub const fn identity(id: Ulid) -> Self {
        Self::from_identity(KeyIdentity::Identity(id))
    }

    /// Key for a textual command and its parameter shape.
    pub fn command(
        kind: CommandKind,
        text: impl Into<String>,
        parameters: &ParameterShape,
    ) -> Result<Self, KeyError> {
        let text = text.into();
        if text.is_empty() {
            return Err(KeyError::EmptyQueryText);
        }

        Ok(Self::from_identity(KeyIdentity::Command {
            kind,
            text,
            parameters: parameters.token(),
        }))
    }

    /// Key for an expression-tree query and its execution options.
    pub fn expression(parts: ExpressionKeyParts) -> Result<Self, KeyError> {
        let ExpressionKeyParts {
            fingerprint,
            parameters,
            include_paths,
            merge_option,
            result_type,
            streaming,
            null_semantics,
        } = parts;

        if fingerprint.is_empty() {
            return Err(KeyError::EmptyExpressionFingerprint);
        }
        if result_type.is_empty() {
            return Err(KeyError::EmptyResultType);
        }
        if include_paths.as_deref() == Some("") {
            return Err(KeyError::EmptyIncludePaths);
        }

        Ok(Self::from_identity(KeyIdentity::Expression {
            fingerprint,
            parameters: parameters.token(),
            include_paths,
            merge_option,
            result_type,
            streaming,
            null_semantics,
        }))
    }

    /// Key for a result shaper built from a column map.
    pub fn shaper(
        column_map: impl Into<String>,
        merge_option: MergeOption,
        value_layer: bool,
    ) -> Result<Self, KeyError> {
        let column_map = column_map.into();
        if column_map.is_empty() {
            return Err(KeyError::EmptyColumnMap);
        }

        Ok(Self::from_identity(KeyIdentity::Shaper {
            column_map,
            merge_option,
            value_layer,
        }))
    }

    /// Key for a compiled mapping view of one extent.
    pub fn view(
        extent: impl Into<String>,
        fingerprint: MappingFingerprint,
    ) -> Result<Self, KeyError> {
        let extent = extent.into();
        if extent.is_empty() {
            return Err(KeyError::EmptyExtentName);
        }

        Ok(Self::from_identity(KeyIdentity::View {
            extent,
            fingerprint,
        }))
    }

    #[must_use]
    pub const fn key_identity(&self) -> &KeyIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn kind(&self) -> CacheKeyKind {
        self.identity.kind()
    }

    /// Number of cache hits observed for this key.
    #[must_use]
    pub fn hit_count(&self) -> u32 {
        self.hit_count.load(Ordering::Relaxed)
    }

    /// Record one cache hit. Saturates at `u32::MAX`.
    pub fn update_hit(&self) {
        // Err means the counter is already saturated.
        let _ = self
            .hit_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1));
    }

    /// Aging index; interpreted by the owning store only.
    #[must_use]
    pub fn aging_index(&self) -> u64 {
        self.aging_index.load(Ordering::Relaxed)
    }

    pub fn set_aging_index(&self, index: u64) {
        self.aging_index.store(index, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn set_hit_count_for_test(&self, count: u32) {
        self.hit_count.store(count, Ordering::Relaxed);
    }
}

impl Clone for CacheKey {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            hit_count: AtomicU32::new(self.hit_count()),
            aging_index: AtomicU64::new(self.aging_index()),
        }
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("identity", &self.identity)
            .field("hit_count", &self.hit_count())
            .field("aging_index", &self.aging_index())
            .finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            KeyIdentity::Identity(id) => write!(f, "identity:{id}"),
            KeyIdentity::Command {
                kind, parameters, ..
            } => write!(f, "command:{kind:?}:{parameters}"),
            KeyIdentity::Expression {
                parameters,
                result_type,
                ..
            } => write!(f, "expression:{result_type}:{parameters}"),
            KeyIdentity::Shaper {
                merge_option,
                value_layer,
                ..
            } => write!(f, "shaper:{merge_option:?}:value_layer={value_layer}"),
            KeyIdentity::View {
                extent,
                fingerprint,
            } => write!(f, "view:{extent}:{fingerprint}"),
        }
    }
}

///
/// TESTS
///
