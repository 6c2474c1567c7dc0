//! ## Crate layout
//! - `core`: cache keys and stores, the view compiler, config, observability.
//! - `error`: the public error type with a stable kind + origin taxonomy.
//!
//! The `prelude` module carries the vocabulary needed to describe mappings
//! and build cache keys.

pub use mapview_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        cache::{CacheStore, FillPolicy, QueryCaches, StoreKind},
        config::{CacheConfig, StoreConfig},
        prelude::*,
        view::{CompiledView, ViewCompiler, ViewSet},
    };
}
