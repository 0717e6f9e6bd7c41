//! # mycoquery
//!
//! Declarative record queries: name a model and a variant, hand over raw
//! parameters, and get back validated, cacheable queries that assemble
//! their own joins, conditions and ordering.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mycoquery::{Model, Query, QueryCache, SequenceCursor, Variant};
//! use mycoquery::sqlite::SqliteStore;
//! use serde_json::json;
//!
//! let store = SqliteStore::open("observations.db")?;
//! let query = Query::new(Model::Observation, Variant::ByUser, &json!({ "user": "rolf" }))?;
//!
//! let record = QueryCache::new(&store).lookup(&query)?;
//! let ids = query.result_ids(&store)?;
//!
//! let mut cursor = SequenceCursor::new(ids.to_vec());
//! cursor.at(ids[0]);
//! assert_eq!(cursor.prev(), None);
//! ```
//!
//! ## Features
//!
//! | Feature    | Enables                                         |
//! |------------|-------------------------------------------------|
//! | `rusqlite` | [`sqlite::SqliteStore`] over a rusqlite connection |
//! | `tracing`  | debug events for statements, cache and coercion |
//! | `chrono`   | raw parameter values from chrono dates and times |

pub mod cache;
pub mod coerce;
pub mod condition;
pub mod config;
pub mod error;
pub mod filters;
pub mod flavors;
pub mod joins;
pub mod lookup;
pub mod model;
pub mod ordering;
pub mod params;
pub mod pattern;
pub mod query;
pub mod registry;
pub mod schema;
pub mod sequence;
pub mod traits;
pub mod variant;

// =============================================================================
// Root-level exports
// =============================================================================

pub use cache::{QueryCache, canonical_key};
pub use coerce::{coerce, coerce_with_title};
pub use config::QueryConfig;
pub use error::{CoercionError, LookupError, QueryError, Result, SchemaError, SchemaErrors};
pub use lookup::{LookupKind, NameRelation, Resolver};
pub use model::Model;
pub use params::{ParamValue, Params, Subquery};
pub use query::{Paginator, Query, TitleMetadata};
pub use schema::{Declaration, DeclarationSet, ParamType};
pub use sequence::{NestedSequence, SequenceCursor};
pub use traits::{Cacheable, Coercible, ConditionEmitter, Joinable, SchemaProvider, Sequenceable};
pub use variant::Variant;

/// Dialect-neutral SQL fragments, join trees and the storage boundary.
pub mod core {
    pub use mycoquery_core::{
        Chunk, DatePart, Dialect, Id, JoinGraph, JoinSpec, JoinStep, MemoryRecordStore, QueryRecord,
        RecordStore, Sql, Storage, StorageError, Token, Value,
    };
}

/// SQLite storage backed by rusqlite.
#[cfg(feature = "rusqlite")]
pub mod sqlite {
    pub use mycoquery_sqlite::*;
}
