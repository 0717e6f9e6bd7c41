//! Capabilities of a query, one trait per concern.
//!
//! [`Query`] implements all of them; generic callers can ask for just the
//! capability they need.

use crate::{
    cache,
    coerce,
    error::Result,
    lookup::Resolver,
    model::Model,
    query::Query,
    registry,
    schema::DeclarationSet,
    sequence::SequenceCursor,
};
use mycoquery_core::{Id, JoinStep, Sql, Storage};

/// Declares which parameters are accepted.
pub trait SchemaProvider {
    fn declarations(&self) -> Result<DeclarationSet>;
}

/// Emits the where-clause fragments, implicitly AND-ed.
pub trait ConditionEmitter {
    fn conditions(&self, resolver: &dyn Resolver) -> Result<Vec<Sql>>;
}

/// Reports the tables joined, in execution order.
pub trait Joinable {
    fn join_steps(&self, resolver: &dyn Resolver) -> Result<Vec<JoinStep>>;
}

/// Identifies the value in the query cache.
pub trait Cacheable {
    fn cache_key(&self) -> Result<String>;
}

/// Retargets at a related model.
pub trait Coercible: Sized {
    fn coerce_into<S: Storage>(&self, target: Model, storage: &S) -> Result<Self>;
}

/// Positions a cursor within the materialized results.
pub trait Sequenceable {
    fn cursor_at<S: Storage>(&self, storage: &S, id: Id) -> Result<SequenceCursor>;
}

impl SchemaProvider for Query {
    fn declarations(&self) -> Result<DeclarationSet> {
        registry::declarations(self.model(), self.variant())
    }
}

impl ConditionEmitter for Query {
    fn conditions(&self, resolver: &dyn Resolver) -> Result<Vec<Sql>> {
        Ok(self.assembly(resolver)?.wheres.clone())
    }
}

impl Joinable for Query {
    fn join_steps(&self, resolver: &dyn Resolver) -> Result<Vec<JoinStep>> {
        Ok(self.assembly(resolver)?.joins.flatten())
    }
}

impl Cacheable for Query {
    fn cache_key(&self) -> Result<String> {
        cache::canonical_key(self.model(), self.variant(), self.params())
    }
}

impl Coercible for Query {
    fn coerce_into<S: Storage>(&self, target: Model, storage: &S) -> Result<Self> {
        coerce::coerce(self, target, storage)
    }
}

impl Sequenceable for Query {
    fn cursor_at<S: Storage>(&self, storage: &S, id: Id) -> Result<SequenceCursor> {
        let mut cursor = SequenceCursor::from_query(self, storage)?;
        cursor.at(id);
        Ok(cursor)
    }
}
