//! Prev/next navigation over materialized result ids.

use crate::{error::Result, query::Query, variant::Variant};
use mycoquery_core::{Id, Storage};

/// A position within an ordered id list.
///
/// Navigation never re-runs the query; stepping past either end yields
/// `None` and leaves the position unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceCursor {
    ids: Vec<Id>,
    index: Option<usize>,
}

impl SequenceCursor {
    pub fn new(ids: Vec<Id>) -> Self {
        Self { ids, index: None }
    }

    /// Cursor over `query`'s results, materializing them if needed.
    pub fn from_query<S: Storage>(query: &Query, storage: &S) -> Result<Self> {
        Ok(Self::new(query.result_ids(storage)?.to_vec()))
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Moves to `id`, returning its index; an absent id clears the position.
    pub fn at(&mut self, id: Id) -> Option<usize> {
        self.index = self.ids.iter().position(|&i| i == id);
        self.index
    }

    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<Id> {
        self.index.map(|i| self.ids[i])
    }

    pub fn prev(&self) -> Option<Id> {
        let i = self.index?.checked_sub(1)?;
        self.ids.get(i).copied()
    }

    pub fn next(&self) -> Option<Id> {
        let i = self.index? + 1;
        self.ids.get(i).copied()
    }

    pub fn is_first(&self) -> bool {
        self.index == Some(0)
    }

    pub fn is_last(&self) -> bool {
        self.index.is_some_and(|i| i + 1 == self.ids.len())
    }

    pub fn first(&self) -> Option<Id> {
        self.ids.first().copied()
    }

    pub fn last(&self) -> Option<Id> {
        self.ids.last().copied()
    }

    pub fn step_prev(&mut self) -> Option<Id> {
        let id = self.prev()?;
        self.index = self.index.map(|i| i - 1);
        Some(id)
    }

    pub fn step_next(&mut self) -> Option<Id> {
        let id = self.next()?;
        self.index = self.index.map(|i| i + 1);
        Some(id)
    }

    pub fn go_first(&mut self) -> Option<Id> {
        self.index = (!self.ids.is_empty()).then_some(0);
        self.current()
    }

    pub fn go_last(&mut self) -> Option<Id> {
        self.index = self.ids.len().checked_sub(1);
        self.current()
    }
}

/// Navigation through an inner query nested in an outer one, such as the
/// images of each observation in an observation list.
///
/// Stepping past the end of the inner list moves the outer cursor and
/// reopens the inner query on the next outer row, skipping outer rows whose
/// inner list is empty.
#[derive(Debug)]
pub struct NestedSequence<'s, S> {
    storage: &'s S,
    /// Inner parameter naming the current outer row.
    link: &'static str,
    inner: Query,
    inner_cursor: SequenceCursor,
    outer: Query,
    outer_cursor: SequenceCursor,
}

impl<'s, S: Storage> NestedSequence<'s, S> {
    /// Positions at `current` within `inner`. `None` when `inner` has no
    /// outer query.
    pub fn new(inner: Query, current: Id, storage: &'s S) -> Result<Option<Self>> {
        let link = match inner.variant() {
            Variant::InsideObservation => "observation",
            _ => return Ok(None),
        };
        let Some(outer) = inner.outer_query(storage)? else {
            return Ok(None);
        };
        let mut outer_cursor = SequenceCursor::from_query(&outer, storage)?;
        if let Some(outer_id) = inner.params().integer(link) {
            outer_cursor.at(outer_id);
        }
        let mut inner_cursor = SequenceCursor::from_query(&inner, storage)?;
        inner_cursor.at(current);
        Ok(Some(Self {
            storage,
            link,
            inner,
            inner_cursor,
            outer,
            outer_cursor,
        }))
    }

    pub fn inner(&self) -> &Query {
        &self.inner
    }

    pub fn outer(&self) -> &Query {
        &self.outer
    }

    /// `(outer id, inner id)` at the current position.
    pub fn current(&self) -> Option<(Id, Id)> {
        Some((self.outer_cursor.current()?, self.inner_cursor.current()?))
    }

    /// The inner id, even when the outer position is unknown.
    pub fn inner_current(&self) -> Option<Id> {
        self.inner_cursor.current()
    }

    pub fn step_next(&mut self) -> Result<Option<(Id, Id)>> {
        self.step(true)
    }

    pub fn step_prev(&mut self) -> Result<Option<(Id, Id)>> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Result<Option<(Id, Id)>> {
        // without an outer position there is nowhere to land
        let Some(outer_id) = self.outer_cursor.current() else {
            return Ok(None);
        };
        let moved = if forward {
            self.inner_cursor.step_next()
        } else {
            self.inner_cursor.step_prev()
        };
        if let Some(inner_id) = moved {
            return Ok(Some((outer_id, inner_id)));
        }

        // state is only committed once a non-empty outer row is found
        let mut outer_cursor = self.outer_cursor.clone();
        loop {
            let stepped = if forward {
                outer_cursor.step_next()
            } else {
                outer_cursor.step_prev()
            };
            let Some(outer_id) = stepped else {
                return Ok(None);
            };
            let inner = self.inner_for(outer_id)?;
            let mut cursor = SequenceCursor::from_query(&inner, self.storage)?;
            let landed = if forward { cursor.go_first() } else { cursor.go_last() };
            if let Some(inner_id) = landed {
                self.inner = inner;
                self.inner_cursor = cursor;
                self.outer_cursor = outer_cursor;
                return Ok(Some((outer_id, inner_id)));
            }
        }
    }

    fn inner_for(&self, outer_id: Id) -> Result<Query> {
        let mut params = self.inner.params().clone();
        params.insert(self.link, outer_id);
        Query::from_params(self.inner.model(), self.inner.variant(), params, *self.inner.config())
    }
}
