//! Tracing utilities for query execution, caching and coercion.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// myco_trace_query!(&sql_str, params.len());
/// ```
#[macro_export]
macro_rules! myco_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "mycoquery.query");
    };
}

/// Emit a tracing event for the query cache (hit, miss, race recovered).
///
/// ```ignore
/// myco_trace_cache!("hit", record.id);
/// ```
#[macro_export]
macro_rules! myco_trace_cache {
    ("race", $id:expr) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = "race", record = $id, "mycoquery.cache");
    };
    ($event:literal, $id:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(event = $event, record = $id, "mycoquery.cache");
    };
}

/// Emit a debug-level tracing event naming the coercion path taken.
///
/// ```ignore
/// myco_trace_coerce!("structural", "Observation", "Name");
/// ```
#[macro_export]
macro_rules! myco_trace_coerce {
    ($path:literal, $from:expr, $to:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(path = $path, from = %$from, to = %$to, "mycoquery.coerce");
    };
}

/// Emit a debug-level tracing event when result ids are materialized.
///
/// ```ignore
/// myco_trace_results!(model, variant, ids.len());
/// ```
#[macro_export]
macro_rules! myco_trace_results {
    ($model:expr, $variant:expr, $count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(model = %$model, variant = %$variant, count = $count, "mycoquery.results");
    };
}
