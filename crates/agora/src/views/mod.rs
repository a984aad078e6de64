//! Text views over cache and session state.
//!
//! A view is a function of what the cache holds for its keys and of the
//! current session. Nothing here performs I/O.

pub mod access;
pub mod forms;
pub mod render;

use std::fmt::Display;

use crate::cache::Cached;

/// Message shown for an empty result.
pub const EMPTY_MESSAGE: &str = "No data available";

/// What a view has to show for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> QueryState<T> {
    /// State after a read completed.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => QueryState::Ready(value),
            Err(e) => QueryState::Failed(e.to_string()),
        }
    }

    /// State from a cache peek. Stale values are shown as they are.
    pub fn from_cached(cached: Option<Cached<T>>) -> Self {
        match cached {
            Some(cached) => QueryState::Ready(cached.value),
            None => QueryState::Loading,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::Failed(message) => QueryState::Failed(message),
            QueryState::Ready(value) => QueryState::Ready(f(value)),
        }
    }
}
