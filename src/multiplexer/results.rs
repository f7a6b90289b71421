//! Shared accumulation of individual responses and cookies.
//!
//! # Design Decisions
//! - Responses live in a `DashMap` so concurrent branches insert without a global lock
//! - Each id is written at most once; a second write is ignored and logged
//! - Cookies are merged under a mutex in branch completion order
//! - Contents are only taken out after every branch has finished

use std::sync::{Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::multiplexer::cookies::CookieMerger;
use crate::multiplexer::types::{IndividualResponse, IndividualResponseMap};

/// Write-once table of responses shared by all branches of one envelope.
#[derive(Debug, Default)]
pub struct ExecutionResultTable {
    responses: DashMap<String, IndividualResponse>,
    cookies: Mutex<CookieMerger>,
}

impl ExecutionResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a response and the cookies it emitted.
    ///
    /// Returns `false` if `id` was already recorded; the table is left unchanged.
    pub fn record(&self, id: &str, response: IndividualResponse, cookies: &[String]) -> bool {
        match self.responses.entry(id.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!(request_id = id, "Individual response already recorded");
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(response);
            }
        }

        if !cookies.is_empty() {
            self.cookies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .merge(cookies);
        }
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.responses.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Consume the table once all branches are done.
    pub fn into_parts(self) -> (IndividualResponseMap, CookieMerger) {
        let responses = self.responses.into_iter().collect();
        let cookies = self
            .cookies
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (responses, cookies)
    }
}
