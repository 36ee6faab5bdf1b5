//!  Skyfare Flight Desk
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Search Session
//!
//! Explicit state of one search-and-compare flow. Update functions consume
//! the session and return the next one; effects (the actual search call)
//! stay with the caller.

use skyfare_search_queue::{SearchSequencer, SearchTicket};

use crate::comparison::{ComparisonSet, ComparisonView, Notice, ToggleOutcome};
use crate::error::DeskError;
use crate::flight_model::Flight;
use crate::flights_filter::{FilterCriteria, FilterFacets, filter_flights};
use crate::flights_query_builder::Priority;
use crate::flights_ranking::Ranker;

#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    results: Vec<Flight>,
    filter: FilterCriteria,
    priority: Priority,
    comparison: ComparisonSet,
    last_error: Option<String>,
    sequencer: SearchSequencer,
    ranker: Ranker,
}

impl SearchSession {
    pub fn new(ranker: Ranker) -> Self {
        Self {
            ranker,
            ..Default::default()
        }
    }

    pub fn results(&self) -> &[Flight] {
        &self.results
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn comparison(&self) -> &ComparisonSet {
        &self.comparison
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Shared with clients running the search so stale responses can be
    /// dropped before they are parsed.
    pub fn sequencer(&self) -> &SearchSequencer {
        &self.sequencer
    }

    pub fn with_filter(mut self, filter: FilterCriteria) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn toggle_comparison(mut self, flight: &Flight) -> (Self, Option<Notice>) {
        let notice = match self.comparison.toggle(flight) {
            ToggleOutcome::RejectedFull => Some(Notice::ComparisonFull),
            ToggleOutcome::Added | ToggleOutcome::Removed => None,
        };
        (self, notice)
    }

    pub fn begin_search(&self) -> SearchTicket {
        let ticket = self.sequencer.issue();
        tracing::debug!("Search #{} issued", ticket.sequence());
        ticket
    }

    /// Apply the outcome of the search started with `ticket`. Outcomes of
    /// superseded searches are discarded; a failure keeps the previous
    /// results.
    pub fn complete_search(
        mut self,
        ticket: SearchTicket,
        outcome: Result<Vec<Flight>, DeskError>,
    ) -> (Self, Option<Notice>) {
        if !self.sequencer.is_current(ticket) {
            tracing::warn!(
                "Discarding stale search #{} (latest is #{})",
                ticket.sequence(),
                self.sequencer.latest()
            );
            return (self, None);
        }

        match outcome {
            Ok(flights) => {
                tracing::debug!("Search #{} returned {} flights", ticket.sequence(), flights.len());
                self.last_error = None;
                self.results = flights;
                let notice = self.results.is_empty().then_some(Notice::NoFlightsFound);
                (self, notice)
            }
            Err(e) => {
                tracing::warn!("Search #{} failed: {}", ticket.sequence(), e);
                let notice = if e.requires_login() {
                    Notice::LoginRequired
                } else {
                    Notice::SearchFailed(e.to_string())
                };
                self.last_error = Some(e.to_string());
                (self, Some(notice))
            }
        }
    }

    /// Results after the current filter, ordered by the current priority.
    pub fn visible_results(&self) -> Vec<Flight> {
        self.ranker
            .rank(&filter_flights(&self.results, &self.filter), self.priority)
    }

    pub fn facets(&self) -> FilterFacets {
        FilterFacets::from_flights(&self.results)
    }

    /// Hand the comparison set over to the comparison view. The set is
    /// cleared either way.
    pub fn enter_comparison(mut self) -> (Self, Result<ComparisonView, Notice>) {
        let view = self.comparison.compare();
        self.comparison.clear();
        (self, view)
    }
}
