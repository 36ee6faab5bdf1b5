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

//! # Flight Comparison
//!
//! A small ordered set of flights picked from the results for side-by-side
//! comparison, and the user-visible notices the search flow can raise.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Serialize;
use thiserror::Error;

use crate::flight_model::Flight;
use crate::flight_records::FlightRecord;
use crate::flights_ranking::{best_value, fastest};

pub const MAX_COMPARED_FLIGHTS: usize = 3;
pub const MIN_COMPARED_FLIGHTS: usize = 2;

/// Non-fatal conditions shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Notice {
    ComparisonFull,
    NotEnoughToCompare { have: usize },
    NoFlightsFound,
    SearchFailed(String),
    LoginRequired,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ComparisonFull => write!(
                f,
                "Maximum flights reached: you can compare up to {} flights at a time",
                MAX_COMPARED_FLIGHTS
            ),
            Notice::NotEnoughToCompare { have } => write!(
                f,
                "Select at least {} flights to compare ({} selected)",
                MIN_COMPARED_FLIGHTS, have
            ),
            Notice::NoFlightsFound => write!(f, "No flights found for this search"),
            Notice::SearchFailed(reason) => write!(f, "Search failed: {}", reason),
            Notice::LoginRequired => write!(f, "Please log in to continue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    RejectedFull,
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("comparison token is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("comparison token payload is invalid: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Insertion-ordered, at most [`MAX_COMPARED_FLIGHTS`] members, identity by
/// route, takeoff and cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSet {
    flights: Vec<Flight>,
}

impl ComparisonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.flights.len() >= MAX_COMPARED_FLIGHTS
    }

    pub fn contains(&self, flight: &Flight) -> bool {
        self.flights.iter().any(|f| f.same_offer(flight))
    }

    /// Remove `flight` if present, otherwise append it unless the set is full.
    pub fn toggle(&mut self, flight: &Flight) -> ToggleOutcome {
        if let Some(pos) = self.flights.iter().position(|f| f.same_offer(flight)) {
            self.flights.remove(pos);
            return ToggleOutcome::Removed;
        }
        if self.is_full() {
            tracing::debug!("Comparison set full, rejecting {}→{}", flight.source(), flight.destination());
            return ToggleOutcome::RejectedFull;
        }
        self.flights.push(flight.clone());
        ToggleOutcome::Added
    }

    pub fn clear(&mut self) {
        self.flights.clear();
    }

    pub fn compare(&self) -> Result<ComparisonView, Notice> {
        if self.flights.len() < MIN_COMPARED_FLIGHTS {
            return Err(Notice::NotEnoughToCompare {
                have: self.flights.len(),
            });
        }
        Ok(ComparisonView::new(self.flights.clone()))
    }

    /// Opaque token carrying the set to the comparison view.
    pub fn to_handoff_token(&self) -> Result<String, HandoffError> {
        let records: Vec<FlightRecord> = self.flights.iter().map(FlightRecord::from).collect();
        let json = serde_json::to_vec(&records)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Rebuild a set from a token. Duplicates and members past the limit are
    /// dropped.
    pub fn from_handoff_token(token: &str) -> Result<Self, HandoffError> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim())?;
        let flights: Vec<Flight> = serde_json::from_slice(&bytes)?;
        let mut set = ComparisonSet::new();
        for flight in &flights {
            if !set.contains(flight) && !set.is_full() {
                set.flights.push(flight.clone());
            }
        }
        Ok(set)
    }
}

/// Side-by-side view with the cheapest and fastest members highlighted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub flights: Vec<Flight>,
    pub best_value: Option<usize>,
    pub fastest: Option<usize>,
}

impl ComparisonView {
    pub fn new(flights: Vec<Flight>) -> Self {
        let index_of = |target: Option<&Flight>| {
            target.and_then(|t| flights.iter().position(|f| std::ptr::eq(f, t)))
        };
        let best_value = index_of(best_value(&flights));
        let fastest = index_of(fastest(&flights));
        Self {
            flights,
            best_value,
            fastest,
        }
    }

    pub fn best_value_flight(&self) -> Option<&Flight> {
        self.best_value.and_then(|i| self.flights.get(i))
    }

    pub fn fastest_flight(&self) -> Option<&Flight> {
        self.fastest.and_then(|i| self.flights.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_model::{ClockTime, Fare, TravelDate};

    fn flight(hour: u16, cost: i64, duration: u32) -> Flight {
        Flight::direct(
            TravelDate::new("2025", "9", "12"),
            "ORD",
            "MIA",
            ClockTime::from_hm(hour, 15).unwrap(),
            ClockTime::from_hm(hour + 3, 0).unwrap(),
            duration,
            Fare::from_amount(cost),
        )
        .unwrap()
    }

    #[test]
    fn test_compare_needs_two() {
        let mut set = ComparisonSet::new();
        assert_eq!(set.compare(), Err(Notice::NotEnoughToCompare { have: 0 }));
        set.toggle(&flight(6, 200, 180));
        assert_eq!(set.compare(), Err(Notice::NotEnoughToCompare { have: 1 }));
        set.toggle(&flight(9, 150, 200));

        let view = set.compare().unwrap();
        assert_eq!(view.best_value, Some(1));
        assert_eq!(view.fastest, Some(0));
        assert_eq!(view.best_value_flight().unwrap().cost().amount(), Some(150));
    }

    #[test]
    fn test_identity_ignores_duration() {
        let mut set = ComparisonSet::new();
        assert_eq!(set.toggle(&flight(6, 200, 180)), ToggleOutcome::Added);
        assert_eq!(set.toggle(&flight(6, 200, 999)), ToggleOutcome::Removed);
        assert!(set.is_empty());
    }

    #[test]
    fn test_handoff_token() {
        let mut set = ComparisonSet::new();
        set.toggle(&flight(6, 200, 180));
        set.toggle(&flight(9, 150, 200));

        let token = set.to_handoff_token().unwrap();
        assert!(!token.contains('='));
        let restored = ComparisonSet::from_handoff_token(&token).unwrap();
        assert_eq!(restored, set);

        assert!(matches!(
            ComparisonSet::from_handoff_token("not base64 !!"),
            Err(HandoffError::Encoding(_))
        ));
        let junk = URL_SAFE_NO_PAD.encode(b"{\"x\":1}");
        assert!(matches!(
            ComparisonSet::from_handoff_token(&junk),
            Err(HandoffError::Payload(_))
        ));
    }

    #[test]
    fn test_notice_messages() {
        assert!(Notice::ComparisonFull.to_string().contains("up to 3"));
        assert!(Notice::NotEnoughToCompare { have: 1 }.to_string().contains("at least 2"));
    }
}
