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

//! # Flights Filter
//!
//! Side-effect free filtering of a result list. Surviving flights keep their
//! relative order; inputs are never modified.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::flight_model::Flight;

/// Inclusive range. `min > max` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub price_range: Bounds<i64>,
    pub duration_range: Bounds<u32>,
    /// Empty means every source.
    #[serde(default)]
    pub sources: BTreeSet<String>,
    #[serde(default)]
    pub destinations: BTreeSet<String>,
    /// Airline names; a flight without airline data never matches a
    /// non-empty set.
    #[serde(default)]
    pub airlines: BTreeSet<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            price_range: Bounds::new(i64::MIN, i64::MAX),
            duration_range: Bounds::new(0, u32::MAX),
            sources: BTreeSet::new(),
            destinations: BTreeSet::new(),
            airlines: BTreeSet::new(),
        }
    }
}

impl FilterCriteria {
    pub fn price(mut self, min: i64, max: i64) -> Self {
        self.price_range = Bounds::new(min, max);
        self
    }

    pub fn duration(mut self, min: u32, max: u32) -> Self {
        self.duration_range = Bounds::new(min, max);
        self
    }

    pub fn sources<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn destinations<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destinations = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn airlines<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.airlines = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, flight: &Flight) -> bool {
        let price_ok = flight
            .cost()
            .amount()
            .is_some_and(|c| self.price_range.contains(c));
        if !price_ok || !self.duration_range.contains(flight.duration()) {
            return false;
        }
        if !self.sources.is_empty() && !self.sources.contains(flight.source()) {
            return false;
        }
        if !self.destinations.is_empty() && !self.destinations.contains(flight.destination()) {
            return false;
        }
        if !self.airlines.is_empty() {
            return flight
                .airline()
                .is_some_and(|a| self.airlines.contains(&a.name));
        }
        true
    }
}

pub fn filter_flights(flights: &[Flight], criteria: &FilterCriteria) -> Vec<Flight> {
    flights
        .iter()
        .filter(|f| criteria.matches(f))
        .cloned()
        .collect()
}

/// Values a filter panel can offer for a given result list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterFacets {
    pub sources: BTreeSet<String>,
    pub destinations: BTreeSet<String>,
    pub airlines: BTreeSet<String>,
    pub price: Option<Bounds<i64>>,
    pub duration: Option<Bounds<u32>>,
}

impl FilterFacets {
    pub fn from_flights(flights: &[Flight]) -> Self {
        let mut facets = FilterFacets::default();
        for flight in flights {
            facets.sources.insert(flight.source().to_string());
            facets.destinations.insert(flight.destination().to_string());
            if let Some(airline) = flight.airline() {
                facets.airlines.insert(airline.name.clone());
            }
            if let Some(cost) = flight.cost().amount() {
                facets.price = Some(widen(facets.price, cost));
            }
            facets.duration = Some(widen(facets.duration, flight.duration()));
        }
        facets
    }

    /// Criteria spanning the whole result list, with no set restrictions.
    pub fn full_range(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::default();
        if let Some(price) = self.price {
            criteria.price_range = price;
        }
        if let Some(duration) = self.duration {
            criteria.duration_range = duration;
        }
        criteria
    }
}

fn widen<T: PartialOrd + Copy>(bounds: Option<Bounds<T>>, value: T) -> Bounds<T> {
    match bounds {
        None => Bounds::new(value, value),
        Some(b) => Bounds::new(
            if value < b.min { value } else { b.min },
            if value > b.max { value } else { b.max },
        ),
    }
}
