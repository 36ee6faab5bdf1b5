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

//! # Flight Catalog
//!
//! In-process flight search over a loaded dataset: indexed direct lookups
//! and same-day connections synthesized from two direct legs. Lets the CLI
//! and MCP server work without the remote search service.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::DeskError;
use crate::flight_model::{Connection, Fare, Flight, Segment};
use crate::flight_records::parse_flight_records;
use crate::flights_query_builder::SearchCriteria;
use crate::flights_ranking::Ranker;
use crate::flights_search::FlightSource;

/// Flights returned by a search with no criteria at all.
pub const UNCONSTRAINED_SEARCH_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRules {
    pub min_layover_minutes: u32,
    pub max_layover_minutes: u32,
    /// Connections built per search before giving up.
    pub max_connections: usize,
}

impl Default for ConnectionRules {
    fn default() -> Self {
        Self {
            min_layover_minutes: 60,
            max_layover_minutes: 8 * 60,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total_flights: usize,
    pub total_airports: usize,
    pub sources: usize,
    pub destinations: usize,
    pub dates: usize,
    pub routes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FlightCatalog {
    flights: Vec<Flight>,
    by_source: HashMap<String, Vec<usize>>,
    by_destination: HashMap<String, Vec<usize>>,
    by_route: HashMap<(String, String), Vec<usize>>,
    by_date: HashMap<NaiveDate, Vec<usize>>,
    by_source_date: HashMap<(String, NaiveDate), Vec<usize>>,
    by_dest_date: HashMap<(String, NaiveDate), Vec<usize>>,
    rules: ConnectionRules,
    ranker: Ranker,
    limit: usize,
}

impl FlightCatalog {
    pub fn new(flights: Vec<Flight>) -> Self {
        let start = Instant::now();
        let mut catalog = FlightCatalog {
            limit: 50,
            ..Default::default()
        };

        for (idx, flight) in flights.iter().enumerate() {
            let src = flight.source().to_string();
            let dst = flight.destination().to_string();
            catalog.by_source.entry(src.clone()).or_default().push(idx);
            catalog.by_destination.entry(dst.clone()).or_default().push(idx);
            catalog
                .by_route
                .entry((src.clone(), dst.clone()))
                .or_default()
                .push(idx);
            // Flights with an unusable date are only reachable through the
            // route and airport indexes.
            if let Some(date) = flight.date().to_naive_date() {
                catalog.by_date.entry(date).or_default().push(idx);
                catalog.by_source_date.entry((src, date)).or_default().push(idx);
                catalog.by_dest_date.entry((dst, date)).or_default().push(idx);
            }
        }
        catalog.flights = flights;

        tracing::debug!(
            "Indexed {} flights ({} routes, {} dates) in {:?}",
            catalog.flights.len(),
            catalog.by_route.len(),
            catalog.by_date.len(),
            start.elapsed()
        );
        catalog
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read flight dataset {}", path.display()))?;
        let flights = parse_flight_records(&text)
            .with_context(|| format!("{} is not a JSON array of flights", path.display()))?;
        tracing::info!("Loaded {} flights from {}", flights.len(), path.display());
        Ok(Self::new(flights))
    }

    pub fn with_rules(mut self, rules: ConnectionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
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

    /// Every airport code appearing as a source or destination, sorted.
    pub fn airports(&self) -> BTreeSet<&str> {
        self.by_source
            .keys()
            .chain(self.by_destination.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total_flights: self.flights.len(),
            total_airports: self.airports().len(),
            sources: self.by_source.len(),
            destinations: self.by_destination.len(),
            dates: self.by_date.len(),
            routes: self.by_route.len(),
        }
    }

    fn collect(&self, indexes: Option<&Vec<usize>>) -> Vec<&Flight> {
        indexes
            .map(|ids| ids.iter().map(|&i| &self.flights[i]).collect())
            .unwrap_or_default()
    }

    /// Direct flights matching `criteria`, in dataset order. The most
    /// specific index available answers the query.
    pub fn search_direct(&self, criteria: &SearchCriteria) -> Vec<Flight> {
        let src = criteria.source.as_deref();
        let dst = criteria.destination.as_deref();
        let date = criteria.date;

        let matching: Vec<&Flight> = match (src, dst, date) {
            (Some(s), Some(d), Some(day)) => self
                .collect(self.by_source_date.get(&(s.to_string(), day)))
                .into_iter()
                .filter(|f| f.destination() == d)
                .collect(),
            (Some(s), Some(d), None) => self.collect(self.by_route.get(&(s.to_string(), d.to_string()))),
            (Some(s), None, Some(day)) => self.collect(self.by_source_date.get(&(s.to_string(), day))),
            (None, Some(d), Some(day)) => self.collect(self.by_dest_date.get(&(d.to_string(), day))),
            (Some(s), None, None) => self.collect(self.by_source.get(s)),
            (None, Some(d), None) => self.collect(self.by_destination.get(d)),
            (None, None, Some(day)) => self.collect(self.by_date.get(&day)),
            (None, None, None) => self.flights.iter().take(UNCONSTRAINED_SEARCH_CAP).collect(),
        };
        matching.into_iter().cloned().collect()
    }

    /// Same-day itineraries `source → X → destination` whose layover at X
    /// falls within the connection rules, wrapping past midnight.
    pub fn find_connections(&self, source: &str, destination: &str, date: NaiveDate) -> Vec<Flight> {
        let outbound = self.collect(self.by_source_date.get(&(source.to_string(), date)));
        let inbound = self.collect(self.by_dest_date.get(&(destination.to_string(), date)));

        let mut connections = Vec::new();
        'outer: for first in &outbound {
            for second in &inbound {
                if connections.len() >= self.rules.max_connections {
                    break 'outer;
                }
                if first.destination() != second.source() || first.destination() == destination {
                    continue;
                }
                let layover = first.landing().minutes_until(second.takeoff());
                if layover < self.rules.min_layover_minutes || layover > self.rules.max_layover_minutes {
                    continue;
                }
                match join_legs(first, second, layover) {
                    Some(flight) => connections.push(flight),
                    None => tracing::debug!(
                        "Cannot join {}→{} with {}→{}",
                        first.source(),
                        first.destination(),
                        second.source(),
                        second.destination()
                    ),
                }
            }
        }
        connections
    }

    /// Direct results, merged with connections when the route and day are
    /// fully specified, ranked by the criteria's priority and truncated to
    /// the catalog limit.
    pub fn smart_search(&self, criteria: &SearchCriteria) -> Vec<Flight> {
        let start = Instant::now();
        let mut direct = self.ranker.rank(&self.search_direct(criteria), criteria.priority);
        direct.truncate(self.limit);

        let results = match (&criteria.source, &criteria.destination, criteria.date) {
            (Some(src), Some(dst), Some(date)) if criteria.include_connections => {
                let connections = self.find_connections(src, dst, date);
                tracing::debug!("{} direct, {} connecting", direct.len(), connections.len());
                direct.extend(connections);
                let mut merged = self.ranker.rank(&direct, criteria.priority);
                merged.truncate(self.limit);
                merged
            }
            _ => direct,
        };

        tracing::info!(
            "Catalog search {} found {} flights in {:?}",
            criteria,
            results.len(),
            start.elapsed()
        );
        results
    }
}

fn segment_of(flight: &Flight) -> Segment {
    Segment {
        source: flight.source().to_string(),
        destination: flight.destination().to_string(),
        takeoff: flight.takeoff(),
        landing: flight.landing(),
        duration: flight.duration(),
        cost: Some(flight.cost().clone()),
    }
}

/// Both legs need a numeric cost. Pairs whose summed cost or duration
/// overflows are skipped.
fn join_legs(first: &Flight, second: &Flight, layover_minutes: u32) -> Option<Flight> {
    let cost = first.cost().amount()?.checked_add(second.cost().amount()?)?;
    let duration = first
        .duration()
        .checked_add(layover_minutes)?
        .checked_add(second.duration())?;
    let layover_hours = (f64::from(layover_minutes) / 60.0 * 10.0).round() / 10.0;
    let connection = Connection::new(
        first.destination(),
        layover_hours,
        vec![segment_of(first), segment_of(second)],
    )
    .ok()?;

    let mut flight = Flight::direct(
        first.date().clone(),
        first.source(),
        second.destination(),
        first.takeoff(),
        second.landing(),
        duration,
        Fare::from_amount(cost),
    )
    .ok()?;
    if let Some(airline) = first.airline() {
        flight = flight.with_airline(airline.clone());
    }
    flight.with_connection(connection).ok()
}

impl FlightSource for FlightCatalog {
    fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<Flight>, DeskError>> + Send {
        std::future::ready(Ok(self.smart_search(criteria)))
    }
}
