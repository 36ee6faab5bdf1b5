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

//! # Flights Ranking
//!
//! Stable ordering of result lists by cost, duration or a blend of both.
//! Flights whose cost has no numeric value always rank after priced ones.

use serde::{Deserialize, Serialize};

use crate::flight_model::Flight;
use crate::flights_query_builder::Priority;

/// Relative weight of normalized cost and normalized duration in the
/// `optimized` score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub cost: f64,
    pub time: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            cost: 0.5,
            time: 0.5,
        }
    }
}

impl RankingWeights {
    /// Negative or non-finite weights count as zero; if both end up zero the
    /// equal default is used.
    pub fn new(cost: f64, time: f64) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (cost, time) = (clean(cost), clean(time));
        if cost + time == 0.0 {
            return Self::default();
        }
        Self { cost, time }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker {
    weights: RankingWeights,
}

impl Ranker {
    pub fn new(weights: RankingWeights) -> Self {
        Self {
            weights: RankingWeights::new(weights.cost, weights.time),
        }
    }

    pub fn weights(&self) -> RankingWeights {
        self.weights
    }

    pub fn rank(&self, flights: &[Flight], priority: Priority) -> Vec<Flight> {
        let mut ranked: Vec<Flight> = flights.to_vec();
        match priority {
            Priority::Cost => {
                ranked.sort_by_key(cost_key);
            }
            Priority::Time => {
                ranked.sort_by_key(|f| f.duration());
            }
            Priority::Optimized => {
                let scores = self.optimized_scores(flights);
                let mut indexed: Vec<(Option<f64>, Flight)> = scores.into_iter().zip(ranked).collect();
                indexed.sort_by(|(a, _), (b, _)| match (a, b) {
                    (Some(a), Some(b)) => a.total_cmp(b),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                });
                ranked = indexed.into_iter().map(|(_, f)| f).collect();
            }
        }
        ranked
    }

    /// Blended score per flight, in input order. Lower is better; `None` for
    /// flights without a numeric cost.
    ///
    /// Cost and duration are min-max normalized over the priced flights of
    /// the list; a zero range counts as 1.
    pub fn optimized_scores(&self, flights: &[Flight]) -> Vec<Option<f64>> {
        let priced: Vec<(i64, u32)> = flights
            .iter()
            .filter_map(|f| f.cost().amount().map(|c| (c, f.duration())))
            .collect();
        let (Some(min_cost), Some(max_cost)) = (
            priced.iter().map(|(c, _)| *c).min(),
            priced.iter().map(|(c, _)| *c).max(),
        ) else {
            return vec![None; flights.len()];
        };
        let min_dur = priced.iter().map(|(_, d)| *d).min().unwrap_or(0);
        let max_dur = priced.iter().map(|(_, d)| *d).max().unwrap_or(0);

        let cost_range = nonzero_range(max_cost as f64 - min_cost as f64);
        let dur_range = nonzero_range(f64::from(max_dur) - f64::from(min_dur));
        let total_weight = self.weights.cost + self.weights.time;

        flights
            .iter()
            .map(|f| {
                let cost = f.cost().amount()?;
                let nc = (cost as f64 - min_cost as f64) / cost_range;
                let nd = (f64::from(f.duration()) - f64::from(min_dur)) / dur_range;
                Some((self.weights.cost * nc + self.weights.time * nd) / total_weight)
            })
            .collect()
    }
}

fn nonzero_range(range: f64) -> f64 {
    if range == 0.0 { 1.0 } else { range }
}

fn cost_key(flight: &Flight) -> (bool, i64) {
    match flight.cost().amount() {
        Some(c) => (false, c),
        None => (true, 0),
    }
}

/// Rank with equal cost/time weights.
pub fn rank(flights: &[Flight], priority: Priority) -> Vec<Flight> {
    Ranker::default().rank(flights, priority)
}

/// Cheapest flight; the first one wins a tie. Flights without a numeric cost
/// are only considered when no flight has one.
pub fn best_value(flights: &[Flight]) -> Option<&Flight> {
    let mut best: Option<(&Flight, i64)> = None;
    for flight in flights {
        if let Some(cost) = flight.cost().amount() {
            if best.is_none_or(|(_, b)| cost < b) {
                best = Some((flight, cost));
            }
        }
    }
    best.map(|(f, _)| f).or_else(|| flights.first())
}

/// Shortest flight; the first one wins a tie.
pub fn fastest(flights: &[Flight]) -> Option<&Flight> {
    let mut best: Option<&Flight> = None;
    for flight in flights {
        if best.is_none_or(|b| flight.duration() < b.duration()) {
            best = Some(flight);
        }
    }
    best
}
