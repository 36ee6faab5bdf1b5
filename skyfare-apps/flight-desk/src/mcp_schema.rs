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

//! MCP tool inputs and responses.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::airports::Airport;
use crate::comparison::{ComparisonView, Notice};
use crate::error::DeskError;
use crate::flight_model::Flight;
use crate::flights_filter::FilterCriteria;
use crate::flights_query_builder::{Priority, SearchCriteria};

fn default_true() -> bool {
    true
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SearchFlightsInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// YYYY-MM-DD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_true")]
    pub include_connections: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
    #[serde(default)]
    pub airlines: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for SearchFlightsInput {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            date: None,
            priority: Priority::Cost,
            include_connections: true,
            min_price: None,
            max_price: None,
            max_duration: None,
            airlines: Vec::new(),
            limit: default_limit(),
        }
    }
}

impl SearchFlightsInput {
    pub fn criteria(&self) -> Result<SearchCriteria, DeskError> {
        let mut builder = SearchCriteria::builder()
            .priority(self.priority)
            .include_connections(self.include_connections);
        if let Some(from) = &self.from {
            builder = builder.source(from.as_str());
        }
        if let Some(to) = &self.to {
            builder = builder.destination(to.as_str());
        }
        if let Some(date) = self.date.as_deref().filter(|d| !d.trim().is_empty()) {
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map_err(|_| DeskError::validation(vec![format!("date ({} is not YYYY-MM-DD)", date)]))?;
            builder = builder.date(date);
        }
        builder.build()
    }

    pub fn filter(&self) -> FilterCriteria {
        FilterCriteria::default()
            .price(
                self.min_price.unwrap_or(i64::MIN),
                self.max_price.unwrap_or(i64::MAX),
            )
            .duration(0, self.max_duration.unwrap_or(u32::MAX))
            .airlines(self.airlines.iter().cloned())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CompareFlightsInput {
    #[serde(flatten)]
    pub search: SearchFlightsInput,
    /// 1-based positions in the search_flights results with the same
    /// parameters.
    #[serde(default)]
    pub picks: Vec<usize>,
    /// Comparison token printed by the CLI; replaces the search when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SearchAirportsInput {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFlightsResponse {
    pub query: String,
    pub total: usize,
    pub flights: Vec<Flight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareFlightsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchAirportsResponse {
    pub query: String,
    pub airports: Vec<&'static Airport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let input: SearchFlightsInput = serde_json::from_str(r#"{"from": "sfo", "to": "JFK"}"#).unwrap();
        assert!(input.include_connections);
        assert_eq!(input.limit, 10);
        assert_eq!(input.priority, Priority::Cost);

        let criteria = input.criteria().unwrap();
        assert_eq!(criteria.source.as_deref(), Some("SFO"));
        assert!(criteria.date.is_none());
    }

    #[test]
    fn test_bad_date_is_validation_error() {
        let input = SearchFlightsInput {
            date: Some("20/05/2025".into()),
            ..Default::default()
        };
        assert!(matches!(input.criteria(), Err(DeskError::Validation { .. })));
    }

    #[test]
    fn test_compare_input_flattens_search() {
        let input: CompareFlightsInput =
            serde_json::from_str(r#"{"from": "SFO", "priority": "time", "picks": [1, 3]}"#).unwrap();
        assert_eq!(input.search.priority, Priority::Time);
        assert_eq!(input.picks, vec![1, 3]);
    }
}
