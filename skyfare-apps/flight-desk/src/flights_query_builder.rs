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

//! # Flights Query Builder
//!
//! Side-effect free construction and normalization of flight search criteria.
//! Produces the JSON request body of the flight search service.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::DeskError;

/// Ordering requested for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Cost,
    Time,
    Optimized,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Cost => "cost",
            Priority::Time => "time",
            Priority::Optimized => "optimized",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cost" | "price" | "cheapest" => Ok(Priority::Cost),
            "time" | "duration" | "fastest" => Ok(Priority::Time),
            "optimized" | "best" => Ok(Priority::Optimized),
            other => Err(format!(
                "unknown priority '{}', expected cost, time or optimized",
                other
            )),
        }
    }
}

/// Request body of `POST /api/flights/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_connections: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub priority: Priority,
    pub include_connections: bool,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            date: None,
            priority: Priority::Cost,
            include_connections: true,
        }
    }
}

impl SearchCriteria {
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.source.is_none() && self.destination.is_none() && self.date.is_none()
    }

    /// A search with connections needs a concrete day; fall back to `today`
    /// when none was given.
    pub fn with_default_date(mut self, today: NaiveDate) -> Self {
        if self.date.is_none() && self.include_connections {
            tracing::debug!("No travel date given, searching connections for {}", today);
            self.date = Some(today);
        }
        self
    }

    pub fn to_request(&self) -> FlightSearchRequest {
        FlightSearchRequest {
            source: self.source.clone(),
            destination: self.destination.clone(),
            year: self.date.map(|d| d.year()),
            month: self.date.map(|d| d.month()),
            day: self.date.map(|d| d.day()),
            priority: Some(self.priority),
            include_connections: Some(self.include_connections),
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            self.source.as_deref().unwrap_or("*"),
            self.destination.as_deref().unwrap_or("*")
        )?;
        if let Some(date) = self.date {
            write!(f, " on {}", date.format("%Y-%m-%d"))?;
        }
        write!(f, " by {}", self.priority)
    }
}

#[derive(Debug, Clone)]
pub struct SearchCriteriaBuilder {
    source: Option<String>,
    destination: Option<String>,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    priority: Priority,
    include_connections: bool,
}

impl Default for SearchCriteriaBuilder {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            year: None,
            month: None,
            day: None,
            priority: Priority::Cost,
            include_connections: true,
        }
    }
}

impl SearchCriteriaBuilder {
    pub fn source(mut self, code: impl Into<String>) -> Self {
        self.source = Some(code.into());
        self
    }

    pub fn destination(mut self, code: impl Into<String>) -> Self {
        self.destination = Some(code.into());
        self
    }

    pub fn route(self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.source(source).destination(destination)
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.year = Some(date.year());
        self.month = Some(date.month());
        self.day = Some(date.day());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn include_connections(mut self, include: bool) -> Self {
        self.include_connections = include;
        self
    }

    /// Normalize codes (trim, uppercase, blank means unset) and validate.
    /// Every problem is reported at once.
    pub fn build(self) -> Result<SearchCriteria, DeskError> {
        let mut problems = Vec::new();

        let source = normalize_code(self.source, "source", &mut problems);
        let destination = normalize_code(self.destination, "destination", &mut problems);
        if let (Some(s), Some(d)) = (&source, &destination) {
            if s == d {
                problems.push("destination (same as source)".to_string());
            }
        }

        let date = match (self.year, self.month, self.day) {
            (None, None, None) => None,
            (Some(y), Some(m), Some(d)) => match NaiveDate::from_ymd_opt(y, m, d) {
                Some(date) => Some(date),
                None => {
                    problems.push(format!("date ({}-{}-{} does not exist)", y, m, d));
                    None
                }
            },
            (y, m, d) => {
                for (part, value) in [("year", y.is_some()), ("month", m.is_some()), ("day", d.is_some())] {
                    if !value {
                        problems.push(part.to_string());
                    }
                }
                None
            }
        };

        if !problems.is_empty() {
            return Err(DeskError::validation(problems));
        }

        Ok(SearchCriteria {
            source,
            destination,
            date,
            priority: self.priority,
            include_connections: self.include_connections,
        })
    }
}

fn normalize_code(code: Option<String>, field: &str, problems: &mut Vec<String>) -> Option<String> {
    let code = code?.trim().to_uppercase();
    if code.is_empty() {
        return None;
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        problems.push(format!("{} ('{}' is not a 3-letter airport code)", field, code));
        return None;
    }
    Some(code)
}
