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

//! Runtime configuration shared by the library clients and both binaries.

use serde::{Deserialize, Serialize};
use skyfare_search_queue::SearchQueue;

use crate::flights_ranking::{Ranker, RankingWeights};

pub const DEFAULT_SEARCH_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_BOOKINGS_API_URL: &str = "http://localhost:8001";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskConfig {
    pub search_api_url: String,
    pub bookings_api_url: String,
    pub timeout_secs: u64,
    pub queries_per_second: u32,
    /// Maximum results returned by a catalog search.
    pub result_limit: usize,
    pub ranking: RankingWeights,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            search_api_url: DEFAULT_SEARCH_API_URL.to_string(),
            bookings_api_url: DEFAULT_BOOKINGS_API_URL.to_string(),
            timeout_secs: 10,
            queries_per_second: 4,
            result_limit: 50,
            ranking: RankingWeights::default(),
        }
    }
}

impl DeskConfig {
    pub fn with_search_api_url(mut self, url: impl Into<String>) -> Self {
        self.search_api_url = trim_base_url(url.into());
        self
    }

    pub fn with_bookings_api_url(mut self, url: impl Into<String>) -> Self {
        self.bookings_api_url = trim_base_url(url.into());
        self
    }

    pub fn with_ranking(mut self, cost: f64, time: f64) -> Self {
        self.ranking = RankingWeights::new(cost, time);
        self
    }

    pub fn search_queue(&self) -> SearchQueue {
        SearchQueue::with_qps_limit(u64::from(self.queries_per_second))
    }

    pub fn ranker(&self) -> Ranker {
        Ranker::new(self.ranking)
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
