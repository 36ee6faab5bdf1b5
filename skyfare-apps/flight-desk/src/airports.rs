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

//! # Airport Directory
//!
//! Static reference table of US airports served by the flight service.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Airport {
    pub code: &'static str,
    pub name: &'static str,
    pub city: &'static str,
    pub state: &'static str,
}

pub static AIRPORTS: &[Airport] = &[
    Airport { code: "ABQ", name: "Albuquerque International Sunport", city: "Albuquerque", state: "NM" },
    Airport { code: "ACK", name: "Nantucket Memorial Airport", city: "Nantucket", state: "MA" },
    Airport { code: "ALB", name: "Albany International Airport", city: "Albany", state: "NY" },
    Airport { code: "ATL", name: "Hartsfield-Jackson Atlanta International Airport", city: "Atlanta", state: "GA" },
    Airport { code: "AUS", name: "Austin-Bergstrom International Airport", city: "Austin", state: "TX" },
    Airport { code: "AVL", name: "Asheville Regional Airport", city: "Asheville", state: "NC" },
    Airport { code: "BDL", name: "Bradley International Airport", city: "Hartford", state: "CT" },
    Airport { code: "BGR", name: "Bangor International Airport", city: "Bangor", state: "ME" },
    Airport { code: "BHM", name: "Birmingham-Shuttlesworth International Airport", city: "Birmingham", state: "AL" },
    Airport { code: "BNA", name: "Nashville International Airport", city: "Nashville", state: "TN" },
    Airport { code: "BOS", name: "Boston Logan International Airport", city: "Boston", state: "MA" },
    Airport { code: "BQN", name: "Rafael Hernandez Airport", city: "Aguadilla", state: "PR" },
    Airport { code: "BTV", name: "Burlington International Airport", city: "Burlington", state: "VT" },
    Airport { code: "BUF", name: "Buffalo Niagara International Airport", city: "Buffalo", state: "NY" },
    Airport { code: "BUR", name: "Bob Hope Airport", city: "Burbank", state: "CA" },
    Airport { code: "BWI", name: "Baltimore/Washington International Airport", city: "Baltimore", state: "MD" },
    Airport { code: "BZN", name: "Bozeman Yellowstone International Airport", city: "Bozeman", state: "MT" },
    Airport { code: "CAE", name: "Columbia Metropolitan Airport", city: "Columbia", state: "SC" },
    Airport { code: "CAK", name: "Akron-Canton Regional Airport", city: "Akron", state: "OH" },
    Airport { code: "CHS", name: "Charleston International Airport", city: "Charleston", state: "SC" },
    Airport { code: "CLE", name: "Cleveland Hopkins International Airport", city: "Cleveland", state: "OH" },
    Airport { code: "CLT", name: "Charlotte Douglas International Airport", city: "Charlotte", state: "NC" },
    Airport { code: "CMH", name: "John Glenn Columbus International Airport", city: "Columbus", state: "OH" },
    Airport { code: "CRW", name: "Yeager Airport", city: "Charleston", state: "WV" },
    Airport { code: "CVG", name: "Cincinnati/Northern Kentucky International Airport", city: "Cincinnati", state: "KY" },
    Airport { code: "DAY", name: "Dayton International Airport", city: "Dayton", state: "OH" },
    Airport { code: "DCA", name: "Ronald Reagan Washington National Airport", city: "Washington", state: "DC" },
    Airport { code: "DEN", name: "Denver International Airport", city: "Denver", state: "CO" },
    Airport { code: "DFW", name: "Dallas/Fort Worth International Airport", city: "Dallas", state: "TX" },
    Airport { code: "DSM", name: "Des Moines International Airport", city: "Des Moines", state: "IA" },
    Airport { code: "DTW", name: "Detroit Metropolitan Wayne County Airport", city: "Detroit", state: "MI" },
    Airport { code: "EGE", name: "Eagle County Regional Airport", city: "Vail", state: "CO" },
    Airport { code: "EWR", name: "Newark Liberty International Airport", city: "Newark", state: "NJ" },
    Airport { code: "EYW", name: "Key West International Airport", city: "Key West", state: "FL" },
    Airport { code: "FLL", name: "Fort Lauderdale-Hollywood International Airport", city: "Fort Lauderdale", state: "FL" },
    Airport { code: "GRR", name: "Gerald R. Ford International Airport", city: "Grand Rapids", state: "MI" },
    Airport { code: "GSO", name: "Piedmont Triad International Airport", city: "Greensboro", state: "NC" },
    Airport { code: "GSP", name: "Greenville-Spartanburg International Airport", city: "Greenville", state: "SC" },
    Airport { code: "HDN", name: "Yampa Valley Regional Airport", city: "Hayden", state: "CO" },
    Airport { code: "HNL", name: "Daniel K. Inouye International Airport", city: "Honolulu", state: "HI" },
    Airport { code: "HOU", name: "William P. Hobby Airport", city: "Houston", state: "TX" },
    Airport { code: "IAD", name: "Washington Dulles International Airport", city: "Washington", state: "DC" },
    Airport { code: "IAH", name: "George Bush Intercontinental Airport", city: "Houston", state: "TX" },
    Airport { code: "ILM", name: "Wilmington International Airport", city: "Wilmington", state: "NC" },
    Airport { code: "IND", name: "Indianapolis International Airport", city: "Indianapolis", state: "IN" },
    Airport { code: "JAC", name: "Jackson Hole Airport", city: "Jackson", state: "WY" },
    Airport { code: "JAX", name: "Jacksonville International Airport", city: "Jacksonville", state: "FL" },
    Airport { code: "JFK", name: "John F. Kennedy International Airport", city: "New York", state: "NY" },
    Airport { code: "LAS", name: "McCarran International Airport", city: "Las Vegas", state: "NV" },
    Airport { code: "LAX", name: "Los Angeles International Airport", city: "Los Angeles", state: "CA" },
    Airport { code: "LGA", name: "LaGuardia Airport", city: "New York", state: "NY" },
    Airport { code: "LGB", name: "Long Beach Airport", city: "Long Beach", state: "CA" },
    Airport { code: "MCI", name: "Kansas City International Airport", city: "Kansas City", state: "MO" },
    Airport { code: "MCO", name: "Orlando International Airport", city: "Orlando", state: "FL" },
    Airport { code: "MDW", name: "Chicago Midway International Airport", city: "Chicago", state: "IL" },
    Airport { code: "MEM", name: "Memphis International Airport", city: "Memphis", state: "TN" },
    Airport { code: "MHT", name: "Manchester-Boston Regional Airport", city: "Manchester", state: "NH" },
    Airport { code: "MIA", name: "Miami International Airport", city: "Miami", state: "FL" },
    Airport { code: "MKE", name: "Milwaukee Mitchell International Airport", city: "Milwaukee", state: "WI" },
    Airport { code: "MSN", name: "Dane County Regional Airport", city: "Madison", state: "WI" },
    Airport { code: "MSP", name: "Minneapolis-Saint Paul International Airport", city: "Minneapolis", state: "MN" },
    Airport { code: "MSY", name: "Louis Armstrong New Orleans International Airport", city: "New Orleans", state: "LA" },
    Airport { code: "MTJ", name: "Montrose Regional Airport", city: "Montrose", state: "CO" },
    Airport { code: "MVY", name: "Martha's Vineyard Airport", city: "Martha's Vineyard", state: "MA" },
    Airport { code: "MYR", name: "Myrtle Beach International Airport", city: "Myrtle Beach", state: "SC" },
    Airport { code: "OAK", name: "Oakland International Airport", city: "Oakland", state: "CA" },
    Airport { code: "OKC", name: "Will Rogers World Airport", city: "Oklahoma City", state: "OK" },
    Airport { code: "OMA", name: "Eppley Airfield", city: "Omaha", state: "NE" },
    Airport { code: "ORD", name: "O'Hare International Airport", city: "Chicago", state: "IL" },
    Airport { code: "ORF", name: "Norfolk International Airport", city: "Norfolk", state: "VA" },
    Airport { code: "PBI", name: "Palm Beach International Airport", city: "West Palm Beach", state: "FL" },
    Airport { code: "PDX", name: "Portland International Airport", city: "Portland", state: "OR" },
    Airport { code: "PHL", name: "Philadelphia International Airport", city: "Philadelphia", state: "PA" },
    Airport { code: "PHX", name: "Phoenix Sky Harbor International Airport", city: "Phoenix", state: "AZ" },
    Airport { code: "PIT", name: "Pittsburgh International Airport", city: "Pittsburgh", state: "PA" },
    Airport { code: "PSE", name: "Mercedita Airport", city: "Ponce", state: "PR" },
    Airport { code: "PSP", name: "Palm Springs International Airport", city: "Palm Springs", state: "CA" },
    Airport { code: "PVD", name: "T.F. Green International Airport", city: "Providence", state: "RI" },
    Airport { code: "PWM", name: "Portland International Jetport", city: "Portland", state: "ME" },
    Airport { code: "RDU", name: "Raleigh-Durham International Airport", city: "Raleigh", state: "NC" },
    Airport { code: "RIC", name: "Richmond International Airport", city: "Richmond", state: "VA" },
    Airport { code: "ROC", name: "Greater Rochester International Airport", city: "Rochester", state: "NY" },
    Airport { code: "RSW", name: "Southwest Florida International Airport", city: "Fort Myers", state: "FL" },
    Airport { code: "SAN", name: "San Diego International Airport", city: "San Diego", state: "CA" },
    Airport { code: "SAT", name: "San Antonio International Airport", city: "San Antonio", state: "TX" },
    Airport { code: "SAV", name: "Savannah/Hilton Head International Airport", city: "Savannah", state: "GA" },
    Airport { code: "SBN", name: "South Bend International Airport", city: "South Bend", state: "IN" },
    Airport { code: "SDF", name: "Louisville Muhammad Ali International Airport", city: "Louisville", state: "KY" },
    Airport { code: "SEA", name: "Seattle-Tacoma International Airport", city: "Seattle", state: "WA" },
    Airport { code: "SFO", name: "San Francisco International Airport", city: "San Francisco", state: "CA" },
    Airport { code: "SJC", name: "Norman Y. Mineta San Jose International Airport", city: "San Jose", state: "CA" },
    Airport { code: "SJU", name: "Luis Muñoz Marín International Airport", city: "San Juan", state: "PR" },
    Airport { code: "SLC", name: "Salt Lake City International Airport", city: "Salt Lake City", state: "UT" },
    Airport { code: "SMF", name: "Sacramento International Airport", city: "Sacramento", state: "CA" },
    Airport { code: "SNA", name: "John Wayne Airport", city: "Santa Ana", state: "CA" },
    Airport { code: "SRQ", name: "Sarasota-Bradenton International Airport", city: "Sarasota", state: "FL" },
    Airport { code: "STL", name: "St. Louis Lambert International Airport", city: "St. Louis", state: "MO" },
    Airport { code: "STT", name: "Cyril E. King Airport", city: "Charlotte Amalie", state: "VI" },
    Airport { code: "SYR", name: "Syracuse Hancock International Airport", city: "Syracuse", state: "NY" },
    Airport { code: "TPA", name: "Tampa International Airport", city: "Tampa", state: "FL" },
    Airport { code: "TUL", name: "Tulsa International Airport", city: "Tulsa", state: "OK" },
    Airport { code: "TYS", name: "McGhee Tyson Airport", city: "Knoxville", state: "TN" },
    Airport { code: "XNA", name: "Northwest Arkansas National Airport", city: "Fayetteville", state: "AR" },
];

static AIRPORT_INDEX: Lazy<HashMap<&'static str, &'static Airport>> =
    Lazy::new(|| AIRPORTS.iter().map(|a| (a.code, a)).collect());

pub fn airport_info(code: &str) -> Option<&'static Airport> {
    AIRPORT_INDEX.get(code.trim().to_uppercase().as_str()).copied()
}

/// "SFO - San Francisco International Airport", or the code itself when
/// unknown.
pub fn display_name(code: &str) -> String {
    match airport_info(code) {
        Some(a) => format!("{} - {}", a.code, a.name),
        None => code.to_string(),
    }
}

/// "San Francisco, CA", or the code itself when unknown.
pub fn location(code: &str) -> String {
    match airport_info(code) {
        Some(a) => format!("{}, {}", a.city, a.state),
        None => code.to_string(),
    }
}

/// Case-insensitive lookup by code, city or name. Exact code matches come
/// first, then code prefixes, city prefixes and finally name or city
/// substrings; table order breaks ties.
pub fn search(query: &str, limit: usize) -> Vec<&'static Airport> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return AIRPORTS.iter().take(limit).collect();
    }

    let mut scored: Vec<(u8, usize, &'static Airport)> = AIRPORTS
        .iter()
        .enumerate()
        .filter_map(|(idx, a)| {
            let code = a.code.to_lowercase();
            let city = a.city.to_lowercase();
            let name = a.name.to_lowercase();
            let rank = if code == needle {
                0
            } else if code.starts_with(&needle) {
                1
            } else if city.starts_with(&needle) {
                2
            } else if city.contains(&needle) || name.contains(&needle) {
                3
            } else {
                return None;
            };
            Some((rank, idx, a))
        })
        .collect();

    scored.sort_by_key(|(rank, idx, _)| (*rank, *idx));
    scored.into_iter().take(limit).map(|(_, _, a)| a).collect()
}
