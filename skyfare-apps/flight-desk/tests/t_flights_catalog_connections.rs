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

//! Offline catalog search and connection synthesis over the day fixture.

use std::path::PathBuf;

use chrono::NaiveDate;
use skyfare_flight_desk::{
    ClockTime, ConnectionRules, Fare, Flight, FlightCatalog, FlightSource, Priority, SearchCriteria,
    TravelDate,
};

fn catalog() -> FlightCatalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures-flights/day-2025-05-20.json");
    FlightCatalog::from_json_file(path).expect("load fixture")
}

fn may_20() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

fn sfo_jfk(priority: Priority) -> SearchCriteria {
    SearchCriteria::builder()
        .route("SFO", "JFK")
        .date(may_20())
        .priority(priority)
        .build()
        .unwrap()
}

fn leg(src: &str, dst: &str, takeoff: &str, landing: &str, duration: u32, cost: &str) -> Flight {
    Flight::direct(
        TravelDate::new("2025", "05", "20"),
        src,
        dst,
        ClockTime::parse(takeoff).unwrap(),
        ClockTime::parse(landing).unwrap(),
        duration,
        Fare::new(cost),
    )
    .unwrap()
}

#[test]
fn test_connections_respect_layover_window() {
    let connections = catalog().find_connections("SFO", "JFK", may_20());
    let hubs: Vec<&str> = connections
        .iter()
        .map(|f| f.connection().unwrap().connection_airport())
        .collect();
    // ORD 1300 → 2200 (9h) is too long; ORD 1300 → 1430 and DEN 2330 → 0045 fit.
    assert_eq!(hubs, vec!["ORD", "DEN"]);

    let via_ord = &connections[0];
    assert_eq!(via_ord.cost().amount(), Some(280));
    assert_eq!(via_ord.duration(), 240 + 90 + 135);
    assert_eq!(via_ord.connection().unwrap().layover_hours(), 1.5);
    assert_eq!(via_ord.airline().unwrap().code, "UA");
    let legs: Vec<(&str, &str)> = via_ord
        .segments()
        .iter()
        .map(|s| (s.source.as_str(), s.destination.as_str()))
        .collect();
    assert_eq!(legs, vec![("SFO", "ORD"), ("ORD", "JFK")]);
}

#[test]
fn test_layover_wraps_past_midnight() {
    let connections = catalog().find_connections("SFO", "JFK", may_20());
    let via_den = connections
        .iter()
        .find(|f| f.connection().unwrap().connection_airport() == "DEN")
        .unwrap();
    assert_eq!(via_den.duration(), 150 + 75 + 225);
    assert_eq!(via_den.connection().unwrap().layover_hours(), 1.3);
    assert_eq!(via_den.takeoff().to_string(), "2000");
    assert_eq!(via_den.landing().to_string(), "0630");
}

#[test]
fn test_connection_rules_are_configurable() {
    let strict = catalog().with_rules(ConnectionRules {
        min_layover_minutes: 80,
        ..Default::default()
    });
    let hubs: Vec<String> = strict
        .find_connections("SFO", "JFK", may_20())
        .iter()
        .map(|f| f.connection().unwrap().connection_airport().to_string())
        .collect();
    assert_eq!(hubs, vec!["ORD"]);

    let capped = catalog().with_rules(ConnectionRules {
        max_connections: 1,
        ..Default::default()
    });
    assert_eq!(capped.find_connections("SFO", "JFK", may_20()).len(), 1);
}

#[test]
fn test_smart_search_merges_connections() {
    let catalog = catalog();
    let by_cost = catalog.smart_search(&sfo_jfk(Priority::Cost));
    let costs: Vec<Option<i64>> = by_cost.iter().map(|f| f.cost().amount()).collect();
    assert_eq!(costs, vec![Some(260), Some(280), Some(310), Some(420)]);

    let by_time = catalog.smart_search(&sfo_jfk(Priority::Time));
    let durations: Vec<u32> = by_time.iter().map(|f| f.duration()).collect();
    assert_eq!(durations, vec![330, 330, 450, 465]);

    let direct = catalog.smart_search(&SearchCriteria {
        include_connections: false,
        ..sfo_jfk(Priority::Cost)
    });
    assert_eq!(direct.len(), 2);
    assert!(direct.iter().all(|f| !f.is_connecting()));
}

#[test]
fn test_route_search_without_date_skips_connections() {
    let criteria = SearchCriteria::builder().route("SFO", "JFK").build().unwrap();
    let flights = catalog().smart_search(&criteria);
    assert_eq!(flights.len(), 3);
    assert!(flights.iter().all(|f| !f.is_connecting()));
}

#[test]
fn test_limit_truncates() {
    let limited = catalog().with_limit(2);
    assert_eq!(limited.smart_search(&sfo_jfk(Priority::Cost)).len(), 2);
}

#[test]
fn test_stats() {
    let stats = catalog().stats();
    assert_eq!(stats.total_flights, 10);
    assert_eq!(stats.dates, 2);
    assert_eq!(stats.total_airports, 6);
}

#[tokio::test]
async fn test_catalog_is_a_flight_source() {
    let catalog = catalog();
    let flights = catalog.search(&sfo_jfk(Priority::Cost)).await.unwrap();
    assert_eq!(flights.len(), 4);
}

#[test]
fn test_overflowing_cost_pair_is_skipped() {
    let catalog = FlightCatalog::new(vec![
        leg("SFO", "ORD", "0700", "1300", 240, "9223372036854775807"),
        leg("ORD", "JFK", "1430", "1745", 135, "100"),
        leg("SFO", "JFK", "0800", "1630", 330, "420"),
    ]);
    assert!(catalog.find_connections("SFO", "JFK", may_20()).is_empty());

    let flights = catalog.smart_search(&sfo_jfk(Priority::Cost));
    assert_eq!(flights.len(), 1);
    assert!(!flights[0].is_connecting());
}

#[test]
fn test_overflowing_duration_pair_is_skipped() {
    let catalog = FlightCatalog::new(vec![
        leg("SFO", "ORD", "0700", "1300", 4_294_967_000, "150"),
        leg("ORD", "JFK", "1430", "1745", 135, "130"),
        leg("ORD", "JFK", "1500", "1815", 135, "90"),
    ]);
    assert!(catalog.find_connections("SFO", "JFK", may_20()).is_empty());
    assert!(catalog.smart_search(&sfo_jfk(Priority::Time)).is_empty());

    // A sane pair next to the overflowing one still connects.
    let catalog = FlightCatalog::new(vec![
        leg("SFO", "ORD", "0700", "1300", 4_294_967_000, "150"),
        leg("SFO", "ORD", "0715", "1315", 240, "160"),
        leg("ORD", "JFK", "1430", "1745", 135, "130"),
    ]);
    let connections = catalog.find_connections("SFO", "JFK", may_20());
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].cost().amount(), Some(290));
    assert_eq!(connections[0].duration(), 240 + 75 + 135);
}
