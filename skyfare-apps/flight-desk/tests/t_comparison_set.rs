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

//! Comparison set behavior: membership limits, identity and hand-off.

use skyfare_flight_desk::{
    ClockTime, ComparisonSet, Fare, Flight, MAX_COMPARED_FLIGHTS, Notice, SearchSession,
    ToggleOutcome, TravelDate,
};

fn flight(dst: &str, takeoff: &str, cost: i64, duration: u32) -> Flight {
    Flight::direct(
        TravelDate::new("2025", "5", "20"),
        "SFO",
        dst,
        ClockTime::parse(takeoff).unwrap(),
        ClockTime::parse("2200").unwrap(),
        duration,
        Fare::from_amount(cost),
    )
    .unwrap()
}

fn four() -> [Flight; 4] {
    [
        flight("JFK", "0800", 420, 330),
        flight("JFK", "1300", 310, 345),
        flight("ORD", "0700", 150, 240),
        flight("BOS", "0900", 380, 325),
    ]
}

#[test]
fn test_fourth_flight_is_rejected() {
    let [f1, f2, f3, f4] = four();
    let mut set = ComparisonSet::new();
    assert_eq!(set.toggle(&f1), ToggleOutcome::Added);
    assert_eq!(set.toggle(&f2), ToggleOutcome::Added);
    assert_eq!(set.toggle(&f3), ToggleOutcome::Added);
    assert!(set.is_full());
    assert_eq!(set.toggle(&f4), ToggleOutcome::RejectedFull);
    assert_eq!(set.len(), MAX_COMPARED_FLIGHTS);
    assert!(!set.contains(&f4));

    // Removing one makes room again.
    assert_eq!(set.toggle(&f2), ToggleOutcome::Removed);
    assert_eq!(set.toggle(&f4), ToggleOutcome::Added);
    let order: Vec<&str> = set.flights().iter().map(|f| f.destination()).collect();
    assert_eq!(order, vec!["JFK", "ORD", "BOS"]);
}

#[test]
fn test_identity_is_route_takeoff_and_cost() {
    let a = flight("JFK", "0800", 420, 330);
    // Same offer from a fresh search, different duration and airline data.
    let same = flight("JFK", "0800", 420, 999);
    let cheaper = flight("JFK", "0800", 400, 330);

    let mut set = ComparisonSet::new();
    set.toggle(&a);
    assert!(set.contains(&same));
    assert!(!set.contains(&cheaper));
    assert_eq!(set.toggle(&same), ToggleOutcome::Removed);
    assert!(set.is_empty());
}

#[test]
fn test_toggle_twice_restores_set() {
    let [f1, f2, ..] = four();
    let mut set = ComparisonSet::new();
    set.toggle(&f1);
    let before = set.clone();
    set.toggle(&f2);
    set.toggle(&f2);
    assert_eq!(set, before);
}

#[test]
fn test_comparison_view_highlights() {
    let [f1, f2, f3, _] = four();
    let mut set = ComparisonSet::new();
    for f in [&f1, &f2, &f3] {
        set.toggle(f);
    }
    let view = set.compare().unwrap();
    assert_eq!(view.best_value, Some(2));
    assert_eq!(view.fastest, Some(2));
    assert_eq!(view.best_value_flight().unwrap().destination(), "ORD");

    let single = ComparisonSet::new();
    assert_eq!(single.compare().unwrap_err(), Notice::NotEnoughToCompare { have: 0 });
}

#[test]
fn test_handoff_token_roundtrip() {
    let [f1, f2, ..] = four();
    let mut set = ComparisonSet::new();
    set.toggle(&f1);
    set.toggle(&f2);

    let token = set.to_handoff_token().unwrap();
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    let restored = ComparisonSet::from_handoff_token(&token).unwrap();
    assert_eq!(restored, set);

    assert!(ComparisonSet::from_handoff_token("not base64!").is_err());
}

#[test]
fn test_session_reports_full_set() {
    let flights = four();
    let mut session = SearchSession::default();
    let mut notices = Vec::new();
    for f in &flights {
        let (next, notice) = session.toggle_comparison(f);
        session = next;
        notices.extend(notice);
    }
    assert_eq!(notices, vec![Notice::ComparisonFull]);

    let (session, view) = session.enter_comparison();
    assert_eq!(view.unwrap().flights.len(), 3);
    assert!(session.comparison().is_empty());
}

#[test]
fn test_toggle_sequence_keeps_insertion_order() {
    let [f1, f2, f3, f4] = four();
    let mut set = ComparisonSet::new();
    let outcomes: Vec<ToggleOutcome> = [&f1, &f2, &f1, &f1, &f3, &f4]
        .into_iter()
        .map(|f| set.toggle(f))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ToggleOutcome::Added,
            ToggleOutcome::Added,
            ToggleOutcome::Removed,
            ToggleOutcome::Added,
            ToggleOutcome::Added,
            ToggleOutcome::RejectedFull,
        ]
    );
    assert_eq!(set.flights(), &[f2, f1, f3]);
}
