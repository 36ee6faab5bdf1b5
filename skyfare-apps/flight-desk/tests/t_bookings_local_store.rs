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

//! Local booking mirror: per-user scoping, status changes and persistence.

use chrono::NaiveDate;
use skyfare_flight_desk::{
    Booking, BookingStatus, ClockTime, DeskError, Fare, Flight, LocalBookingStore, Passenger,
    PaymentInfo, TravelDate, create_booking,
};

fn booking(user: &str, day: &str) -> Booking {
    let flight = Flight::direct(
        TravelDate::new("2025", "8", day),
        "SEA",
        "DEN",
        ClockTime::parse("0715").unwrap(),
        ClockTime::parse("1040").unwrap(),
        145,
        Fare::new("189"),
    )
    .unwrap();
    let passenger = Passenger {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        ..Default::default()
    };
    create_booking(user, flight, vec![passenger], PaymentInfo::default(), 1).unwrap()
}

fn aug(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
}

#[test]
fn test_bookings_are_scoped_to_user() {
    let mut store = LocalBookingStore::in_memory();
    let mine = booking("alice", "14");
    let theirs = booking("bob", "14");
    store.add(mine.clone()).unwrap();
    store.add(theirs.clone()).unwrap();

    assert_eq!(store.user_bookings("alice").len(), 1);
    assert!(store.find("alice", &mine.booking_ref).is_some());
    assert!(store.find("alice", &theirs.id).is_none());

    let err = store
        .update_status("alice", &theirs.id, BookingStatus::Cancelled)
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<DeskError>(), Some(DeskError::NotFound(_))));
    assert!(!store.delete("alice", &theirs.id).unwrap());
    assert_eq!(store.user_bookings("bob").len(), 1);
}

#[test]
fn test_status_changes_follow_lifecycle() {
    let mut store = LocalBookingStore::in_memory();
    let b = booking("alice", "14");
    store.add(b.clone()).unwrap();

    let cancelled = store.update_status("alice", &b.id, BookingStatus::Cancelled).unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(store.by_status("alice", BookingStatus::Cancelled).len(), 1);

    let err = store
        .update_status("alice", &b.booking_ref, BookingStatus::Completed)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DeskError>(),
        Some(DeskError::InvalidStatusTransition { .. })
    ));
}

#[test]
fn test_upcoming_and_completed_lists() {
    let mut store = LocalBookingStore::in_memory();
    let early = booking("alice", "2");
    let late = booking("alice", "28");
    store.add(early.clone()).unwrap();
    store.add(late.clone()).unwrap();

    let upcoming = store.upcoming("alice", aug(14));
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, late.id);

    let completed = store.completed("alice", aug(14));
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, early.id);
}

#[test]
fn test_mirror_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/bookings.json");

    let b = booking("alice", "14");
    {
        let mut store = LocalBookingStore::open(&path);
        assert!(store.user_bookings("alice").is_empty());
        store.add(b.clone()).unwrap();
        store.update_status("alice", &b.id, BookingStatus::Cancelled).unwrap();
    }

    let reopened = LocalBookingStore::open(&path);
    let restored = reopened.find("alice", &b.id).unwrap();
    assert_eq!(restored.status, BookingStatus::Cancelled);
    assert_eq!(restored.booking_ref, b.booking_ref);
    assert_eq!(restored.flight, b.flight);

    let mut store = LocalBookingStore::open(&path);
    assert!(store.delete("alice", &b.booking_ref).unwrap());
    assert!(LocalBookingStore::open(&path).user_bookings("alice").is_empty());
}

#[test]
fn test_corrupt_mirror_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut store = LocalBookingStore::open(&path);
    assert!(store.user_bookings("alice").is_empty());
    store.add(booking("alice", "14")).unwrap();
    assert_eq!(LocalBookingStore::open(&path).user_bookings("alice").len(), 1);
}

#[test]
fn test_failed_write_leaves_memory_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookings.json");
    let b = booking("alice", "14");
    let mut store = LocalBookingStore::open(&path);
    store.add(b.clone()).unwrap();

    // A directory in place of the mirror file makes every write fail.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    assert!(store.update_status("alice", &b.id, BookingStatus::Cancelled).is_err());
    assert_eq!(store.find("alice", &b.id).unwrap().status, BookingStatus::Confirmed);

    assert!(store.add(booking("alice", "20")).is_err());
    assert!(store.delete("alice", &b.id).is_err());
    assert_eq!(store.user_bookings("alice").len(), 1);
}
