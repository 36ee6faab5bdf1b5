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

//! # Bookings
//!
//! Booking model and assembly. Assembly is pure apart from the clock and the
//! random reference suffix; persisting the result is the caller's job.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DeskError;
use crate::flight_model::Flight;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static BOOKING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub passport_number: String,
    pub email: String,
    pub phone: String,
    pub seat_preference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
    pub billing_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl PaymentInfo {
    /// Card number reduced to its last four digits, for display.
    pub fn masked_card(&self) -> String {
        let digits: Vec<char> = self
            .card_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
        format!("**** {}", tail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Only `confirmed → cancelled` and `confirmed → completed` are allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }

    pub fn transition_to(self, next: BookingStatus) -> Result<BookingStatus, DeskError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DeskError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub booking_ref: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub flight: Flight,
    pub passengers: Vec<Passenger>,
    pub payment: PaymentInfo,
    pub total_cost: i64,
    pub passenger_count: u32,
}

impl Booking {
    /// Apply a status change, rejecting transitions out of a terminal state.
    pub fn with_status(mut self, next: BookingStatus) -> Result<Self, DeskError> {
        self.status = self.status.transition_to(next)?;
        Ok(self)
    }

    pub fn departure_date(&self) -> Option<NaiveDate> {
        self.flight.date().to_naive_date()
    }

    /// Confirmed and departing after `today`.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.status == BookingStatus::Confirmed
            && self.departure_date().is_some_and(|d| d > today)
    }

    /// Departed before `today`, whatever the status.
    pub fn is_completed(&self, today: NaiveDate) -> bool {
        self.departure_date().is_some_and(|d| d < today)
    }
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `BK` + last 8 digits of the millisecond clock + process sequence + 4
/// random base36 characters.
pub fn generate_booking_ref() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    let seq = BOOKING_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("BK{}{}{}", tail, seq, random_base36(4).to_uppercase())
}

pub fn generate_booking_id() -> String {
    let seq = BOOKING_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "booking_{}_{}_{}",
        Utc::now().timestamp_millis(),
        seq,
        random_base36(7)
    )
}

/// Assemble a confirmed booking from a chosen flight and validated form data.
///
/// `total_cost` is the integer unit cost times `passenger_count`.
pub fn create_booking(
    user_id: &str,
    flight: Flight,
    passengers: Vec<Passenger>,
    payment: PaymentInfo,
    passenger_count: u32,
) -> Result<Booking, DeskError> {
    if passenger_count == 0 {
        return Err(DeskError::InvalidBookingInput(
            "passenger count must be at least 1".into(),
        ));
    }
    if passengers.len() != passenger_count as usize {
        return Err(DeskError::InvalidBookingInput(format!(
            "{} passenger record(s) for a party of {}",
            passengers.len(),
            passenger_count
        )));
    }
    let unit_cost = flight.cost().amount().ok_or_else(|| {
        DeskError::InvalidBookingInput(format!("flight cost '{}' is not a number", flight.cost().raw()))
    })?;

    let booking = Booking {
        id: generate_booking_id(),
        booking_ref: generate_booking_ref(),
        status: BookingStatus::Confirmed,
        created_at: Utc::now(),
        user_id: user_id.to_string(),
        flight,
        passengers,
        payment,
        total_cost: unit_cost.saturating_mul(i64::from(passenger_count)),
        passenger_count,
    };
    tracing::debug!(
        "Assembled booking {} for user {}: {} x {} = {}",
        booking.booking_ref,
        user_id,
        unit_cost,
        passenger_count,
        booking.total_cost
    );
    Ok(booking)
}
