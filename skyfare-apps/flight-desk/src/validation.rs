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

//! Booking form checks, run before booking assembly.

use crate::bookings::{Passenger, PaymentInfo};
use crate::error::DeskError;

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Labels of the empty required fields, passengers numbered from 1.
pub fn missing_passenger_fields(passengers: &[Passenger]) -> Vec<String> {
    let mut missing = Vec::new();
    for (idx, p) in passengers.iter().enumerate() {
        let required = [
            ("first name", &p.first_name),
            ("last name", &p.last_name),
            ("date of birth", &p.date_of_birth),
            ("email", &p.email),
            ("phone", &p.phone),
        ];
        for (label, value) in required {
            if blank(value) {
                missing.push(format!("passenger {}: {}", idx + 1, label));
            }
        }
    }
    missing
}

pub fn missing_payment_fields(payment: &PaymentInfo) -> Vec<String> {
    let required = [
        ("card number", &payment.card_number),
        ("card holder name", &payment.card_holder_name),
        ("expiry month", &payment.expiry_month),
        ("expiry year", &payment.expiry_year),
        ("cvv", &payment.cvv),
        ("billing address", &payment.billing_address),
        ("city", &payment.city),
        ("state", &payment.state),
        ("zip code", &payment.zip_code),
    ];
    required
        .into_iter()
        .filter(|(_, value)| blank(value))
        .map(|(label, _)| format!("payment: {}", label))
        .collect()
}

/// Collect every missing field of the booking form into one
/// [`DeskError::Validation`].
pub fn validate_booking_form(
    passengers: &[Passenger],
    payment: &PaymentInfo,
    terms_accepted: bool,
) -> Result<(), DeskError> {
    let mut missing = Vec::new();
    if passengers.is_empty() {
        missing.push("passengers".to_string());
    }
    missing.extend(missing_passenger_fields(passengers));
    missing.extend(missing_payment_fields(payment));
    if !terms_accepted {
        missing.push("terms".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::debug!("Booking form incomplete: {} field(s)", missing.len());
        Err(DeskError::validation(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_passenger() -> Passenger {
        Passenger {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: "1990-12-10".into(),
            passport_number: String::new(),
            email: "ada@example.com".into(),
            phone: "+1 555 0100".into(),
            seat_preference: "window".into(),
            special_requests: None,
        }
    }

    fn complete_payment() -> PaymentInfo {
        PaymentInfo {
            card_number: "4111111111111111".into(),
            card_holder_name: "Ada Lovelace".into(),
            expiry_month: "12".into(),
            expiry_year: "2030".into(),
            cvv: "123".into(),
            billing_address: "1 Analytical Way".into(),
            city: "Boston".into(),
            state: "MA".into(),
            zip_code: "02110".into(),
            country: String::new(),
        }
    }

    #[test]
    fn test_complete_form_passes() {
        assert!(validate_booking_form(&[complete_passenger()], &complete_payment(), true).is_ok());
    }

    #[test]
    fn test_every_missing_field_listed() {
        let mut second = complete_passenger();
        second.email = "  ".into();
        second.first_name.clear();
        let mut payment = complete_payment();
        payment.cvv.clear();

        let err = validate_booking_form(&[complete_passenger(), second], &payment, false)
            .unwrap_err();
        match err {
            DeskError::Validation { missing } => assert_eq!(
                missing,
                vec![
                    "passenger 2: first name",
                    "passenger 2: email",
                    "payment: cvv",
                    "terms"
                ]
            ),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_passengers_rejected() {
        let err = validate_booking_form(&[], &complete_payment(), true).unwrap_err();
        assert!(err.to_string().contains("passengers"));
    }
}
