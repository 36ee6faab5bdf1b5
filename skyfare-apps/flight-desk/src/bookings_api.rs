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

//! # Bookings API Client
//!
//! Remote persistence of bookings and saved traveller details. Every call
//! needs a bearer credential; without one nothing is sent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skyfare_search_queue::SearchQueue;

use crate::bookings::{Booking, BookingStatus, Passenger, PaymentInfo};
use crate::config::DeskConfig;
use crate::error::DeskError;
use crate::flight_model::{AirlineInfo, Flight};
use crate::flight_records::FlightRecord;
use crate::flights_search::{Method, http_exchange, status_error};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPassenger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    #[serde(default)]
    pub passport_number: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub seat_preference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPayment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    /// Sent on creation only; the service never returns it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cvv: String,
    pub billing_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl From<&Passenger> for ApiPassenger {
    fn from(p: &Passenger) -> Self {
        ApiPassenger {
            id: None,
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            date_of_birth: p.date_of_birth.clone(),
            passport_number: p.passport_number.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            seat_preference: p.seat_preference.clone(),
            special_requests: p.special_requests.clone(),
        }
    }
}

impl From<ApiPassenger> for Passenger {
    fn from(p: ApiPassenger) -> Self {
        Passenger {
            first_name: p.first_name,
            last_name: p.last_name,
            date_of_birth: p.date_of_birth,
            passport_number: p.passport_number,
            email: p.email,
            phone: p.phone,
            seat_preference: p.seat_preference,
            special_requests: p.special_requests,
        }
    }
}

impl From<&PaymentInfo> for ApiPayment {
    fn from(p: &PaymentInfo) -> Self {
        ApiPayment {
            id: None,
            card_number: p.card_number.clone(),
            card_holder_name: p.card_holder_name.clone(),
            expiry_month: p.expiry_month.clone(),
            expiry_year: p.expiry_year.clone(),
            cvv: p.cvv.clone(),
            billing_address: p.billing_address.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
            zip_code: p.zip_code.clone(),
            country: p.country.clone(),
        }
    }
}

impl From<ApiPayment> for PaymentInfo {
    fn from(p: ApiPayment) -> Self {
        PaymentInfo {
            card_number: p.card_number,
            card_holder_name: p.card_holder_name,
            expiry_month: p.expiry_month,
            expiry_year: p.expiry_year,
            cvv: p.cvv,
            billing_address: p.billing_address,
            city: p.city,
            state: p.state,
            zip_code: p.zip_code,
            country: p.country,
        }
    }
}

/// A booking as returned by the bookings service: flat flight fields and
/// numeric ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingApiResponse {
    pub id: i64,
    pub booking_ref: String,
    pub status: String,
    pub user_id: i64,
    pub flight_year: String,
    pub flight_month: String,
    pub flight_day: String,
    pub source: String,
    pub destination: String,
    pub cost: String,
    pub takeoff: String,
    pub landing: String,
    pub duration: u32,
    #[serde(default)]
    pub airline_code: Option<String>,
    #[serde(default)]
    pub airline_name: Option<String>,
    #[serde(default)]
    pub airline_logo: Option<String>,
    #[serde(default)]
    pub airline_description: Option<String>,
    #[serde(default)]
    pub is_connecting: bool,
    #[serde(default)]
    pub connection_airport: Option<String>,
    #[serde(default)]
    pub layover_hours: Option<f64>,
    pub total_cost: i64,
    pub passenger_count: u32,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub passengers: Vec<ApiPassenger>,
    pub payment: ApiPayment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingApiResponse>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub flight: FlightRecord,
    pub passengers: Vec<ApiPassenger>,
    pub payment: ApiPayment,
    pub passenger_count: u32,
}

impl From<&Booking> for CreateBookingRequest {
    fn from(booking: &Booking) -> Self {
        CreateBookingRequest {
            flight: FlightRecord::from(&booking.flight),
            passengers: booking.passengers.iter().map(ApiPassenger::from).collect(),
            payment: ApiPayment::from(&booking.payment),
            passenger_count: booking.passenger_count,
        }
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    // The service emits naive UTC timestamps.
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    tracing::warn!("Unparsable booking timestamp '{}'", raw);
    DateTime::<Utc>::default()
}

impl TryFrom<BookingApiResponse> for Booking {
    type Error = DeskError;

    fn try_from(api: BookingApiResponse) -> Result<Self, Self::Error> {
        let status: BookingStatus = api.status.parse().map_err(DeskError::Transport)?;

        let airline = api.airline_code.map(|code| AirlineInfo {
            code,
            name: api.airline_name.unwrap_or_default(),
            logo_url: api.airline_logo.unwrap_or_default(),
            description: api.airline_description.unwrap_or_default(),
            frequency: None,
        });
        if api.is_connecting {
            // Segments are not stored by the service; keep the itinerary as
            // a single leg.
            tracing::debug!(
                "Booking {} is connecting via {:?}, segments unavailable",
                api.booking_ref,
                api.connection_airport
            );
        }
        let record = FlightRecord {
            year: api.flight_year,
            month: api.flight_month,
            day: api.flight_day,
            source: api.source,
            destination: api.destination,
            cost: api.cost,
            takeoff: api.takeoff,
            landing: api.landing,
            duration: api.duration,
            airline,
            is_connecting: false,
            connection_airport: None,
            layover_hours: None,
            segments: Vec::new(),
        };
        let flight = Flight::try_from(record).map_err(|e| {
            DeskError::Transport(format!("booking {} has an invalid flight: {}", api.booking_ref, e))
        })?;

        Ok(Booking {
            id: api.id.to_string(),
            booking_ref: api.booking_ref,
            status,
            created_at: parse_timestamp(&api.created_at),
            user_id: api.user_id.to_string(),
            flight,
            passengers: api.passengers.into_iter().map(Passenger::from).collect(),
            payment: PaymentInfo::from(api.payment),
            total_cost: api.total_cost,
            passenger_count: api.passenger_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPassenger {
    pub id: i64,
    #[serde(flatten)]
    pub details: ApiPassenger,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPassengerRequest {
    #[serde(flatten)]
    pub details: ApiPassenger,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPayment {
    pub id: i64,
    /// Last four digits only.
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub billing_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPaymentRequest {
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub billing_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub is_default: bool,
}

impl From<&SavedPassenger> for Passenger {
    fn from(saved: &SavedPassenger) -> Self {
        Passenger::from(saved.details.clone())
    }
}

/// Prefill for a payment form. The CVV is never stored and stays empty.
impl From<&SavedPayment> for PaymentInfo {
    fn from(saved: &SavedPayment) -> Self {
        PaymentInfo {
            card_number: saved.card_number.clone(),
            card_holder_name: saved.card_holder_name.clone(),
            expiry_month: saved.expiry_month.clone(),
            expiry_year: saved.expiry_year.clone(),
            cvv: String::new(),
            billing_address: saved.billing_address.clone(),
            city: saved.city.clone(),
            state: saved.state.clone(),
            zip_code: saved.zip_code.clone(),
            country: saved.country.clone(),
        }
    }
}

/// The passenger flagged primary, else the first one.
pub fn primary_passenger(saved: &[SavedPassenger]) -> Option<&SavedPassenger> {
    saved.iter().find(|p| p.is_primary).or_else(|| saved.first())
}

/// The payment flagged default, else the first one.
pub fn default_payment(saved: &[SavedPayment]) -> Option<&SavedPayment> {
    saved.iter().find(|p| p.is_default).or_else(|| saved.first())
}

#[derive(Clone)]
pub struct BookingsApiClient {
    client: Arc<wreq::Client>,
    query_queue: SearchQueue,
    base_url: String,
    token: Option<String>,
}

impl BookingsApiClient {
    pub fn new(config: &DeskConfig, token: Option<String>) -> Result<Self, DeskError> {
        let client = wreq::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeskError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client: Arc::new(client),
            query_queue: SearchQueue::with_concurrency_limit(2),
            base_url: config.bookings_api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Forget the credential, e.g. after the service rejected it.
    pub fn logout(&mut self) {
        self.token = None;
    }

    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, DeskError> {
        let Some(token) = self.token.clone() else {
            tracing::debug!("No credential, not calling {}", path);
            return Err(DeskError::AuthRequired);
        };

        let start = Instant::now();
        let (status, text) = self
            .query_queue
            .run(http_exchange(
                Arc::clone(&self.client),
                method,
                format!("{}{}", self.base_url, path),
                Some(token),
                body,
            ))
            .await?;
        tracing::debug!("{:?} {} → HTTP {} in {:?}", method, path, status, start.elapsed());

        if status == 401 {
            tracing::warn!("Credential rejected by bookings service, log in again");
        }
        if !(200..300).contains(&status) {
            return Err(status_error(status, &text, path));
        }
        Ok(text)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, DeskError> {
        let text = self.exchange(method, path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| DeskError::Transport(format!("Invalid JSON from {}: {}", path, e)))
    }

    fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, DeskError> {
        serde_json::to_value(value)
            .map_err(|e| DeskError::Transport(format!("Failed to encode request: {}", e)))
    }

    async fn list_at(&self, path: &str) -> Result<Vec<Booking>, DeskError> {
        let list: BookingListResponse = self.call(Method::Get, path, None).await?;
        list.bookings.into_iter().map(Booking::try_from).collect()
    }

    pub async fn list(&self) -> Result<Vec<Booking>, DeskError> {
        self.list_at("/api/bookings").await
    }

    pub async fn upcoming(&self) -> Result<Vec<Booking>, DeskError> {
        self.list_at("/api/bookings/upcoming").await
    }

    pub async fn completed(&self) -> Result<Vec<Booking>, DeskError> {
        self.list_at("/api/bookings/completed").await
    }

    pub async fn create(&self, request: &CreateBookingRequest) -> Result<Booking, DeskError> {
        let body = Self::encode(request)?;
        let created: BookingApiResponse = self.call(Method::Post, "/api/bookings", Some(body)).await?;
        tracing::info!("Booking {} stored remotely as #{}", created.booking_ref, created.id);
        Booking::try_from(created)
    }

    pub async fn get(&self, booking_id: &str) -> Result<Booking, DeskError> {
        let path = format!("/api/bookings/{}", urlencoding::encode(booking_id));
        let api: BookingApiResponse = self.call(Method::Get, &path, None).await?;
        Booking::try_from(api)
    }

    pub async fn update_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, DeskError> {
        let path = format!("/api/bookings/{}/status", urlencoding::encode(booking_id));
        let body = serde_json::json!({ "status": status });
        let api: BookingApiResponse = self.call(Method::Put, &path, Some(body)).await?;
        Booking::try_from(api)
    }

    pub async fn delete(&self, booking_id: &str) -> Result<(), DeskError> {
        let path = format!("/api/bookings/{}", urlencoding::encode(booking_id));
        self.exchange(Method::Delete, &path, None).await.map(|_| ())
    }

    pub async fn saved_passengers(&self) -> Result<Vec<SavedPassenger>, DeskError> {
        self.call(Method::Get, "/api/user/saved-passengers", None).await
    }

    pub async fn save_passenger(
        &self,
        request: &SavedPassengerRequest,
    ) -> Result<SavedPassenger, DeskError> {
        let body = Self::encode(request)?;
        self.call(Method::Post, "/api/user/saved-passengers", Some(body))
            .await
    }

    pub async fn update_saved_passenger(
        &self,
        passenger_id: i64,
        request: &SavedPassengerRequest,
    ) -> Result<SavedPassenger, DeskError> {
        let body = Self::encode(request)?;
        let path = format!("/api/user/saved-passengers/{}", passenger_id);
        self.call(Method::Put, &path, Some(body)).await
    }

    pub async fn delete_saved_passenger(&self, passenger_id: i64) -> Result<(), DeskError> {
        let path = format!("/api/user/saved-passengers/{}", passenger_id);
        self.exchange(Method::Delete, &path, None).await.map(|_| ())
    }

    pub async fn saved_payments(&self) -> Result<Vec<SavedPayment>, DeskError> {
        self.call(Method::Get, "/api/user/saved-payments", None).await
    }

    pub async fn save_payment(&self, request: &SavedPaymentRequest) -> Result<SavedPayment, DeskError> {
        let body = Self::encode(request)?;
        self.call(Method::Post, "/api/user/saved-payments", Some(body))
            .await
    }

    pub async fn update_saved_payment(
        &self,
        payment_id: i64,
        request: &SavedPaymentRequest,
    ) -> Result<SavedPayment, DeskError> {
        let body = Self::encode(request)?;
        let path = format!("/api/user/saved-payments/{}", payment_id);
        self.call(Method::Put, &path, Some(body)).await
    }

    pub async fn delete_saved_payment(&self, payment_id: i64) -> Result<(), DeskError> {
        let path = format!("/api/user/saved-payments/{}", payment_id);
        self.exchange(Method::Delete, &path, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKING_JSON: &str = r#"{
        "id": 42, "booking_ref": "BK12345678ABCD", "status": "confirmed", "user_id": 7,
        "flight_year": "2025", "flight_month": "8", "flight_day": "14",
        "source": "SEA", "destination": "DEN", "cost": "189", "takeoff": "0715",
        "landing": "1040", "duration": 145,
        "airline_code": "AS", "airline_name": "Alaska Airlines",
        "is_connecting": false, "total_cost": 378, "passenger_count": 2,
        "created_at": "2025-07-01T09:30:00.123456", "updated_at": "2025-07-01T09:30:00",
        "passengers": [
            {"id": 1, "first_name": "Ada", "last_name": "Lovelace", "date_of_birth": "1990-12-10",
             "passport_number": "", "email": "ada@example.com", "phone": "555", "seat_preference": "window"},
            {"id": 2, "first_name": "Alan", "last_name": "Turing", "date_of_birth": "1992-06-23",
             "passport_number": "", "email": "alan@example.com", "phone": "556", "seat_preference": "aisle"}
        ],
        "payment": {"id": 3, "card_number": "1111", "card_holder_name": "Ada Lovelace",
            "expiry_month": "12", "expiry_year": "2030", "billing_address": "1 Main St",
            "city": "Seattle", "state": "WA", "zip_code": "98101", "country": "US"}
    }"#;

    #[test]
    fn test_api_booking_converts() {
        let api: BookingApiResponse = serde_json::from_str(BOOKING_JSON).unwrap();
        let booking = Booking::try_from(api).unwrap();
        assert_eq!(booking.id, "42");
        assert_eq!(booking.user_id, "7");
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.passengers.len(), 2);
        assert_eq!(booking.payment.cvv, "");
        assert_eq!(booking.flight.airline().unwrap().name, "Alaska Airlines");
        assert_eq!(booking.created_at.format("%Y-%m-%d %H:%M").to_string(), "2025-07-01 09:30");
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut api: BookingApiResponse = serde_json::from_str(BOOKING_JSON).unwrap();
        api.status = "pending".into();
        assert!(Booking::try_from(api).is_err());
    }

    #[test]
    fn test_saved_details_defaults() {
        let passengers: Vec<SavedPassenger> = serde_json::from_str(
            r#"[{"id": 1, "first_name": "A", "last_name": "B", "date_of_birth": "2000-01-01",
                 "email": "a@b.c", "phone": "1", "is_primary": false},
                {"id": 2, "first_name": "C", "last_name": "D", "date_of_birth": "2000-01-01",
                 "email": "c@d.e", "phone": "2", "is_primary": true}]"#,
        )
        .unwrap();
        assert_eq!(primary_passenger(&passengers).unwrap().id, 2);
        assert_eq!(Passenger::from(&passengers[0]).first_name, "A");
        assert!(default_payment(&[]).is_none());
    }

    #[tokio::test]
    async fn test_no_credential_sends_nothing() {
        let config = DeskConfig::default().with_bookings_api_url("http://127.0.0.1:9");
        let client = BookingsApiClient::new(&config, Some("  ".into())).unwrap();
        assert!(!client.is_authenticated());
        let err = client.list().await.unwrap_err();
        assert!(err.requires_login());
    }
}
