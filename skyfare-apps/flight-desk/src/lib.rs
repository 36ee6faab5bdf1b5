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

// Library for skyfare-flight-desk
// Flight search, filtering, ranking, comparison and booking assembly

pub mod airports;
mod bookings;
mod bookings_api;
mod bookings_store;
mod comparison;
mod config;
mod error;
mod flight_model;
pub mod flight_records;
mod flights_catalog;
mod flights_filter;
mod flights_query_builder;
mod flights_ranking;
mod flights_search;
#[cfg(feature = "mcp")]
pub mod mcp_schema;
mod session;
mod validation;

pub use error::DeskError;

pub use flight_model::{
    AirlineInfo, ClockTime, ComparisonKey, Connection, Fare, Flight, RecordError, Routing, Segment,
    TravelDate, fmt_duration, parse_int_prefix,
};
pub use flight_records::{FlightRecord, SegmentRecord, parse_flight_records};

pub use flights_query_builder::{FlightSearchRequest, Priority, SearchCriteria, SearchCriteriaBuilder};

// Re-export search clients and the offline catalog
pub use flights_catalog::{CatalogStats, ConnectionRules, FlightCatalog};
pub use flights_search::{
    AirportMatch, FlightBackend, FlightSource, FlightsApiClient, HealthStatus, RouteCompetition,
};

pub use comparison::{
    ComparisonSet, ComparisonView, HandoffError, MAX_COMPARED_FLIGHTS, MIN_COMPARED_FLIGHTS, Notice,
    ToggleOutcome,
};
pub use flights_filter::{Bounds, FilterCriteria, FilterFacets, filter_flights};
pub use flights_ranking::{Ranker, RankingWeights, best_value, fastest, rank};

pub use bookings::{
    Booking, BookingStatus, Passenger, PaymentInfo, create_booking, generate_booking_id,
    generate_booking_ref,
};
pub use bookings_api::{
    ApiPassenger, ApiPayment, BookingApiResponse, BookingListResponse, BookingsApiClient,
    CreateBookingRequest, SavedPassenger, SavedPassengerRequest, SavedPayment, SavedPaymentRequest,
    default_payment, primary_passenger,
};
pub use bookings_store::LocalBookingStore;
pub use validation::{missing_passenger_fields, missing_payment_fields, validate_booking_form};

pub use config::{DEFAULT_BOOKINGS_API_URL, DEFAULT_SEARCH_API_URL, DeskConfig};
pub use session::SearchSession;

pub use skyfare_search_queue::{SearchQueue, SearchSequencer, SearchTicket};
