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

//! # Flight Model
//!
//! Typed flight itineraries. String-encoded wire values (cost, "HHMM" times)
//! are parsed once when a record enters the system; the wire format only
//! reappears at the serialization edge (see `flight_records`).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flight_records::FlightRecord;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Why a record could not become a [`Flight`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("source and destination are both {0}")]
    SameEndpoints(String),
    #[error("invalid HHMM time: '{0}'")]
    InvalidTime(String),
    #[error("connecting itinerary has no segments")]
    EmptySegments,
    #[error("segments run {found} but the itinerary runs {expected}")]
    SegmentEndpointMismatch { expected: String, found: String },
}

/// `parseInt`-style integer prefix: optional sign then leading digits,
/// anything after the digits is ignored. `None` when there are no digits.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(b - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// A price as sent by the flight service, with its integer value.
///
/// `amount` is `None` when the text has no integer prefix; such fares fail
/// every price filter and rank after all priced flights.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Fare {
    raw: String,
    amount: Option<i64>,
}

impl Fare {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let amount = parse_int_prefix(&raw);
        Self { raw, amount }
    }

    pub fn from_amount(amount: i64) -> Self {
        Self {
            raw: amount.to_string(),
            amount: Some(amount),
        }
    }

    pub fn amount(&self) -> Option<i64> {
        self.amount
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl From<String> for Fare {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<Fare> for String {
    fn from(fare: Fare) -> Self {
        fare.raw
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.amount {
            Some(amount) => write!(f, "${}", amount),
            None => write!(f, "{}", self.raw),
        }
    }
}

/// Wall-clock time without timezone, stored as minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self(hour * 60 + minute))
    }

    /// Parse "HHMM". Shorter inputs are left-padded with zeros ("930" is
    /// 09:30); a single ':' separator is tolerated.
    pub fn parse(s: &str) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidTime(s.to_string());
        let digits: String = s.trim().chars().filter(|c| *c != ':').collect();
        if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let padded = format!("{:0>4}", digits);
        let hour: u16 = padded[..2].parse().map_err(|_| invalid())?;
        let minute: u16 = padded[2..].parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }

    pub fn minutes_after_midnight(&self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// Minutes from `self` until the next occurrence of `later`, wrapping
    /// past midnight.
    pub fn minutes_until(&self, later: ClockTime) -> u32 {
        let from = self.minutes_after_midnight();
        let to = later.minutes_after_midnight();
        if to < from {
            MINUTES_PER_DAY - from + to
        } else {
            to - from
        }
    }

    /// "HH:MM"
    pub fn display_colon(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = RecordError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> Self {
        t.to_string()
    }
}

/// Calendar date as the service sends it: three loosely formatted strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl TravelDate {
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self::new(
            date.year().to_string(),
            date.month().to_string(),
            date.day().to_string(),
        )
    }

    /// Best-effort conversion; `None` for unparsable or impossible dates.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        let year = parse_int_prefix(&self.year)?;
        let month = parse_int_prefix(&self.month)?;
        let day = parse_int_prefix(&self.day)?;
        NaiveDate::from_ymd_opt(
            i32::try_from(year).ok()?,
            u32::try_from(month).ok()?,
            u32::try_from(day).ok()?,
        )
    }

    /// Normalized "YYYY-MM-DD" key, used for indexing.
    pub fn key(&self) -> Option<String> {
        self.to_naive_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl fmt::Display for TravelDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive_date() {
            Some(d) => write!(f, "{}", d.format("%a, %b %-d, %Y")),
            None => write!(f, "{}/{}/{}", self.month, self.day, self.year),
        }
    }
}

/// Airline reference data attached to a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineInfo {
    pub code: String,
    pub name: String,
    #[serde(rename = "logo", default)]
    pub logo_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
}

/// One non-stop leg of a connecting itinerary.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source: String,
    pub destination: String,
    pub takeoff: ClockTime,
    pub landing: ClockTime,
    pub duration: u32,
    pub cost: Option<Fare>,
}

/// Connection details; the segment list is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    connection_airport: String,
    layover_hours: f64,
    segments: Vec<Segment>,
}

impl Connection {
    pub fn new(
        connection_airport: impl Into<String>,
        layover_hours: f64,
        segments: Vec<Segment>,
    ) -> Result<Self, RecordError> {
        if segments.is_empty() {
            return Err(RecordError::EmptySegments);
        }
        Ok(Self {
            connection_airport: connection_airport.into(),
            layover_hours,
            segments,
        })
    }

    pub fn connection_airport(&self) -> &str {
        &self.connection_airport
    }

    pub fn layover_hours(&self) -> f64 {
        self.layover_hours
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Routing {
    Direct,
    Connecting(Connection),
}

/// Identity used by the comparison set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    pub source: String,
    pub destination: String,
    pub takeoff: ClockTime,
    pub cost: Fare,
}

/// One priced, dated itinerary from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FlightRecord", into = "FlightRecord")]
pub struct Flight {
    date: TravelDate,
    source: String,
    destination: String,
    takeoff: ClockTime,
    landing: ClockTime,
    duration: u32,
    cost: Fare,
    airline: Option<AirlineInfo>,
    routing: Routing,
}

impl Flight {
    pub fn direct(
        date: TravelDate,
        source: impl Into<String>,
        destination: impl Into<String>,
        takeoff: ClockTime,
        landing: ClockTime,
        duration: u32,
        cost: Fare,
    ) -> Result<Self, RecordError> {
        let source = source.into();
        let destination = destination.into();
        if source == destination {
            return Err(RecordError::SameEndpoints(source));
        }
        Ok(Self {
            date,
            source,
            destination,
            takeoff,
            landing,
            duration,
            cost,
            airline: None,
            routing: Routing::Direct,
        })
    }

    /// Turn a direct itinerary into a connecting one; the connection's
    /// segments must start at this flight's source and end at its destination.
    pub fn with_connection(mut self, connection: Connection) -> Result<Self, RecordError> {
        let segments = connection.segments();
        let first = &segments[0];
        let last = &segments[segments.len() - 1];
        if first.source != self.source || last.destination != self.destination {
            return Err(RecordError::SegmentEndpointMismatch {
                expected: format!("{}→{}", self.source, self.destination),
                found: format!("{}→{}", first.source, last.destination),
            });
        }
        self.routing = Routing::Connecting(connection);
        Ok(self)
    }

    pub fn with_airline(mut self, airline: AirlineInfo) -> Self {
        self.airline = Some(airline);
        self
    }

    pub fn date(&self) -> &TravelDate {
        &self.date
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn takeoff(&self) -> ClockTime {
        self.takeoff
    }

    pub fn landing(&self) -> ClockTime {
        self.landing
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn cost(&self) -> &Fare {
        &self.cost
    }

    pub fn airline(&self) -> Option<&AirlineInfo> {
        self.airline.as_ref()
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.routing, Routing::Connecting(_))
    }

    pub fn connection(&self) -> Option<&Connection> {
        match &self.routing {
            Routing::Direct => None,
            Routing::Connecting(c) => Some(c),
        }
    }

    /// Empty for direct flights.
    pub fn segments(&self) -> &[Segment] {
        self.connection().map(|c| c.segments()).unwrap_or(&[])
    }

    pub fn stops(&self) -> usize {
        self.segments().len().saturating_sub(1)
    }

    pub fn key(&self) -> ComparisonKey {
        ComparisonKey {
            source: self.source.clone(),
            destination: self.destination.clone(),
            takeoff: self.takeoff,
            cost: self.cost.clone(),
        }
    }

    /// Comparison-set identity: same route, takeoff and cost.
    pub fn same_offer(&self, other: &Flight) -> bool {
        self.source == other.source
            && self.destination == other.destination
            && self.takeoff == other.takeoff
            && self.cost == other.cost
    }
}

/// Format minutes as "5h 30m".
pub fn fmt_duration(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        ClockTime::parse(s).unwrap()
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("500"), Some(500));
        assert_eq!(parse_int_prefix("  250.99"), Some(250));
        assert_eq!(parse_int_prefix("-12abc"), Some(-12));
        assert_eq!(parse_int_prefix("$300"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("abc"), None);
    }

    #[test]
    fn test_clock_time_parsing() {
        assert_eq!(t("0930").minutes_after_midnight(), 570);
        assert_eq!(t("930"), t("0930"));
        assert_eq!(t("5"), ClockTime::from_hm(0, 5).unwrap());
        assert_eq!(t("23:59").to_string(), "2359");
        assert!(ClockTime::parse("2400").is_err());
        assert!(ClockTime::parse("1260").is_err());
        assert!(ClockTime::parse("12345").is_err());
        assert!(ClockTime::parse("ab").is_err());
    }

    #[test]
    fn test_minutes_until_wraps_midnight() {
        assert_eq!(t("1000").minutes_until(t("1230")), 150);
        assert_eq!(t("2300").minutes_until(t("0100")), 120);
        assert_eq!(t("0800").minutes_until(t("0800")), 0);
    }

    #[test]
    fn test_travel_date() {
        let date = TravelDate::new("2025", "7", "4");
        assert_eq!(date.key().as_deref(), Some("2025-07-04"));
        assert!(TravelDate::new("2025", "2", "30").to_naive_date().is_none());
        assert_eq!(TravelDate::new("x", "2", "30").to_string(), "2/30/x");
    }

    #[test]
    fn test_direct_rejects_same_endpoints() {
        let err = Flight::direct(
            TravelDate::new("2025", "1", "1"),
            "SFO",
            "SFO",
            t("0800"),
            t("1000"),
            120,
            Fare::from_amount(100),
        )
        .unwrap_err();
        assert_eq!(err, RecordError::SameEndpoints("SFO".into()));
    }

    #[test]
    fn test_connection_endpoints_checked() {
        let flight = Flight::direct(
            TravelDate::new("2025", "1", "1"),
            "SFO",
            "JFK",
            t("0800"),
            t("1900"),
            540,
            Fare::from_amount(400),
        )
        .unwrap();

        let leg = |s: &str, d: &str| Segment {
            source: s.into(),
            destination: d.into(),
            takeoff: t("0800"),
            landing: t("1000"),
            duration: 120,
            cost: None,
        };

        let bad = Connection::new("ORD", 1.5, vec![leg("LAX", "ORD"), leg("ORD", "JFK")]).unwrap();
        assert!(flight.clone().with_connection(bad).is_err());

        let good = Connection::new("ORD", 1.5, vec![leg("SFO", "ORD"), leg("ORD", "JFK")]).unwrap();
        let connecting = flight.with_connection(good).unwrap();
        assert!(connecting.is_connecting());
        assert_eq!(connecting.stops(), 1);
        assert_eq!(connecting.segments().len(), 2);

        assert_eq!(Connection::new("ORD", 1.0, vec![]), Err(RecordError::EmptySegments));
    }

    #[test]
    fn test_fare_display() {
        assert_eq!(Fare::new("450").to_string(), "$450");
        assert_eq!(Fare::new("n/a").to_string(), "n/a");
    }
}
