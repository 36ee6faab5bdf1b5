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

//! # Flight Records
//!
//! JSON shape of flight records as exchanged with the flight search service,
//! and the conversions to and from the typed [`Flight`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::flight_model::{
    AirlineInfo, ClockTime, Connection, Fare, Flight, Routing, Segment, TravelDate,
};

pub use crate::flight_model::RecordError;

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub source: String,
    pub destination: String,
    #[serde(deserialize_with = "string_or_number")]
    pub takeoff: String,
    #[serde(deserialize_with = "string_or_number")]
    pub landing: String,
    pub duration: u32,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(deserialize_with = "string_or_number")]
    pub month: String,
    #[serde(deserialize_with = "string_or_number")]
    pub day: String,
    pub source: String,
    pub destination: String,
    #[serde(deserialize_with = "string_or_number")]
    pub cost: String,
    #[serde(deserialize_with = "string_or_number")]
    pub takeoff: String,
    #[serde(deserialize_with = "string_or_number")]
    pub landing: String,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<AirlineInfo>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_connecting: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_airport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layover_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentRecord>,
}

impl TryFrom<SegmentRecord> for Segment {
    type Error = RecordError;

    fn try_from(r: SegmentRecord) -> Result<Self, Self::Error> {
        Ok(Segment {
            takeoff: ClockTime::parse(&r.takeoff)?,
            landing: ClockTime::parse(&r.landing)?,
            source: r.source,
            destination: r.destination,
            duration: r.duration,
            cost: r.cost.map(Fare::new),
        })
    }
}

impl From<&Segment> for SegmentRecord {
    fn from(s: &Segment) -> Self {
        SegmentRecord {
            source: s.source.clone(),
            destination: s.destination.clone(),
            takeoff: s.takeoff.to_string(),
            landing: s.landing.to_string(),
            duration: s.duration,
            cost: s.cost.as_ref().map(|c| c.raw().to_string()),
        }
    }
}

impl TryFrom<FlightRecord> for Flight {
    type Error = RecordError;

    fn try_from(r: FlightRecord) -> Result<Self, Self::Error> {
        let mut flight = Flight::direct(
            TravelDate::new(r.year, r.month, r.day),
            r.source,
            r.destination,
            ClockTime::parse(&r.takeoff)?,
            ClockTime::parse(&r.landing)?,
            r.duration,
            Fare::new(r.cost),
        )?;
        if let Some(airline) = r.airline {
            flight = flight.with_airline(airline);
        }

        if !r.is_connecting {
            if !r.segments.is_empty() {
                tracing::debug!(
                    "Ignoring {} segment(s) on direct flight {}→{}",
                    r.segments.len(),
                    flight.source(),
                    flight.destination()
                );
            }
            return Ok(flight);
        }

        let segments = r
            .segments
            .into_iter()
            .map(Segment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Err(RecordError::EmptySegments);
        }

        // Older payloads omit the connection summary; derive it from the legs.
        let connection_airport = r
            .connection_airport
            .unwrap_or_else(|| segments[0].destination.clone());
        let layover_hours = r.layover_hours.unwrap_or_else(|| match segments.as_slice() {
            [first, second, ..] => {
                let minutes = first.landing.minutes_until(second.takeoff);
                (f64::from(minutes) / 60.0 * 10.0).round() / 10.0
            }
            _ => 0.0,
        });

        flight.with_connection(Connection::new(connection_airport, layover_hours, segments)?)
    }
}

impl From<&Flight> for FlightRecord {
    fn from(f: &Flight) -> Self {
        let (is_connecting, connection_airport, layover_hours, segments) = match f.routing() {
            Routing::Direct => (false, None, None, Vec::new()),
            Routing::Connecting(c) => (
                true,
                Some(c.connection_airport().to_string()),
                Some(c.layover_hours()),
                c.segments().iter().map(SegmentRecord::from).collect(),
            ),
        };

        FlightRecord {
            year: f.date().year.clone(),
            month: f.date().month.clone(),
            day: f.date().day.clone(),
            source: f.source().to_string(),
            destination: f.destination().to_string(),
            cost: f.cost().raw().to_string(),
            takeoff: f.takeoff().to_string(),
            landing: f.landing().to_string(),
            duration: f.duration(),
            airline: f.airline().cloned(),
            is_connecting,
            connection_airport,
            layover_hours,
            segments,
        }
    }
}

impl From<Flight> for FlightRecord {
    fn from(f: Flight) -> Self {
        FlightRecord::from(&f)
    }
}

/// Convert wire records, dropping the ones that violate model invariants.
pub fn records_to_flights(records: Vec<FlightRecord>) -> Vec<Flight> {
    let total = records.len();
    let flights: Vec<Flight> = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let route = format!("{}→{}", record.source, record.destination);
            match Flight::try_from(record) {
                Ok(flight) => Some(flight),
                Err(e) => {
                    tracing::warn!("Skipping flight record #{} ({}): {}", idx, route, e);
                    None
                }
            }
        })
        .collect();

    if flights.len() < total {
        tracing::debug!("Kept {}/{} flight records", flights.len(), total);
    }
    flights
}

/// Parse a JSON array of flight records; malformed entries are skipped.
///
/// Only a payload that is not a JSON array at all is an error.
pub fn parse_flight_records(json: &str) -> Result<Vec<Flight>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let records = values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<FlightRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed flight record #{}: {}", idx, e);
                None
            }
        })
        .collect();
    Ok(records_to_flights(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_date_parts_accepted() {
        let json = r#"{"year": 2025, "month": 7, "day": "4", "source": "SFO",
            "destination": "JFK", "cost": 320, "takeoff": 930, "landing": "1800",
            "duration": 330}"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.year, "2025");
        assert_eq!(record.cost, "320");

        let flight = Flight::try_from(record).unwrap();
        assert_eq!(flight.takeoff().to_string(), "0930");
        assert_eq!(flight.cost().amount(), Some(320));
        assert!(!flight.is_connecting());
    }

    #[test]
    fn test_connecting_record_derives_missing_summary() {
        let json = r#"{"year": "2025", "month": "7", "day": "4", "source": "SFO",
            "destination": "JFK", "cost": "500", "takeoff": "0800", "landing": "1900",
            "duration": 540, "is_connecting": true, "segments": [
              {"source": "SFO", "destination": "ORD", "takeoff": "0800", "landing": "1000", "duration": 240},
              {"source": "ORD", "destination": "JFK", "takeoff": "1130", "landing": "1900", "duration": 210}
            ]}"#;
        let flight: Flight = serde_json::from_str(json).unwrap();
        let connection = flight.connection().unwrap();
        assert_eq!(connection.connection_airport(), "ORD");
        assert_eq!(connection.layover_hours(), 1.5);
    }

    #[test]
    fn test_connecting_without_segments_rejected() {
        let json = r#"{"year": "2025", "month": "7", "day": "4", "source": "SFO",
            "destination": "JFK", "cost": "500", "takeoff": "0800", "landing": "1900",
            "duration": 540, "is_connecting": true}"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(Flight::try_from(record), Err(RecordError::EmptySegments));
    }

    #[test]
    fn test_parse_skips_bad_records() {
        let json = r#"[
            {"year": "2025", "month": "1", "day": "2", "source": "LAX", "destination": "SEA",
             "cost": "150", "takeoff": "0700", "landing": "0930", "duration": 150},
            {"year": "2025", "month": "1", "day": "2", "source": "LAX", "destination": "LAX",
             "cost": "150", "takeoff": "0700", "landing": "0930", "duration": 150},
            {"year": "2025", "month": "1", "day": "2", "source": "LAX"},
            {"year": "2025", "month": "1", "day": "2", "source": "LAX", "destination": "SEA",
             "cost": "150", "takeoff": "2500", "landing": "0930", "duration": 150}
        ]"#;
        let flights = parse_flight_records(json).unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].destination(), "SEA");

        assert!(parse_flight_records("{}").is_err());
    }

    #[test]
    fn test_direct_record_serialization_omits_connection_fields() {
        let json = r#"{"year":"2025","month":"1","day":"2","source":"LAX","destination":"SEA",
            "cost":"150","takeoff":"0700","landing":"0930","duration":150}"#;
        let flight: Flight = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&flight).unwrap();
        assert!(value.get("is_connecting").is_none());
        assert!(value.get("segments").is_none());
        assert_eq!(value["takeoff"], "0700");
    }
}
