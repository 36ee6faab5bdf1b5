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

//! # Local Booking Store
//!
//! Advisory JSON mirror of bookings, used when the bookings service is not
//! available. Every query is scoped to one user. No durability promise: an
//! unreadable file is treated as empty.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::bookings::{Booking, BookingStatus};
use crate::error::DeskError;

#[derive(Debug, Clone, Default)]
pub struct LocalBookingStore {
    path: Option<PathBuf>,
    bookings: Vec<Booking>,
}

impl LocalBookingStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the mirror at `path`; a missing or corrupt file yields an empty
    /// store that will overwrite it on the next change.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let bookings = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<Booking>>(&text) {
                Ok(bookings) => bookings,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable booking mirror {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Cannot read booking mirror {}: {}", path.display(), e);
                Vec::new()
            }
        };
        tracing::debug!("Loaded {} booking(s) from {}", bookings.len(), path.display());
        Self {
            path: Some(path),
            bookings,
        }
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.bookings).context("Failed to encode bookings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write booking mirror {}", path.display()))
    }

    pub fn user_bookings(&self, user_id: &str) -> Vec<&Booking> {
        self.bookings.iter().filter(|b| b.user_id == user_id).collect()
    }

    pub fn find(&self, user_id: &str, booking_id: &str) -> Option<&Booking> {
        self.bookings
            .iter()
            .find(|b| b.user_id == user_id && (b.id == booking_id || b.booking_ref == booking_id))
    }

    pub fn add(&mut self, booking: Booking) -> Result<()> {
        tracing::info!("Mirroring booking {} locally", booking.booking_ref);
        self.bookings.push(booking);
        if let Err(e) = self.save() {
            self.bookings.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Change the status of one of `user_id`'s bookings, by id or reference.
    pub fn update_status(
        &mut self,
        user_id: &str,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking> {
        let idx = self
            .bookings
            .iter()
            .position(|b| b.user_id == user_id && (b.id == booking_id || b.booking_ref == booking_id))
            .ok_or_else(|| DeskError::NotFound(format!("booking {}", booking_id)))?;
        let updated = self.bookings[idx].clone().with_status(status)?;

        // Rolled back when the write fails so memory matches the file.
        let previous = std::mem::replace(&mut self.bookings[idx], updated.clone());
        if let Err(e) = self.save() {
            self.bookings[idx] = previous;
            return Err(e);
        }
        Ok(updated)
    }

    /// Returns whether a booking was removed.
    pub fn delete(&mut self, user_id: &str, booking_id: &str) -> Result<bool> {
        let before = self.bookings.clone();
        self.bookings
            .retain(|b| !(b.user_id == user_id && (b.id == booking_id || b.booking_ref == booking_id)));
        let removed = self.bookings.len() != before.len();
        if removed {
            if let Err(e) = self.save() {
                self.bookings = before;
                return Err(e);
            }
        }
        Ok(removed)
    }

    pub fn by_status(&self, user_id: &str, status: BookingStatus) -> Vec<&Booking> {
        self.user_bookings(user_id)
            .into_iter()
            .filter(|b| b.status == status)
            .collect()
    }

    pub fn upcoming(&self, user_id: &str, today: NaiveDate) -> Vec<&Booking> {
        self.user_bookings(user_id)
            .into_iter()
            .filter(|b| b.is_upcoming(today))
            .collect()
    }

    pub fn completed(&self, user_id: &str, today: NaiveDate) -> Vec<&Booking> {
        self.user_bookings(user_id)
            .into_iter()
            .filter(|b| b.is_completed(today))
            .collect()
    }
}
