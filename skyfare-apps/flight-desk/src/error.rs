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

//! # Error taxonomy
//!
//! Errors are recovered where they are detected: validation blocks a form,
//! transport failures leave in-memory state untouched so the user can retry,
//! missing credentials redirect to login. The filter, ranking and comparison
//! modules never produce errors.

use thiserror::Error;

use crate::bookings::BookingStatus;

#[derive(Debug, Error)]
pub enum DeskError {
    /// Missing or malformed user input; every missing field is listed.
    #[error("missing or invalid fields: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    /// A collaborator could not be reached or answered with a failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The action needs a valid credential.
    #[error("authentication required")]
    AuthRequired,

    /// The referenced booking, flight or profile no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// Booking assembly was called with inputs the caller should have rejected.
    #[error("invalid booking input: {0}")]
    InvalidBookingInput(String),

    #[error("booking cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl DeskError {
    pub fn validation(missing: Vec<String>) -> Self {
        Self::Validation { missing }
    }

    /// Whether the user can retry the same action without re-entering data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the caller should send the user to the login flow.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

impl From<skyfare_search_queue::SearchQueueError> for DeskError {
    fn from(err: skyfare_search_queue::SearchQueueError) -> Self {
        match err {
            skyfare_search_queue::SearchQueueError::Failed { source, .. } => {
                // Server errors are raised as DeskError inside the queued
                // closure and travel through anyhow untouched.
                match source.downcast::<DeskError>() {
                    Ok(desk) => desk,
                    Err(other) => Self::Transport(format!("{:#}", other)),
                }
            }
            other => Self::Transport(other.to_string()),
        }
    }
}
