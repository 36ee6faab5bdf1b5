//! Skyfare Search Queue
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! Latest-wins sequencing of search requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::SearchQueueError;

/// Sequence number handed out when a search is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

impl SearchTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tickets; only the most recently issued
/// ticket may deliver results.
///
/// Clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct SearchSequencer {
    latest: Arc<AtomicU64>,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new search. Tickets start at 1.
    pub fn issue(&self) -> SearchTicket {
        SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Sequence number of the last issued ticket, 0 if none.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.0 == self.latest()
    }

    /// Pass `value` through if `ticket` is still the latest search.
    pub fn accept<T>(&self, ticket: SearchTicket, value: T) -> Result<T, SearchQueueError> {
        let latest = self.latest();
        if ticket.0 == latest {
            Ok(value)
        } else {
            Err(SearchQueueError::Superseded {
                ticket: ticket.0,
                latest,
            })
        }
    }
}
