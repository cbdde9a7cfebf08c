//! Slot model and occupancy state

use chrono::{NaiveDate, NaiveTime};
use slotkeeper_api::SlotView;
use slotkeeper_util::{parse_date, parse_time_of_day};

/// Unique key of a slot: the date and the start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub start: NaiveTime,
}

impl SlotKey {
    pub fn new(date: NaiveDate, start: NaiveTime) -> Self {
        Self { date, start }
    }

    /// Parse a `YYYY-MM-DD` date and an `HH:MM[:SS]` time independently
    pub fn parse(date: &str, start: &str) -> slotkeeper_util::Result<Self> {
        Ok(Self {
            date: parse_date(date)?,
            start: parse_time_of_day(start)?,
        })
    }
}

/// Who holds a slot and why
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Booking {
    pub client: String,
    pub description: String,
    pub advisor: String,
}

impl Booking {
    pub fn new(
        client: impl Into<String>,
        description: impl Into<String>,
        advisor: impl Into<String>,
    ) -> Self {
        Self {
            client: client.into(),
            description: description.into(),
            advisor: advisor.into(),
        }
    }
}

/// Occupancy of a slot. A slot is booked exactly when it carries a booking.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Occupancy {
    #[default]
    Free,
    Booked(Booking),
}

/// One bookable interval on a specific date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    key: SlotKey,
    end: NaiveTime,
    pub(crate) occupancy: Occupancy,
}

impl Slot {
    pub(crate) fn free(key: SlotKey, end: NaiveTime) -> Self {
        Self {
            key,
            end,
            occupancy: Occupancy::Free,
        }
    }

    pub fn key(&self) -> SlotKey {
        self.key
    }

    pub fn date(&self) -> NaiveDate {
        self.key.date
    }

    pub fn start(&self) -> NaiveTime {
        self.key.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn booking(&self) -> Option<&Booking> {
        match &self.occupancy {
            Occupancy::Free => None,
            Occupancy::Booked(booking) => Some(booking),
        }
    }

    pub fn is_booked(&self) -> bool {
        matches!(self.occupancy, Occupancy::Booked(_))
    }

    /// Client name, empty when free
    pub fn client(&self) -> &str {
        self.booking().map(|b| b.client.as_str()).unwrap_or("")
    }

    pub fn description(&self) -> &str {
        self.booking().map(|b| b.description.as_str()).unwrap_or("")
    }

    pub fn advisor(&self) -> &str {
        self.booking().map(|b| b.advisor.as_str()).unwrap_or("")
    }

    /// Convert to the wire summary
    pub fn to_view(&self) -> SlotView {
        SlotView {
            date: self.date(),
            start_time: self.start(),
            end_time: self.end,
            booked: self.is_booked(),
            client: self.client().to_string(),
            description: self.description().to_string(),
            advisor: self.advisor().to_string(),
        }
    }
}
