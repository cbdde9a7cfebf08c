//! Slot engine - the single source of truth for the calendar

use chrono::{Days, NaiveDate, NaiveTime};
use dashmap::DashMap;
use slotkeeper_config::CalendarConfig;
use slotkeeper_util::{SlotkeeperError, format_date, today};
use tracing::{debug, info, warn};

use crate::{Booking, Occupancy, Slot, SlotKey};

/// Why a booking or cancellation was refused. Only ever logged; callers see
/// a plain `false`.
#[derive(Debug, thiserror::Error)]
enum Rejection {
    #[error("start time is blank")]
    BlankTime,

    #[error(transparent)]
    Malformed(#[from] SlotkeeperError),

    #[error("client name is empty")]
    EmptyClient,

    #[error("no such slot")]
    NoSuchSlot,

    #[error("slot already booked")]
    AlreadyBooked,

    #[error("slot is not booked")]
    NotBooked,

    #[error("slot is held by another client")]
    ClientMismatch,
}

/// Holds every slot of the rolling horizon and arbitrates bookings.
///
/// Booking and cancellation lock only the entry they touch, so two callers
/// racing for the same slot see exactly one success while callers working
/// on different slots never wait on each other.
pub struct SlotEngine {
    config: CalendarConfig,
    slots: DashMap<SlotKey, Slot>,
    first_day: Option<NaiveDate>,
}

impl SlotEngine {
    /// Create an empty engine. Call [`SlotEngine::initialize`] to build the grid.
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            config,
            slots: DashMap::with_capacity(config.total_slots()),
            first_day: None,
        }
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    /// First day of the current horizon, `None` before initialization
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.first_day
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn booked_count(&self) -> usize {
        self.slots.iter().filter(|entry| entry.is_booked()).count()
    }

    /// Rebuild the grid starting from the current date, discarding all bookings
    pub fn initialize(&mut self) {
        self.initialize_at(today());
    }

    /// Rebuild the grid starting from `first_day`, discarding all bookings
    pub fn initialize_at(&mut self, first_day: NaiveDate) {
        self.slots.clear();

        let opening = self.config.opening.to_naive_time();
        let duration = self.config.slot_duration();
        let per_day = self.config.slots_per_day();

        for offset in 0..self.config.horizon_days {
            let Some(date) = first_day.checked_add_days(Days::new(u64::from(offset))) else {
                warn!(first_day = %first_day, offset, "Horizon runs past the last representable date");
                break;
            };

            // slots_per_day already guarantees start + duration <= closing
            for index in 0..per_day {
                let start = opening + duration * index as i32;
                let key = SlotKey::new(date, start);
                self.slots.insert(key, Slot::free(key, start + duration));
            }
        }

        self.first_day = Some(first_day);

        info!(
            first_day = %first_day,
            days = self.config.horizon_days,
            slots = self.slots.len(),
            "Calendar initialized"
        );
    }

    /// Free slots on `date` ordered by distance from `desired`, at most `count`
    /// of them (at least one is always requested).
    pub fn find_closest(&self, date: NaiveDate, desired: NaiveTime, count: usize) -> Vec<Slot> {
        let count = count.max(1);

        let mut candidates: Vec<(i64, Slot)> = self
            .slots
            .iter()
            .filter(|entry| entry.key().date == date && !entry.is_booked())
            .map(|entry| (distance_minutes(entry.start(), desired), entry.value().clone()))
            .collect();

        candidates.sort_by_key(|(distance, _)| *distance);
        candidates.truncate(count);

        debug!(
            date = %date,
            desired = %desired,
            found = candidates.len(),
            "Closest free slots"
        );

        candidates.into_iter().map(|(_, slot)| slot).collect()
    }

    pub fn find_closest_today(&self, desired: NaiveTime, count: usize) -> Vec<Slot> {
        self.find_closest(today(), desired, count)
    }

    /// Book the slot at `date`/`start_time`. Returns `false` without touching
    /// anything if the input is malformed, the slot does not exist, the slot
    /// is taken, or the booking has no client.
    pub fn book(&self, date: &str, start_time: &str, booking: Booking) -> bool {
        self.book_slot(date, start_time, booking).is_some()
    }

    /// Same as [`SlotEngine::book`], but hands back the slot as it stood the
    /// moment the booking landed.
    pub fn book_slot(&self, date: &str, start_time: &str, booking: Booking) -> Option<Slot> {
        match self.try_book(date, start_time, booking) {
            Ok(slot) => {
                info!(date = %slot.date(), start = %slot.start(), client = %slot.client(), "Slot booked");
                Some(slot)
            }
            Err(reason) => {
                debug!(date, start_time, reason = %reason, "Booking rejected");
                None
            }
        }
    }

    pub fn book_today(&self, start_time: &str, booking: Booking) -> bool {
        self.book(&format_date(today()), start_time, booking)
    }

    fn try_book(&self, date: &str, start_time: &str, booking: Booking) -> Result<Slot, Rejection> {
        if start_time.trim().is_empty() {
            return Err(Rejection::BlankTime);
        }
        let key = SlotKey::parse(date, start_time)?;
        if booking.client.is_empty() {
            return Err(Rejection::EmptyClient);
        }

        let mut slot = self.slots.get_mut(&key).ok_or(Rejection::NoSuchSlot)?;
        if slot.is_booked() {
            return Err(Rejection::AlreadyBooked);
        }
        slot.occupancy = Occupancy::Booked(booking);

        Ok(slot.value().clone())
    }

    /// Release the slot at `date`/`start_time` if `client` holds it.
    /// The client comparison is exact.
    pub fn cancel(&self, date: &str, start_time: &str, client: &str) -> bool {
        match self.try_cancel(date, start_time, client) {
            Ok(key) => {
                info!(date = %key.date, start = %key.start, client, "Booking cancelled");
                true
            }
            Err(reason) => {
                debug!(date, start_time, client, reason = %reason, "Cancellation rejected");
                false
            }
        }
    }

    fn try_cancel(&self, date: &str, start_time: &str, client: &str) -> Result<SlotKey, Rejection> {
        let key = SlotKey::parse(date, start_time)?;

        let mut slot = self.slots.get_mut(&key).ok_or(Rejection::NoSuchSlot)?;
        match slot.booking() {
            None => return Err(Rejection::NotBooked),
            Some(booking) if booking.client != client => return Err(Rejection::ClientMismatch),
            Some(_) => {}
        }
        slot.occupancy = Occupancy::Free;

        Ok(key)
    }

    /// Look up a single slot
    pub fn slot(&self, date: NaiveDate, start: NaiveTime) -> Option<Slot> {
        self.get(&SlotKey::new(date, start))
    }

    pub fn get(&self, key: &SlotKey) -> Option<Slot> {
        self.slots.get(key).map(|entry| entry.value().clone())
    }

    /// Every slot, ordered by date then start time
    pub fn snapshot(&self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self.slots.iter().map(|entry| entry.value().clone()).collect();
        slots.sort_by_key(Slot::key);
        slots
    }
}

fn distance_minutes(start: NaiveTime, desired: NaiveTime) -> i64 {
    start.signed_duration_since(desired).num_minutes().abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotkeeper_util::WallClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: &str = "2025-03-14";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn engine() -> SlotEngine {
        let mut engine = SlotEngine::new(CalendarConfig::default());
        engine.initialize_at(day());
        engine
    }

    fn booking(client: &str) -> Booking {
        Booking::new(client, "Consultation", "Bob")
    }

    fn starts(slots: &[Slot]) -> Vec<NaiveTime> {
        slots.iter().map(Slot::start).collect()
    }

    #[test]
    fn test_grid_size() {
        let engine = engine();
        assert_eq!(engine.len(), 448);
        assert_eq!(engine.booked_count(), 0);
        assert_eq!(engine.first_day(), Some(day()));

        let snapshot = engine.snapshot();
        let first = snapshot.first().unwrap();
        let last = snapshot.last().unwrap();
        assert_eq!((first.date(), first.start()), (day(), hm(9, 0)));
        assert_eq!(last.date(), day() + Days::new(13));
        assert_eq!((last.start(), last.end()), (hm(16, 45), hm(17, 0)));
    }

    #[test]
    fn test_each_day_has_full_grid() {
        let engine = engine();
        for offset in 0..14 {
            let date = day() + Days::new(offset);
            let count = engine.snapshot().iter().filter(|s| s.date() == date).count();
            assert_eq!(count, 32, "day {date}");
        }
        assert!(engine.slot(day() + Days::new(14), hm(9, 0)).is_none());
    }

    #[test]
    fn test_custom_hours() {
        let config = CalendarConfig {
            opening: WallClock::new(10, 0).unwrap(),
            closing: WallClock::new(11, 50).unwrap(),
            slot_minutes: 30,
            horizon_days: 2,
        };
        let mut engine = SlotEngine::new(config);
        engine.initialize_at(day());

        // 10:00, 10:30, 11:00; 11:30 would end past closing
        assert_eq!(engine.len(), 6);
        assert!(engine.slot(day(), hm(11, 0)).is_some());
        assert!(engine.slot(day(), hm(11, 30)).is_none());
    }

    #[test]
    fn test_find_closest_between_slots() {
        let engine = engine();
        let found = engine.find_closest(day(), hm(9, 7), 2);
        let mut times = starts(&found);
        times.sort();
        assert_eq!(times, vec![hm(9, 0), hm(9, 15)]);
    }

    #[test]
    fn test_find_closest_near_closing() {
        let engine = engine();
        let found = engine.find_closest(day(), hm(16, 13), 2);
        assert_eq!(starts(&found), vec![hm(16, 15), hm(16, 0)]);
    }

    #[test]
    fn test_find_closest_outside_hours() {
        let engine = engine();
        assert_eq!(starts(&engine.find_closest(day(), hm(7, 30), 1)), vec![hm(9, 0)]);
        assert_eq!(starts(&engine.find_closest(day(), hm(20, 0), 1)), vec![hm(16, 45)]);
    }

    #[test]
    fn test_find_closest_count_coerced() {
        let engine = engine();
        assert_eq!(engine.find_closest(day(), hm(12, 0), 0).len(), 1);
        assert_eq!(engine.find_closest(day(), hm(12, 0), 100).len(), 32);
    }

    #[test]
    fn test_find_closest_orders_by_distance() {
        let engine = engine();
        let found = engine.find_closest(day(), hm(12, 0), 5);
        let distances: Vec<i64> = found
            .iter()
            .map(|s| distance_minutes(s.start(), hm(12, 0)))
            .collect();
        assert_eq!(distances[0], 0);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!(found.iter().all(|s| s.date() == day() && !s.is_booked()));
    }

    #[test]
    fn test_find_closest_skips_booked() {
        let engine = engine();
        assert!(engine.book(DAY, "12:00", booking("Alice")));

        let found = engine.find_closest(day(), hm(12, 0), 1);
        assert_ne!(found[0].start(), hm(12, 0));
        assert_eq!(distance_minutes(found[0].start(), hm(12, 0)), 15);
    }

    #[test]
    fn test_find_closest_outside_horizon_is_empty() {
        let engine = engine();
        assert!(engine.find_closest(day() - Days::new(1), hm(9, 0), 3).is_empty());
    }

    #[test]
    fn test_book_records_details() {
        let engine = engine();
        assert!(engine.book(DAY, "10:00", Booking::new("Alice", "Demo", "Bob")));

        let slot = engine.slot(day(), hm(10, 0)).unwrap();
        assert!(slot.is_booked());
        assert_eq!(slot.client(), "Alice");
        assert_eq!(slot.description(), "Demo");
        assert_eq!(slot.advisor(), "Bob");
        assert_eq!(engine.booked_count(), 1);
    }

    #[test]
    fn test_book_slot_returns_booked_slot() {
        let engine = engine();
        let slot = engine.book_slot(DAY, "10:00", Booking::new("Alice", "Demo", "Bob")).unwrap();
        assert_eq!((slot.date(), slot.start(), slot.end()), (day(), hm(10, 0), hm(10, 15)));
        assert!(slot.is_booked());
        assert_eq!(slot.client(), "Alice");
        assert_eq!(slot.description(), "Demo");
        assert_eq!(slot.advisor(), "Bob");

        assert!(engine.book_slot(DAY, "10:00", booking("Carol")).is_none());
        assert!(engine.book_slot(DAY, "10:05", booking("Carol")).is_none());
    }

    #[test]
    fn test_book_accepts_seconds() {
        let engine = engine();
        assert!(engine.book(DAY, "10:00:00", booking("Alice")));
        assert!(!engine.book(DAY, "10:00", booking("Carol")));
    }

    #[test]
    fn test_double_booking_rejected() {
        let engine = engine();
        assert!(engine.book(DAY, "10:00", booking("Alice")));
        assert!(!engine.book(DAY, "10:00", Booking::new("Carol", "Checkup", "Dave")));

        let slot = engine.slot(day(), hm(10, 0)).unwrap();
        assert_eq!(slot.client(), "Alice");
        assert_eq!(slot.description(), "Consultation");
        assert_eq!(slot.advisor(), "Bob");
    }

    #[test]
    fn test_same_time_other_day_independent() {
        let engine = engine();
        assert!(engine.book(DAY, "10:00", booking("Alice")));
        assert!(engine.book("2025-03-15", "10:00", booking("Carol")));
        assert_eq!(engine.booked_count(), 2);
    }

    #[test]
    fn test_book_rejects_bad_input() {
        let engine = engine();
        assert!(!engine.book(DAY, "", booking("Alice")));
        assert!(!engine.book(DAY, "   ", booking("Alice")));
        assert!(!engine.book(DAY, "25:00", booking("Alice")));
        assert!(!engine.book("9999-99-99", "10:00", booking("Alice")));
        assert!(!engine.book(DAY, "10:05", booking("Alice")));
        assert!(!engine.book(DAY, "08:00", booking("Alice")));
        assert!(!engine.book("2025-03-28", "10:00", booking("Alice")));
        assert!(!engine.book(DAY, "10:00", booking("")));
        assert!(!engine.book(DAY, " 9:00", booking("Alice")));
        assert!(!engine.book(DAY, "09: 0", booking("Alice")));
        assert!(!engine.book(DAY, "+9:00", booking("Alice")));
        assert!(!engine.book("2025- 3-14", "10:00", booking("Alice")));
        assert!(!engine.book("+025-03-14", "10:00", booking("Alice")));
        assert_eq!(engine.booked_count(), 0);
    }

    #[test]
    fn test_cancel_by_owner() {
        let engine = engine();
        assert!(engine.book(DAY, "10:00", booking("Alice")));
        assert!(engine.cancel(DAY, "10:00", "Alice"));

        let slot = engine.slot(day(), hm(10, 0)).unwrap();
        assert!(!slot.is_booked());
        assert_eq!(slot.client(), "");
        assert_eq!(slot.description(), "");
        assert_eq!(slot.advisor(), "");

        // Back in the search results
        assert_eq!(starts(&engine.find_closest(day(), hm(10, 0), 1)), vec![hm(10, 0)]);

        // Free again, so bookable again
        assert!(engine.book(DAY, "10:00", booking("Carol")));
    }

    #[test]
    fn test_cancel_by_stranger_rejected() {
        let engine = engine();
        assert!(engine.book(DAY, "10:00", booking("Alice")));
        assert!(!engine.cancel(DAY, "10:00", "Mallory"));
        assert!(!engine.cancel(DAY, "10:00", "alice"));
        assert!(!engine.cancel(DAY, "10:00", "Alice "));
        assert_eq!(engine.slot(day(), hm(10, 0)).unwrap().client(), "Alice");
    }

    #[test]
    fn test_cancel_rejects_free_and_missing() {
        let engine = engine();
        assert!(!engine.cancel(DAY, "10:00", "Alice"));
        assert!(!engine.cancel(DAY, "10:05", "Alice"));
        assert!(!engine.cancel("garbage", "10:00", "Alice"));
        assert!(!engine.cancel(DAY, "", "Alice"));
    }

    #[test]
    fn test_cancel_rejects_padded_time() {
        let engine = engine();
        assert!(engine.book(DAY, "09:00", booking("Alice")));
        assert!(!engine.cancel(DAY, " 9:00", "Alice"));
        assert!(!engine.cancel(DAY, "09: 0", "Alice"));
        assert!(engine.slot(day(), hm(9, 0)).unwrap().is_booked());
    }

    #[test]
    fn test_reinitialize_discards_bookings() {
        let mut engine = engine();
        assert!(engine.book(DAY, "10:00", booking("Alice")));

        engine.initialize_at(day());
        assert_eq!(engine.len(), 448);
        assert_eq!(engine.booked_count(), 0);
    }

    #[test]
    fn test_today_helpers() {
        let mut engine = SlotEngine::new(CalendarConfig::default());
        engine.initialize();

        let found = engine.find_closest_today(hm(9, 0), 1);
        assert_eq!(starts(&found), vec![hm(9, 0)]);
        assert!(engine.book_today("09:00", booking("Alice")));
        assert!(!engine.book_today("09:00", booking("Carol")));
    }

    #[test]
    fn test_concurrent_booking_single_winner() {
        let engine = engine();
        let wins = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for i in 0..16 {
                let engine = &engine;
                let wins = &wins;
                scope.spawn(move || {
                    if engine.book(DAY, "10:00", booking(&format!("client-{i}"))) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(engine.booked_count(), 1);
    }

    #[test]
    fn test_concurrent_book_cancel_stays_consistent() {
        let engine = engine();
        let net = std::sync::atomic::AtomicIsize::new(0);

        std::thread::scope(|scope| {
            for name in ["Alice", "Carol", "Dave", "Erin"] {
                let engine = &engine;
                let net = &net;
                scope.spawn(move || {
                    for _ in 0..200 {
                        if engine.book(DAY, "11:00", booking(name)) {
                            net.fetch_add(1, Ordering::SeqCst);
                        }
                        if engine.cancel(DAY, "11:00", name) {
                            net.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        let slot = engine.slot(day(), hm(11, 0)).unwrap();
        let expected = if slot.is_booked() { 1 } else { 0 };
        assert_eq!(net.load(Ordering::SeqCst), expected);
        assert_eq!(slot.is_booked(), !slot.client().is_empty());
    }
}
