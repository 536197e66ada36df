//! The three-day price window and its reconciliation rules

use chrono::Timelike;
use log::{debug, info, warn};

use super::{DayBucket, Slot, SlotSet};
use crate::time::{CalendarDay, Timestamp, normalize_to_calendar_day};

/// Local hour from which the provider publishes the next day's prices
pub const PUBLICATION_HOUR: u32 = 13;

/// Outcome of [`PriceWindow::reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Whether any bucket is due for fetching this cycle
    pub needs_fetch: bool,
    /// Every slot left without prices
    pub missing: SlotSet,
    tomorrow_published: bool,
}

impl ReconcileResult {
    /// Slots to fetch this cycle
    ///
    /// A missing tomorrow is only due once the provider has published it.
    pub fn due(&self) -> SlotSet {
        let mut due = self.missing;
        if !self.tomorrow_published {
            due.remove(Slot::Tomorrow);
        }
        due
    }
}

/// Cached prices for yesterday, today and tomorrow
///
/// Owned by the caller and passed into each wake cycle. Only
/// [`reconcile`](Self::reconcile) and [`merge_fetched`](Self::merge_fetched)
/// change it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceWindow {
    buckets: [DayBucket; 3],
    last_update: Timestamp,
}

impl PriceWindow {
    /// A window with no prices, labelled relative to `now`
    pub fn cold_start(now: Timestamp) -> Self {
        Self {
            buckets: empty_buckets(normalize_to_calendar_day(&now)),
            last_update: now,
        }
    }

    /// Reassemble a window from decoded parts
    pub(crate) fn from_parts(buckets: [DayBucket; 3], last_update: Timestamp) -> Self {
        Self {
            buckets,
            last_update,
        }
    }

    pub fn bucket(&self, slot: Slot) -> &DayBucket {
        &self.buckets[slot.index()]
    }

    /// Buckets in yesterday/today/tomorrow order
    pub fn buckets(&self) -> &[DayBucket; 3] {
        &self.buckets
    }

    /// When the slot labels were last assigned
    pub fn last_update(&self) -> Timestamp {
        self.last_update
    }

    /// Relabel the resident buckets against the day of `now`
    ///
    /// Buckets are matched by calendar day rather than shifted by position,
    /// since wake cycles are irregular and days can be skipped or repeated.
    pub fn reconcile(&mut self, now: Timestamp) -> ReconcileResult {
        let today = normalize_to_calendar_day(&now);
        let previous = core::mem::replace(&mut self.buckets, empty_buckets(today));
        let mut previous = previous.map(Some);

        let mut missing = SlotSet::empty();
        for slot in Slot::ALL {
            let target = self.buckets[slot.index()].day();
            let kept = previous
                .iter_mut()
                .find(|candidate| {
                    matches!(candidate, Some(b) if b.is_available() && b.day() == target)
                })
                .and_then(Option::take);

            match kept {
                Some(bucket) => {
                    debug!("Keeping {} prices for {}", slot.label(), target);
                    self.buckets[slot.index()] = bucket;
                }
                None => {
                    debug!("No {} prices for {}", slot.label(), target);
                    missing.insert(slot);
                }
            }
        }

        self.last_update = now;

        let tomorrow_published = now.hour() >= PUBLICATION_HOUR;
        let needs_fetch = missing.contains(Slot::Yesterday)
            || missing.contains(Slot::Today)
            || (missing.contains(Slot::Tomorrow) && tomorrow_published);

        ReconcileResult {
            needs_fetch,
            missing,
            tomorrow_published,
        }
    }

    /// Install a freshly fetched bucket into `slot`
    ///
    /// Only an available bucket for the slot's day is accepted, so a failed
    /// fetch never replaces prices already held. Returns whether the window
    /// changed.
    pub fn merge_fetched(&mut self, slot: Slot, bucket: DayBucket) -> bool {
        let current = &mut self.buckets[slot.index()];

        if !bucket.is_available() {
            debug!("Fetch for {} left it unavailable", slot.label());
            return false;
        }

        if bucket.day() != current.day() {
            warn!(
                "Discarding prices for {}, {} slot is {}",
                bucket.day(),
                slot.label(),
                current.day()
            );
            return false;
        }

        if let Err(e) = bucket.validate() {
            warn!("Discarding invalid prices for {}: {}", bucket.day(), e);
            return false;
        }

        info!(
            "Stored {} hourly prices for {} ({})",
            bucket.len(),
            bucket.day(),
            slot.label()
        );
        *current = bucket;
        true
    }
}

fn empty_buckets(today: CalendarDay) -> [DayBucket; 3] {
    Slot::ALL.map(|slot| DayBucket::unavailable(today.add_days(slot.day_offset())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::test_support::{bucket_with, day};
    use crate::time::parse_api_timestamp;

    fn at(text: &str) -> Timestamp {
        parse_api_timestamp(text).unwrap()
    }

    /// Window reconciled on 2024-01-10 with all three days present
    fn full_window() -> PriceWindow {
        PriceWindow::from_parts(
            [
                bucket_with(day(2024, 1, 9), 24, |i| i as f32),
                bucket_with(day(2024, 1, 10), 24, |i| 10.0 + i as f32),
                bucket_with(day(2024, 1, 11), 24, |i| 20.0 + i as f32),
            ],
            at("2024-01-10T14:00:00"),
        )
    }

    fn assert_no_duplicate_days(window: &PriceWindow) {
        let available: std::vec::Vec<CalendarDay> = window
            .buckets()
            .iter()
            .filter(|b| b.is_available())
            .map(|b| b.day())
            .collect();
        for (i, a) in available.iter().enumerate() {
            assert!(!available[i + 1..].contains(a), "day {a} held twice");
        }
    }

    #[test]
    fn test_cold_start_is_all_unavailable() {
        let window = PriceWindow::cold_start(at("2024-01-10T08:30:00"));
        assert!(window.buckets().iter().all(|b| !b.is_available()));
        assert_eq!(window.bucket(Slot::Yesterday).day(), day(2024, 1, 9));
        assert_eq!(window.bucket(Slot::Today).day(), day(2024, 1, 10));
        assert_eq!(window.bucket(Slot::Tomorrow).day(), day(2024, 1, 11));
    }

    #[test]
    fn test_cold_start_reconcile_wants_everything_due() {
        let now = at("2024-01-10T08:30:00");
        let mut window = PriceWindow::cold_start(now);
        let result = window.reconcile(now);

        assert!(result.needs_fetch);
        assert_eq!(result.missing.len(), 3);
        let due: std::vec::Vec<Slot> = result.due().iter().collect();
        assert_eq!(due, [Slot::Yesterday, Slot::Today]);
    }

    #[test]
    fn test_same_day_reconcile_keeps_everything() {
        let mut window = full_window();
        let before = window.clone();
        let result = window.reconcile(at("2024-01-10T20:00:00"));

        assert!(!result.needs_fetch);
        assert!(result.missing.is_empty());
        assert_eq!(window.buckets(), before.buckets());
        assert_eq!(window.last_update(), at("2024-01-10T20:00:00"));
    }

    #[test]
    fn test_next_day_shifts_by_date() {
        let mut window = full_window();
        let result = window.reconcile(at("2024-01-11T06:00:00"));

        assert_eq!(window.bucket(Slot::Yesterday).day(), day(2024, 1, 10));
        assert_eq!(window.bucket(Slot::Yesterday).points()[0].price(), 10.0);
        assert_eq!(window.bucket(Slot::Today).day(), day(2024, 1, 11));
        assert_eq!(window.bucket(Slot::Today).points()[0].price(), 20.0);
        assert!(!window.bucket(Slot::Tomorrow).is_available());
        assert_eq!(window.bucket(Slot::Tomorrow).day(), day(2024, 1, 12));

        // Tomorrow is expected to be missing before publication
        assert!(!result.needs_fetch);
        assert!(result.missing.contains(Slot::Tomorrow));
        assert!(result.due().is_empty());
    }

    #[test]
    fn test_missing_tomorrow_due_from_publication_hour() {
        let mut window = full_window();
        assert!(!window.reconcile(at("2024-01-11T12:59:59")).needs_fetch);

        let mut window = full_window();
        let result = window.reconcile(at("2024-01-11T13:00:00"));
        assert!(result.needs_fetch);
        assert_eq!(result.due().iter().collect::<std::vec::Vec<_>>(), [Slot::Tomorrow]);
    }

    #[test]
    fn test_missing_yesterday_or_today_due_at_any_hour() {
        for hour in ["00", "05", "12", "13", "23"] {
            let now = at(&format!("2024-01-12T{hour}:00:00"));
            let mut window = full_window();
            let result = window.reconcile(now);
            // 2024-01-11 becomes yesterday, today is missing
            assert!(result.missing.contains(Slot::Today));
            assert!(result.needs_fetch, "hour {hour}");
        }
    }

    #[test]
    fn test_missing_yesterday_alone_is_due_at_any_hour() {
        for hour in ["00", "08", "12", "13", "22"] {
            let now = at(&format!("2024-01-09T{hour}:00:00"));
            let mut window = full_window();
            let result = window.reconcile(now);

            // 2024-01-08 was never held, today and tomorrow are reused
            assert!(window.bucket(Slot::Today).is_available());
            assert!(window.bucket(Slot::Tomorrow).is_available());
            assert_eq!(result.missing.iter().collect::<std::vec::Vec<_>>(), [Slot::Yesterday]);
            assert!(result.needs_fetch, "hour {hour}");
            assert_eq!(result.due().iter().collect::<std::vec::Vec<_>>(), [Slot::Yesterday]);
        }
    }

    #[test]
    fn test_skipped_days_drop_everything() {
        let mut window = full_window();
        let result = window.reconcile(at("2024-01-20T09:00:00"));

        assert_eq!(result.missing.len(), 3);
        assert!(window.buckets().iter().all(|b| !b.is_available()));
        assert_eq!(window.bucket(Slot::Today).day(), day(2024, 1, 20));
    }

    #[test]
    fn test_clock_going_back_a_day_reuses_buckets() {
        let mut window = full_window();
        window.reconcile(at("2024-01-09T09:00:00"));

        assert!(!window.bucket(Slot::Yesterday).is_available());
        assert_eq!(window.bucket(Slot::Today).day(), day(2024, 1, 9));
        assert!(window.bucket(Slot::Today).is_available());
        assert_eq!(window.bucket(Slot::Tomorrow).day(), day(2024, 1, 10));
        assert!(window.bucket(Slot::Tomorrow).is_available());
    }

    #[test]
    fn test_reconcile_never_duplicates_days() {
        let mut window = full_window();
        for now in [
            "2024-01-10T01:00:00",
            "2024-01-11T13:00:00",
            "2024-01-09T23:00:00",
            "2024-01-12T00:00:00",
            "2024-01-10T12:00:00",
            "2024-02-01T00:00:00",
        ] {
            window.reconcile(at(now));
            assert_no_duplicate_days(&window);
        }
    }

    #[test]
    fn test_merge_installs_available_bucket() {
        let now = at("2024-01-10T08:00:00");
        let mut window = PriceWindow::cold_start(now);
        window.reconcile(now);

        assert!(window.merge_fetched(Slot::Today, bucket_with(day(2024, 1, 10), 24, |_| 1.0)));
        assert!(window.bucket(Slot::Today).is_available());
        assert_eq!(window.bucket(Slot::Today).len(), 24);
    }

    #[test]
    fn test_failed_fetch_never_overwrites() {
        let mut window = full_window();
        let before = window.bucket(Slot::Today).clone();

        assert!(!window.merge_fetched(Slot::Today, DayBucket::unavailable(day(2024, 1, 10))));
        assert_eq!(window.bucket(Slot::Today), &before);
    }

    #[test]
    fn test_merge_rejects_wrong_day() {
        let now = at("2024-01-10T08:00:00");
        let mut window = PriceWindow::cold_start(now);

        assert!(!window.merge_fetched(Slot::Today, bucket_with(day(2024, 1, 11), 24, |_| 1.0)));
        assert!(!window.bucket(Slot::Today).is_available());
        assert_no_duplicate_days(&window);
    }
}
