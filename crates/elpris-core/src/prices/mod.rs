//! Hourly price data and the three-day price window
//!
//! A [`DayBucket`] holds one calendar day of hourly prices. Three of them,
//! labelled by [`Slot`], make up the [`PriceWindow`] that survives between
//! wake cycles through the flash codec in [`crate::storage`].

mod window;

pub use window::{PUBLICATION_HOUR, PriceWindow, ReconcileResult};

use core::fmt;

use chrono::Timelike;
use heapless::Vec;
use thiserror_no_std::Error;

use crate::time::{CalendarDay, Timestamp, normalize_to_calendar_day};

/// Maximum number of hourly prices in a day (25 on the autumn DST change)
pub const MAX_POINTS_PER_DAY: usize = 25;

/// Minimum number of hourly prices in a day (23 on the spring DST change)
pub const MIN_POINTS_PER_DAY: usize = 23;

/// Fixed-capacity storage for one day of prices
pub type DayPoints = Vec<PricePoint, MAX_POINTS_PER_DAY>;

/// Reasons a day of prices is rejected
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BucketError {
    /// A day must have 23, 24 or 25 hourly prices
    #[error("Expected 23-25 hourly prices, got {count}")]
    PointCount {
        /// Number of prices supplied
        count: usize,
    },

    /// A price belongs to a different day than the bucket
    #[error("Price at index {index} does not belong to the bucket day")]
    DayMismatch {
        /// Position of the offending price
        index: usize,
    },
}

/// One hourly spot price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    price: f32,
    hour_start: Timestamp,
}

impl PricePoint {
    /// Create a price point. `price` is in DKK per kWh and may be negative.
    pub const fn new(price: f32, hour_start: Timestamp) -> Self {
        Self { price, hour_start }
    }

    pub const fn price(&self) -> f32 {
        self.price
    }

    pub const fn hour_start(&self) -> Timestamp {
        self.hour_start
    }

    /// Hour of day (0-23) the price applies to
    pub fn hour(&self) -> u32 {
        self.hour_start.hour()
    }

    pub fn day(&self) -> CalendarDay {
        normalize_to_calendar_day(&self.hour_start)
    }
}

/// One calendar day of hourly prices
///
/// An unavailable bucket has no points but still remembers which day it
/// stands for, so the caller knows what to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    day: CalendarDay,
    points: DayPoints,
    available: bool,
}

impl DayBucket {
    /// A placeholder for a day whose prices are not known yet
    pub const fn unavailable(day: CalendarDay) -> Self {
        Self {
            day,
            points: Vec::new(),
            available: false,
        }
    }

    /// Build an available bucket, validating the point count and days
    pub fn from_points<I>(day: CalendarDay, points: I) -> Result<Self, BucketError>
    where
        I: IntoIterator<Item = PricePoint>,
    {
        let mut stored = DayPoints::new();
        let mut count = 0;
        for point in points {
            count += 1;
            // Keep counting past capacity so the error reports the real size
            let _ = stored.push(point);
        }
        if count > MAX_POINTS_PER_DAY {
            return Err(BucketError::PointCount { count });
        }

        let bucket = Self {
            day,
            points: stored,
            available: true,
        };
        bucket.validate()?;
        Ok(bucket)
    }

    /// Check the invariants of an available bucket
    ///
    /// Unavailable buckets always pass.
    pub fn validate(&self) -> Result<(), BucketError> {
        if !self.available {
            return Ok(());
        }

        let count = self.points.len();
        if !(MIN_POINTS_PER_DAY..=MAX_POINTS_PER_DAY).contains(&count) {
            return Err(BucketError::PointCount { count });
        }

        match self.points.iter().position(|p| p.day() != self.day) {
            Some(index) => Err(BucketError::DayMismatch { index }),
            None => Ok(()),
        }
    }

    pub const fn day(&self) -> CalendarDay {
        self.day
    }

    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Hourly prices in chronological order (empty when unavailable)
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Position of a bucket in the window, relative to the last reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Yesterday,
    Today,
    Tomorrow,
}

impl Slot {
    /// All slots in storage and fetch order
    pub const ALL: [Slot; 3] = [Slot::Yesterday, Slot::Today, Slot::Tomorrow];

    pub const fn index(self) -> usize {
        match self {
            Self::Yesterday => 0,
            Self::Today => 1,
            Self::Tomorrow => 2,
        }
    }

    /// Day offset from today
    pub const fn day_offset(self) -> i64 {
        match self {
            Self::Yesterday => -1,
            Self::Today => 0,
            Self::Tomorrow => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yesterday => "yesterday",
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        }
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A set of slots, iterated in yesterday/today/tomorrow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSet(u8);

impl SlotSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, slot: Slot) {
        self.0 |= slot.bit();
    }

    pub fn remove(&mut self, slot: Slot) {
        self.0 &= !slot.bit();
    }

    pub const fn contains(self, slot: Slot) -> bool {
        self.0 & slot.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Slot> {
        Slot::ALL.into_iter().filter(move |&slot| self.contains(slot))
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<T: IntoIterator<Item = Slot>>(iter: T) -> Self {
        let mut set = Self::empty();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}
