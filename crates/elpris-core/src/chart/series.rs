//! Selecting the two days of prices shown on the chart

use chrono::Timelike;
use heapless::Vec;

use super::{ChartError, RenderPlan, layout};
use embedded_graphics::prelude::Size;

use crate::prices::{MAX_POINTS_PER_DAY, PricePoint, PriceWindow, Slot};
use crate::time::Timestamp;

/// Most points a chart can hold (two long DST days)
pub const MAX_SERIES_POINTS: usize = 2 * MAX_POINTS_PER_DAY;

/// Two consecutive days of prices, plus the position of the current hour
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    points: Vec<PricePoint, MAX_SERIES_POINTS>,
    slots: [Slot; 2],
    now_index: Option<usize>,
}

impl ChartSeries {
    /// Pick the days to show from `window`
    ///
    /// Today and tomorrow once tomorrow is known, otherwise yesterday and
    /// today. Both days must be available.
    pub fn from_window(window: &PriceWindow, now: Timestamp) -> Result<Self, ChartError> {
        let slots = if window.bucket(Slot::Tomorrow).is_available() {
            [Slot::Today, Slot::Tomorrow]
        } else {
            [Slot::Yesterday, Slot::Today]
        };

        let mut points: Vec<PricePoint, MAX_SERIES_POINTS> = Vec::new();
        let mut today = 0..0;
        for slot in slots {
            let bucket = window.bucket(slot);
            if !bucket.is_available() {
                return Err(ChartError::MissingPrices(slot));
            }
            let start = points.len();
            points
                .extend_from_slice(bucket.points())
                .map_err(|_| ChartError::MissingPrices(slot))?;
            if slot == Slot::Today {
                today = start..points.len();
            }
        }

        // The repeated DST hour matches twice, the later one wins
        let now_index = today.rev().find(|&i| points[i].hour() == now.hour());

        Ok(Self {
            points,
            slots,
            now_index,
        })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// The two slots shown, in display order
    pub fn slots(&self) -> [Slot; 2] {
        self.slots
    }

    /// Index of the current hour within today's prices
    pub fn now_index(&self) -> Option<usize> {
        self.now_index
    }

    /// Lay the series out on a canvas of `canvas` pixels
    pub fn layout(&self, canvas: Size) -> Result<RenderPlan, ChartError> {
        layout(&self.points, self.now_index, canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::test_support::{bucket_with, day};
    use crate::prices::DayBucket;
    use crate::time::{CalendarDay, parse_api_timestamp};

    fn at(text: &str) -> Timestamp {
        parse_api_timestamp(text).unwrap()
    }

    fn window(yesterday: bool, today: bool, tomorrow: bool) -> PriceWindow {
        let pick = |present: bool, d: CalendarDay, base: f32| {
            if present {
                bucket_with(d, 24, move |i| base + i as f32)
            } else {
                DayBucket::unavailable(d)
            }
        };
        PriceWindow::from_parts(
            [
                pick(yesterday, day(2024, 1, 9), 0.0),
                pick(today, day(2024, 1, 10), 100.0),
                pick(tomorrow, day(2024, 1, 11), 200.0),
            ],
            at("2024-01-10T09:00:00"),
        )
    }

    #[test]
    fn test_today_and_tomorrow_when_published() {
        let series = ChartSeries::from_window(&window(true, true, true), at("2024-01-10T14:20:00")).unwrap();
        assert_eq!(series.slots(), [Slot::Today, Slot::Tomorrow]);
        assert_eq!(series.points().len(), 48);
        assert_eq!(series.now_index(), Some(14));
        assert_eq!(series.points()[14].price(), 114.0);
    }

    #[test]
    fn test_yesterday_and_today_before_publication() {
        let series = ChartSeries::from_window(&window(true, true, false), at("2024-01-10T09:59:00")).unwrap();
        assert_eq!(series.slots(), [Slot::Yesterday, Slot::Today]);
        assert_eq!(series.now_index(), Some(24 + 9));
        assert_eq!(series.points()[33].price(), 109.0);
    }

    #[test]
    fn test_missing_day_is_reported() {
        assert_eq!(
            ChartSeries::from_window(&window(false, true, false), at("2024-01-10T09:00:00")),
            Err(ChartError::MissingPrices(Slot::Yesterday))
        );
        assert_eq!(
            ChartSeries::from_window(&window(true, false, true), at("2024-01-10T09:00:00")),
            Err(ChartError::MissingPrices(Slot::Today))
        );
    }

    #[test]
    fn test_repeated_hour_picks_later_point() {
        let window = PriceWindow::from_parts(
            [
                bucket_with(day(2024, 10, 26), 24, |_| 1.0),
                bucket_with(day(2024, 10, 27), 25, |i| i as f32),
                DayBucket::unavailable(day(2024, 10, 28)),
            ],
            at("2024-10-27T02:30:00"),
        );
        let series = ChartSeries::from_window(&window, at("2024-10-27T02:30:00")).unwrap();
        assert_eq!(series.now_index(), Some(24 + 3));
    }

    #[test]
    fn test_missing_hour_has_no_now_index() {
        let window = PriceWindow::from_parts(
            [
                bucket_with(day(2024, 3, 30), 24, |_| 1.0),
                bucket_with(day(2024, 3, 31), 23, |_| 1.0),
                DayBucket::unavailable(day(2024, 4, 1)),
            ],
            at("2024-03-31T02:10:00"),
        );
        let series = ChartSeries::from_window(&window, at("2024-03-31T02:10:00")).unwrap();
        assert_eq!(series.now_index(), None);
        assert_eq!(
            series.layout(Size::new(960, 540)),
            Err(ChartError::NoCurrentHourMatch)
        );
    }
}
