//! Fixed-layout binary encoding of the price window.
//!
//! Binary format (little-endian), 1256 bytes in total:
//! - header: 8 bytes (magic `ELPR`, schema version u8, 3 padding)
//! - last_update: 12 bytes (timestamp)
//! - buckets: 3 × 412 bytes (yesterday, today, tomorrow)
//!
//! Each bucket:
//! - day: 8 bytes (year i32, month u8, day u8, 2 padding)
//! - available: 1 byte (0 or 1)
//! - count: 1 byte (number of valid points)
//! - padding: 2 bytes
//! - points: 25 × 16 bytes (price f32, hour_start timestamp)
//!
//! Timestamps are 12 bytes: year i32, month, day, hour, minute, second as
//! u8, then 3 padding. Point slots past `count` are zero-filled and never
//! read back.

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use chrono::{Datelike, NaiveDate, Timelike};
use thiserror_no_std::Error;

use crate::prices::{DayBucket, MAX_POINTS_PER_DAY, PricePoint, PriceWindow};
use crate::time::{CalendarDay, Timestamp};

/// Identifies a price window blob
pub const MAGIC: [u8; 4] = *b"ELPR";

/// Bumped whenever the layout below changes
pub const SCHEMA_VERSION: u8 = 1;

const HEADER_SIZE: usize = 8;
const DAY_SIZE: usize = 8;
const TIMESTAMP_SIZE: usize = 12;
const POINT_SIZE: usize = 4 + TIMESTAMP_SIZE;
const BUCKET_HEADER_SIZE: usize = DAY_SIZE + 4;
const BUCKET_SIZE: usize = BUCKET_HEADER_SIZE + MAX_POINTS_PER_DAY * POINT_SIZE;

/// Size of an encoded window in bytes
pub const WINDOW_SIZE: usize = HEADER_SIZE + TIMESTAMP_SIZE + 3 * BUCKET_SIZE;

/// Reasons a stored window cannot be decoded
///
/// Callers treat all of them as "no prior state".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the current schema needs
    #[error("Stored window is truncated ({actual} of {expected} bytes)")]
    Truncated {
        /// Size of the current schema
        expected: usize,
        /// Size of the stored blob
        actual: usize,
    },

    /// Written by a different schema version
    #[error("Stored window does not match schema version (version {found}, {len} bytes)")]
    WrongVersion {
        /// Version byte found in the blob
        found: u8,
        /// Size of the stored blob
        len: usize,
    },

    /// Right size and version but the content is impossible
    #[error("Stored window is corrupt: {0}")]
    Corrupt(&'static str),
}

impl PriceWindow {
    /// Encode the window into its fixed-size flash representation
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; WINDOW_SIZE];
        let mut offset = 0;

        // Header
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4] = SCHEMA_VERSION;
        offset += HEADER_SIZE;

        write_timestamp(&mut bytes[offset..offset + TIMESTAMP_SIZE], &self.last_update());
        offset += TIMESTAMP_SIZE;

        for bucket in self.buckets() {
            write_bucket(&mut bytes[offset..offset + BUCKET_SIZE], bucket);
            offset += BUCKET_SIZE;
        }

        bytes
    }

    /// Decode a window written by [`serialize`](Self::serialize)
    pub fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < WINDOW_SIZE {
            return Err(DecodeError::Truncated {
                expected: WINDOW_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes.len() > WINDOW_SIZE {
            // A bigger layout than this schema knows
            return Err(DecodeError::WrongVersion {
                found: bytes[4],
                len: bytes.len(),
            });
        }
        if bytes[0..4] != MAGIC {
            return Err(DecodeError::Corrupt("bad magic"));
        }
        if bytes[4] != SCHEMA_VERSION {
            return Err(DecodeError::WrongVersion {
                found: bytes[4],
                len: bytes.len(),
            });
        }

        let mut offset = HEADER_SIZE;
        let last_update = read_timestamp(&bytes[offset..offset + TIMESTAMP_SIZE])?;
        offset += TIMESTAMP_SIZE;

        let yesterday = read_bucket(&bytes[offset..offset + BUCKET_SIZE])?;
        offset += BUCKET_SIZE;
        let today = read_bucket(&bytes[offset..offset + BUCKET_SIZE])?;
        offset += BUCKET_SIZE;
        let tomorrow = read_bucket(&bytes[offset..offset + BUCKET_SIZE])?;

        let buckets = [yesterday, today, tomorrow];
        for (i, a) in buckets.iter().enumerate() {
            let clash = buckets[i + 1..]
                .iter()
                .any(|b| a.is_available() && b.is_available() && a.day() == b.day());
            if clash {
                return Err(DecodeError::Corrupt("day stored twice"));
            }
        }

        Ok(PriceWindow::from_parts(buckets, last_update))
    }
}

fn write_day(bytes: &mut [u8], day: CalendarDay) {
    bytes[0..4].copy_from_slice(&day.year().to_le_bytes());
    bytes[4] = day.month() as u8;
    bytes[5] = day.day() as u8;
    // Padding is already zero
}

fn read_day(bytes: &[u8]) -> Result<CalendarDay, DecodeError> {
    let year = read_i32(&bytes[0..4]);
    CalendarDay::from_ymd(year, u32::from(bytes[4]), u32::from(bytes[5]))
        .ok_or(DecodeError::Corrupt("impossible day"))
}

fn write_timestamp(bytes: &mut [u8], timestamp: &Timestamp) {
    bytes[0..4].copy_from_slice(&timestamp.year().to_le_bytes());
    bytes[4] = timestamp.month() as u8;
    bytes[5] = timestamp.day() as u8;
    bytes[6] = timestamp.hour() as u8;
    bytes[7] = timestamp.minute() as u8;
    bytes[8] = timestamp.second() as u8;
}

fn read_timestamp(bytes: &[u8]) -> Result<Timestamp, DecodeError> {
    let year = read_i32(&bytes[0..4]);
    let [month, day, hour, minute, second] = [bytes[4], bytes[5], bytes[6], bytes[7], bytes[8]]
        .map(u32::from);
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or(DecodeError::Corrupt("impossible timestamp"))
}

fn write_bucket(bytes: &mut [u8], bucket: &DayBucket) {
    write_day(&mut bytes[0..DAY_SIZE], bucket.day());
    bytes[DAY_SIZE] = u8::from(bucket.is_available());
    bytes[DAY_SIZE + 1] = bucket.len() as u8;

    let mut offset = BUCKET_HEADER_SIZE;
    for point in bucket.points() {
        bytes[offset..offset + 4].copy_from_slice(&point.price().to_le_bytes());
        write_timestamp(
            &mut bytes[offset + 4..offset + POINT_SIZE],
            &point.hour_start(),
        );
        offset += POINT_SIZE;
    }
}

fn read_bucket(bytes: &[u8]) -> Result<DayBucket, DecodeError> {
    let day = read_day(&bytes[0..DAY_SIZE])?;
    let count = usize::from(bytes[DAY_SIZE + 1]);

    match bytes[DAY_SIZE] {
        0 if count == 0 => Ok(DayBucket::unavailable(day)),
        0 => Err(DecodeError::Corrupt("points in unavailable bucket")),
        1 if count > MAX_POINTS_PER_DAY => Err(DecodeError::Corrupt("point count")),
        1 => {
            let mut points = heapless::Vec::<PricePoint, MAX_POINTS_PER_DAY>::new();
            let mut offset = BUCKET_HEADER_SIZE;
            for _ in 0..count {
                let price = f32::from_le_bytes(read_array(&bytes[offset..offset + 4]));
                let hour_start = read_timestamp(&bytes[offset + 4..offset + POINT_SIZE])?;
                // Cannot overflow, count was checked above
                let _ = points.push(PricePoint::new(price, hour_start));
                offset += POINT_SIZE;
            }
            DayBucket::from_points(day, points).map_err(|_| DecodeError::Corrupt("invalid bucket"))
        }
        _ => Err(DecodeError::Corrupt("available flag")),
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes(read_array(bytes))
}

fn read_array(bytes: &[u8]) -> [u8; 4] {
    let mut array = [0u8; 4];
    array.copy_from_slice(&bytes[..4]);
    array
}
