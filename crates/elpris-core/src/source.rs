//! Remote price source adapter
//!
//! Fetches one calendar day of hourly spot prices from the public
//! elprisenligenu.dk API and turns the JSON document into a [`DayBucket`].
//! Failures never escape [`PriceSource::fetch_day`]; they are logged and the
//! bucket comes back unavailable so the rest of the cycle can carry on.

extern crate alloc;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror_no_std::Error;

use crate::config::{PriceConfig, Region};
use crate::prices::{BucketError, DayBucket, DayPoints, PricePoint};
use crate::time::{CalendarDay, Timestamp, split_api_timestamp, start_of_hour};

/// HTTP status the provider answers a published day with
const HTTP_OK: u16 = 200;

/// Response to a blocking GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Blocking HTTP transport, e.g. the radio stack on the device
pub trait HttpClient {
    /// Transport level failure (DNS, TLS, timeout, ...)
    type Error: Debug;

    fn get(&mut self, url: &str) -> Result<HttpResponse, Self::Error>;
}

/// Reasons a response body could not be turned into a bucket
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid price JSON at line {line}, column {column}")]
    Json { line: usize, column: usize },

    #[error("Invalid time_start in entry {index}")]
    Timestamp { index: usize },

    #[error("Prices do not form a valid day: {0}")]
    Bucket(BucketError),

    #[error("More hourly prices than a day can hold")]
    TooManyPoints,

    #[error("Too many entries for one hour at entry {index}")]
    TooManyEntries { index: usize },
}

/// Finest resolution accepted from the provider (one entry per minute)
pub const MAX_ENTRIES_PER_HOUR: u16 = 60;

/// Reasons a day could not be fetched
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport failure")]
    Transport,

    #[error("Unexpected HTTP status {code}")]
    Status { code: u16 },

    #[error("Malformed response: {0}")]
    Parse(ParseError),
}

/// One entry of the provider's JSON array
#[derive(Debug, Deserialize)]
struct ApiPrice<'a> {
    #[serde(rename = "DKK_per_kWh")]
    dkk_per_kwh: f32,
    #[serde(borrow)]
    time_start: &'a str,
}

/// Fetches days of prices for one price region
pub struct PriceSource<'a, C: HttpClient> {
    client: C,
    host: &'a str,
    region: Region,
}

impl<'a, C: HttpClient> PriceSource<'a, C> {
    pub fn new(client: C, config: &PriceConfig<'a>) -> Self {
        Self {
            client,
            host: config.host,
            region: config.region,
        }
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// URL of the JSON document for `day`
    pub fn request_url(&self, day: CalendarDay) -> String {
        format!(
            "https://{}/api/v1/prices/{:04}/{:02}-{:02}_{}.json",
            self.host,
            day.year(),
            day.month(),
            day.day(),
            self.region.code()
        )
    }

    /// Fetch `day`, degrading any failure to an unavailable bucket
    pub fn fetch_day(&mut self, day: CalendarDay) -> DayBucket {
        match self.try_fetch_day(day) {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!("Prices for {} unavailable: {}", day, e);
                DayBucket::unavailable(day)
            }
        }
    }

    /// Fetch `day` and report why it failed
    pub fn try_fetch_day(&mut self, day: CalendarDay) -> Result<DayBucket, FetchError> {
        let url = self.request_url(day);
        debug!("GET {}", url);

        let response = self.client.get(&url).map_err(|e| {
            warn!("Request for {} failed: {:?}", url, e);
            FetchError::Transport
        })?;

        if response.status != HTTP_OK {
            return Err(FetchError::Status {
                code: response.status,
            });
        }

        let bucket = parse_day(day, &response.body).map_err(FetchError::Parse)?;
        info!("Fetched {} hourly prices for {}", bucket.len(), day);
        Ok(bucket)
    }
}

/// Parse a provider document into a bucket for `day`
///
/// Entries sharing an hour and offset designator are averaged, which folds
/// quarter-hour feeds into hourly prices. The repeated hour of an autumn DST
/// change has a different offset and so stays a separate point.
pub fn parse_day(day: CalendarDay, body: &[u8]) -> Result<DayBucket, ParseError> {
    let entries: Vec<ApiPrice<'_>> = serde_json::from_slice(body).map_err(|e| ParseError::Json {
        line: e.line(),
        column: e.column(),
    })?;

    let mut points = DayPoints::new();
    let mut group: Option<HourGroup<'_>> = None;

    for (index, entry) in entries.iter().enumerate() {
        let (start, offset) =
            split_api_timestamp(entry.time_start).map_err(|_| ParseError::Timestamp { index })?;
        let hour_start = start_of_hour(&start);

        match group.as_mut() {
            Some(current) if current.hour_start == hour_start && current.offset == offset => {
                current
                    .add(entry.dkk_per_kwh)
                    .ok_or(ParseError::TooManyEntries { index })?;
            }
            _ => {
                if let Some(done) = group.take() {
                    done.push_into(&mut points)?;
                }
                group = Some(HourGroup::new(hour_start, offset, entry.dkk_per_kwh));
            }
        }
    }
    if let Some(done) = group {
        done.push_into(&mut points)?;
    }

    DayBucket::from_points(day, points).map_err(ParseError::Bucket)
}

/// Running average of the entries for one hour
struct HourGroup<'a> {
    hour_start: Timestamp,
    offset: &'a str,
    sum: f32,
    count: u16,
}

impl<'a> HourGroup<'a> {
    fn new(hour_start: Timestamp, offset: &'a str, price: f32) -> Self {
        Self {
            hour_start,
            offset,
            sum: price,
            count: 1,
        }
    }

    /// `None` once the hour already holds [`MAX_ENTRIES_PER_HOUR`] entries
    fn add(&mut self, price: f32) -> Option<()> {
        if self.count >= MAX_ENTRIES_PER_HOUR {
            return None;
        }
        self.sum += price;
        self.count += 1;
        Some(())
    }

    fn push_into(self, points: &mut DayPoints) -> Result<(), ParseError> {
        let price = self.sum / f32::from(self.count);
        points
            .push(PricePoint::new(price, self.hour_start))
            .map_err(|_| ParseError::TooManyPoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::test_support::day;
    use std::string::ToString;

    /// Hands out canned responses and records requested URLs
    #[derive(Default)]
    struct MockClient {
        responses: std::vec::Vec<Result<HttpResponse, &'static str>>,
        requests: std::vec::Vec<String>,
    }

    impl MockClient {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                responses: std::vec![Ok(HttpResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                })],
                requests: std::vec::Vec::new(),
            }
        }
    }

    impl HttpClient for MockClient {
        type Error = &'static str;

        fn get(&mut self, url: &str) -> Result<HttpResponse, Self::Error> {
            self.requests.push(url.to_string());
            if self.responses.is_empty() {
                return Err("no response queued");
            }
            self.responses.remove(0)
        }
    }

    fn hourly_json(date: &str, hours: usize) -> String {
        let entries: std::vec::Vec<String> = (0..hours)
            .map(|h| {
                std::format!(
                    r#"{{"DKK_per_kWh":{},"EUR_per_kWh":0.1,"EXR":7.46,"time_start":"{date}T{h:02}:00:00+01:00","time_end":"{date}T{h:02}:59:59+01:00"}}"#,
                    0.5 + h as f32 * 0.25
                )
            })
            .collect();
        std::format!("[{}]", entries.join(","))
    }

    fn source(client: MockClient) -> PriceSource<'static, MockClient> {
        PriceSource::new(client, &PriceConfig::default())
    }

    #[test]
    fn test_request_url() {
        let src = PriceSource::new(
            MockClient::default(),
            &PriceConfig {
                host: "example.com",
                region: Region::Dk2,
            },
        );
        assert_eq!(
            src.request_url(day(2024, 3, 9)),
            "https://example.com/api/v1/prices/2024/03-09_DK2.json"
        );
    }

    #[test]
    fn test_fetch_parses_full_day() {
        let mut src = source(MockClient::replying(200, &hourly_json("2024-01-10", 24)));
        let bucket = src.try_fetch_day(day(2024, 1, 10)).unwrap();

        assert!(bucket.is_available());
        assert_eq!(bucket.len(), 24);
        assert_eq!(bucket.points()[0].price(), 0.5);
        assert_eq!(bucket.points()[23].hour(), 23);
        assert_eq!(
            src.client_mut().requests,
            ["https://www.elprisenligenu.dk/api/v1/prices/2024/01-10_DK1.json"]
        );
    }

    #[test]
    fn test_not_yet_published_is_unavailable() {
        let mut src = source(MockClient::replying(404, "Not Found"));
        assert_eq!(
            src.try_fetch_day(day(2024, 1, 11)),
            Err(FetchError::Status { code: 404 })
        );

        let mut src = source(MockClient::replying(404, "Not Found"));
        let bucket = src.fetch_day(day(2024, 1, 11));
        assert!(!bucket.is_available());
        assert_eq!(bucket.day(), day(2024, 1, 11));
    }

    #[test]
    fn test_transport_failure_is_unavailable() {
        let mut src = source(MockClient::default());
        assert_eq!(src.try_fetch_day(day(2024, 1, 10)), Err(FetchError::Transport));
        assert!(!src.fetch_day(day(2024, 1, 10)).is_available());
    }

    #[test]
    fn test_garbage_body_is_parse_error() {
        let mut src = source(MockClient::replying(200, "<html>oops</html>"));
        assert!(matches!(
            src.try_fetch_day(day(2024, 1, 10)),
            Err(FetchError::Parse(ParseError::Json { .. }))
        ));
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let body = r#"[{"time_start":"2024-01-10T00:00:00+01:00"}]"#;
        assert!(matches!(
            parse_day(day(2024, 1, 10), body.as_bytes()),
            Err(ParseError::Json { .. })
        ));
    }

    #[test]
    fn test_bad_timestamp_is_reported_with_index() {
        let body = r#"[{"DKK_per_kWh":1.0,"time_start":"2024-01-10T00:00:00"},
                       {"DKK_per_kWh":1.0,"time_start":"yesterday"}]"#;
        assert_eq!(
            parse_day(day(2024, 1, 10), body.as_bytes()),
            Err(ParseError::Timestamp { index: 1 })
        );
    }

    #[test]
    fn test_short_document_fails_validation() {
        assert_eq!(
            parse_day(day(2024, 1, 10), hourly_json("2024-01-10", 12).as_bytes()),
            Err(ParseError::Bucket(BucketError::PointCount { count: 12 }))
        );
    }

    #[test]
    fn test_wrong_day_fails_validation() {
        assert_eq!(
            parse_day(day(2024, 1, 11), hourly_json("2024-01-10", 24).as_bytes()),
            Err(ParseError::Bucket(BucketError::DayMismatch { index: 0 }))
        );
    }

    #[test]
    fn test_quarter_hours_are_averaged() {
        let entries: std::vec::Vec<String> = (0..96)
            .map(|q| {
                let (h, m) = (q / 4, (q % 4) * 15);
                // Quarters priced 1, 2, 3, 4 within every hour
                let price = (q % 4 + 1) as f32;
                std::format!(
                    r#"{{"DKK_per_kWh":{price},"time_start":"2025-11-04T{h:02}:{m:02}:00+01:00"}}"#
                )
            })
            .collect();
        let body = std::format!("[{}]", entries.join(","));

        let bucket = parse_day(day(2025, 11, 4), body.as_bytes()).unwrap();
        assert_eq!(bucket.len(), 24);
        assert!(bucket.points().iter().all(|p| p.price() == 2.5));
    }

    #[test]
    fn test_repeated_dst_hour_stays_two_points() {
        let mut entries = std::vec::Vec::new();
        for h in 0..24u32 {
            if h == 2 {
                entries.push(r#"{"DKK_per_kWh":1.0,"time_start":"2024-10-27T02:00:00+02:00"}"#.to_string());
                entries.push(r#"{"DKK_per_kWh":3.0,"time_start":"2024-10-27T02:00:00+01:00"}"#.to_string());
            } else {
                let offset = if h < 2 { "+02:00" } else { "+01:00" };
                entries.push(std::format!(
                    r#"{{"DKK_per_kWh":1.0,"time_start":"2024-10-27T{h:02}:00:00{offset}"}}"#
                ));
            }
        }
        let body = std::format!("[{}]", entries.join(","));

        let bucket = parse_day(day(2024, 10, 27), body.as_bytes()).unwrap();
        assert_eq!(bucket.len(), 25);
        assert_eq!(bucket.points()[2].price(), 1.0);
        assert_eq!(bucket.points()[3].price(), 3.0);
        assert_eq!(bucket.points()[3].hour(), 2);
    }

    #[test]
    fn test_spring_short_day() {
        let entries: std::vec::Vec<String> = (0..24u32)
            .filter(|&h| h != 2)
            .map(|h| std::format!(r#"{{"DKK_per_kWh":0.1,"time_start":"2024-03-31T{h:02}:00:00"}}"#))
            .collect();
        let body = std::format!("[{}]", entries.join(","));
        assert_eq!(parse_day(day(2024, 3, 31), body.as_bytes()).unwrap().len(), 23);
    }

    #[test]
    fn test_too_many_hours() {
        let entries: std::vec::Vec<String> = (0..26u32)
            .map(|i| {
                std::format!(
                    r#"{{"DKK_per_kWh":0.1,"time_start":"2024-01-10T{:02}:00:00{}"}}"#,
                    i % 24,
                    if i < 24 { "+01:00" } else { "Z" }
                )
            })
            .collect();
        let body = std::format!("[{}]", entries.join(","));
        assert_eq!(
            parse_day(day(2024, 1, 10), body.as_bytes()),
            Err(ParseError::TooManyPoints)
        );
    }

    #[test]
    fn test_flooded_hour_is_rejected() {
        let entry = r#"{"DKK_per_kWh":0.1,"time_start":"2024-01-10T00:00:00"}"#;
        let body = std::format!("[{}]", std::vec![entry; 70_000].join(","));
        assert_eq!(
            parse_day(day(2024, 1, 10), body.as_bytes()),
            Err(ParseError::TooManyEntries {
                index: MAX_ENTRIES_PER_HOUR as usize
            })
        );

        let mut source = source(MockClient::replying(200, &body));
        assert!(!source.fetch_day(day(2024, 1, 10)).is_available());
    }

    #[test]
    fn test_minute_resolution_is_accepted() {
        let entries: std::vec::Vec<String> = (0..24u32)
            .flat_map(|h| {
                (0..60u32).map(move |m| {
                    std::format!(
                        r#"{{"DKK_per_kWh":0.5,"time_start":"2024-01-10T{h:02}:{m:02}:00"}}"#
                    )
                })
            })
            .collect();
        let body = std::format!("[{}]", entries.join(","));
        let bucket = parse_day(day(2024, 1, 10), body.as_bytes()).unwrap();
        assert_eq!(bucket.len(), 24);
        assert!(bucket.points().iter().all(|p| p.price() == 0.5));
    }
}
