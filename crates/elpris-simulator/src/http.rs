//! HTTP transports for the price source.
//!
//! [`SimHttp::Live`] talks to the real provider with a blocking `reqwest`
//! client. [`SimHttp::Offline`] answers from a generator that produces the
//! same JSON shape, so the display can be exercised without network access.

use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Offset, TimeZone, Timelike};
use chrono_tz::Europe::Copenhagen;
use log::debug;

use elpris_core::prices::PUBLICATION_HOUR;
use elpris_core::source::{HttpClient, HttpResponse};
use elpris_core::time::Timestamp;

/// Request timeout for the live provider.
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(15);

/// Price transport selected at startup.
pub enum SimHttp {
    Live(reqwest::blocking::Client),
    Offline(OfflineProvider),
}

impl SimHttp {
    pub fn live() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("elpris-simulator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::Live(client))
    }

    /// Keep the offline generator's idea of "now" in step with the clock.
    pub fn set_now(&mut self, now: Timestamp) {
        if let Self::Offline(provider) = self {
            provider.now = now;
        }
    }
}

impl HttpClient for SimHttp {
    type Error = anyhow::Error;

    fn get(&mut self, url: &str) -> Result<HttpResponse, Self::Error> {
        match self {
            Self::Live(client) => {
                let response = client
                    .get(url)
                    .send()
                    .with_context(|| format!("Failed to send request to {url}"))?;
                let status = response.status().as_u16();
                let body = response.bytes().context("Failed to read response bytes")?;
                Ok(HttpResponse {
                    status,
                    body: body.to_vec(),
                })
            }
            Self::Offline(provider) => Ok(provider.respond(url)),
        }
    }
}

/// Synthesises provider responses for days that would be published by `now`.
pub struct OfflineProvider {
    now: Timestamp,
}

impl OfflineProvider {
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }

    fn respond(&self, url: &str) -> HttpResponse {
        let Some(date) = date_from_url(url) else {
            return not_found();
        };

        let today = self.now.date();
        let published = date <= today
            || (Some(date) == today.succ_opt() && self.now.hour() >= PUBLICATION_HOUR);
        if !published {
            debug!("Offline provider: {} not published yet", date);
            return not_found();
        }

        HttpResponse {
            status: 200,
            body: day_json(date).into_bytes(),
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse {
        status: 404,
        body: b"Not Found".to_vec(),
    }
}

/// Parse `.../prices/YYYY/MM-DD_REGION.json`.
fn date_from_url(url: &str) -> Option<NaiveDate> {
    let path = url.rsplit("/prices/").next()?;
    let (year, rest) = path.split_once('/')?;
    let (month_day, _) = rest.split_once('_')?;
    let (month, day) = month_day.split_once('-')?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Provider JSON for every local hour of `date` in Copenhagen.
///
/// Walking UTC hours from local midnight to the next gives 23, 24 or 25
/// entries, with the repeated autumn hour carrying its own offset.
pub fn day_json(date: NaiveDate) -> String {
    let Some(next) = date.succ_opt() else {
        return "[]".to_string();
    };
    let (Some(start), Some(end)) = (
        local_midnight_utc(date),
        local_midnight_utc(next),
    ) else {
        return "[]".to_string();
    };

    let mut entries = Vec::new();
    let mut instant = start;
    while instant < end {
        let local = Copenhagen.from_utc_datetime(&instant);
        let offset = local.offset().fix();
        let stamp = local.naive_local().format("%Y-%m-%dT%H:%M:%S");
        let end_stamp = (local.naive_local() + Duration::minutes(59) + Duration::seconds(59))
            .format("%Y-%m-%dT%H:%M:%S");
        entries.push(format!(
            r#"{{"DKK_per_kWh":{:.5},"EUR_per_kWh":{:.5},"EXR":7.46,"time_start":"{stamp}{offset}","time_end":"{end_stamp}{offset}"}}"#,
            synthetic_price(local.hour()),
            synthetic_price(local.hour()) / 7.46,
        ));
        instant += Duration::hours(1);
    }
    format!("[{}]", entries.join(","))
}

fn local_midnight_utc(date: NaiveDate) -> Option<chrono::NaiveDateTime> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Copenhagen
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.naive_utc())
}

/// Two daily peaks with a dip into negative prices around midday.
fn synthetic_price(hour: u32) -> f32 {
    let h = hour as f32;
    let morning = 0.9 * (-((h - 8.0) / 2.0).powi(2)).exp();
    let evening = 1.6 * (-((h - 18.5) / 2.5).powi(2)).exp();
    let solar_dip = -0.35 * (-((h - 13.0) / 1.5).powi(2)).exp();
    0.45 + morning + evening + solar_dip
}

#[cfg(test)]
mod tests {
    use super::*;
    use elpris_core::source::parse_day;
    use elpris_core::time::{CalendarDay, parse_api_timestamp};

    fn url(date: &str) -> String {
        let (y, md) = date.split_at(4);
        format!(
            "https://www.elprisenligenu.dk/api/v1/prices/{y}/{}_DK1.json",
            &md[1..]
        )
    }

    fn hours_in(date: NaiveDate) -> usize {
        let day = CalendarDay::from_date(date);
        parse_day(day, day_json(date).as_bytes()).unwrap().len()
    }

    #[test]
    fn test_date_from_url() {
        assert_eq!(
            date_from_url(&url("2024-03-09")),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(date_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_generated_days_follow_dst() {
        assert_eq!(hours_in(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()), 24);
        assert_eq!(hours_in(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()), 23);
        assert_eq!(hours_in(NaiveDate::from_ymd_opt(2024, 10, 27).unwrap()), 25);
    }

    #[test]
    fn test_tomorrow_published_from_one_pm() {
        let mut http = SimHttp::Offline(OfflineProvider::new(
            parse_api_timestamp("2024-01-10T12:59:00").unwrap(),
        ));
        assert_eq!(http.get(&url("2024-01-11")).unwrap().status, 404);
        assert_eq!(http.get(&url("2024-01-10")).unwrap().status, 200);

        http.set_now(parse_api_timestamp("2024-01-10T13:00:00").unwrap());
        assert_eq!(http.get(&url("2024-01-11")).unwrap().status, 200);
        assert_eq!(http.get(&url("2024-01-12")).unwrap().status, 404);
    }
}
