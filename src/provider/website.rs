use super::PrayerTimeProvider;
use crate::error::{AppError, AppResult};
use crate::http_config::HttpConfig;
use crate::models::RawTimes;
use crate::utils::circuit_breaker::{get_circuit_breaker, PRAYER_TIMES_SERVICE};
use crate::utils::retry::retry_with_exponential_backoff;
use crate::utils::{truncate_for_log, BoxFuture};
use log::{debug, warn};
use regex::Regex;
use reqwest::Client;
use url::Url;

pub const DEFAULT_SOURCE_URL: &str = "https://masjidalfarouq.org.uk/";

/// Positions of the Fajr, Zuhr, Asr, Maghrib and Isha jamaat times among
/// the page's `ds-time` elements (the others are start times and sunrise).
pub const PRAYER_SLOTS: [usize; 5] = [2, 5, 7, 9, 11];

lazy_static::lazy_static! {
    static ref TIME_ELEMENT: Regex =
        Regex::new(r#"(?is)<([a-z][a-z0-9]*)\b[^>]*\bclass\s*=\s*["'][^"']*\bds-time\b[^"']*["'][^>]*>"#)
            .expect("valid ds-time regex");
    static ref ANY_TAG: Regex =
        Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*?(/?)>").expect("valid tag regex");
    static ref INNER_TAG: Regex = Regex::new(r"<[^>]*>").expect("valid tag regex");
    static ref TWELVE_HOUR: Regex =
        Regex::new(r"(?i)^\d{1,2}:\d{2}\s*[ap]m$").expect("valid time regex");
}

/// Validates the timetable URL: it must parse, use HTTPS and name a host.
pub fn validate_source_url(source_url: &str) -> AppResult<Url> {
    if source_url.trim().is_empty() {
        return Err(AppError::config("Prayer time source URL cannot be empty"));
    }

    let parsed = Url::parse(source_url)
        .map_err(|e| AppError::config(format!("Invalid prayer time source URL: {}", e)))?;

    if parsed.scheme() != "https" {
        return Err(AppError::config(format!(
            "Prayer time source URL must use HTTPS, got '{}://'",
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(AppError::config(format!(
            "Prayer time source URL '{}' has no host",
            source_url
        ))),
    }
}

/// Inner HTML of the element named `name` whose content starts at `start`,
/// up to its own closing tag. Unclosed elements run to the end of the page.
fn element_body<'a>(html: &'a str, name: &str, start: usize) -> &'a str {
    let mut depth = 0usize;
    for tag in ANY_TAG.captures_iter(&html[start..]) {
        if !tag[2].eq_ignore_ascii_case(name) || !tag[3].is_empty() {
            continue;
        }
        if tag[1].is_empty() {
            depth += 1;
        } else if depth == 0 {
            let end = start + tag.get(0).map_or(0, |m| m.start());
            return &html[start..end];
        } else {
            depth -= 1;
        }
    }
    &html[start..]
}

/// Pulls the five jamaat times out of the timetable page.
pub fn extract_prayer_times(html: &str) -> AppResult<RawTimes> {
    let cells: Vec<String> = TIME_ELEMENT
        .captures_iter(html)
        .filter_map(|captures| {
            let open = captures.get(0)?;
            let body = element_body(html, &captures[1], open.end());
            let text = INNER_TAG.replace_all(body, "");
            Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
        })
        .collect();

    debug!("Found {} ds-time cells", cells.len());

    let needed = PRAYER_SLOTS[PRAYER_SLOTS.len() - 1] + 1;
    if cells.len() < needed {
        return Err(AppError::provider(format!(
            "timetable has {} time cells, expected at least {}",
            cells.len(),
            needed
        )));
    }

    let mut times: RawTimes = Default::default();
    for (time, slot) in times.iter_mut().zip(PRAYER_SLOTS) {
        let cell = &cells[slot];
        if !TWELVE_HOUR.is_match(cell) {
            return Err(AppError::provider(format!(
                "time cell {} does not look like a 12-hour time: '{}'",
                slot,
                truncate_for_log(cell, 40)
            )));
        }
        *time = cell.clone();
    }

    Ok(times)
}

/// Scrapes the daily timetable from the masjid website.
pub struct WebsiteProvider {
    url: Url,
    client: Client,
    http: HttpConfig,
}

impl WebsiteProvider {
    pub fn new(source_url: &str) -> AppResult<Self> {
        let url = validate_source_url(source_url)?;
        let http = HttpConfig::prayer_times_fetch();
        let client = http.build_client()?;
        Ok(Self { url, client, http })
    }

    async fn fetch_page(&self) -> AppResult<String> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::provider(format!("timetable page returned HTTP {}", status)));
        }

        Ok(response.text().await?)
    }

    async fn fetch(&self) -> AppResult<RawTimes> {
        let retry_config = self.http.to_retry_config();
        let breaker = get_circuit_breaker(PRAYER_TIMES_SERVICE).await;

        let page = breaker
            .execute(|| retry_with_exponential_backoff(&retry_config, || async move {
                self.fetch_page().await.map_err(anyhow::Error::from)
            }))
            .await
            .map_err(|e| match e.downcast::<AppError>() {
                Ok(app_error) => app_error,
                Err(other) => AppError::provider(other.to_string()),
            })?;

        extract_prayer_times(&page).map_err(|e| {
            warn!("Timetable page from {} could not be read: {}", self.url, e);
            e
        })
    }
}

impl PrayerTimeProvider for WebsiteProvider {
    fn name(&self) -> &str {
        "website"
    }

    fn fetch_raw_times(&self) -> BoxFuture<'_, AppResult<RawTimes>> {
        Box::pin(self.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timetable(cells: &[&str]) -> String {
        let rows: String = cells
            .iter()
            .map(|cell| format!("<div class=\"ds-cell\"><span class=\"ds-time big\">{}</span></div>\n", cell))
            .collect();
        format!("<html><body>{}</body></html>", rows)
    }

    const CELLS: [&str; 12] = [
        "4:58 am", "6:40 am", "5:12 am", "12:50 pm", "6:55 am", "1:03 pm",
        "4:15 pm", "4:30 pm", "7:15 pm", "7:15 pm", "8:30 pm", "8:45 pm",
    ];

    #[test]
    fn test_extract_picks_jamaat_slots() {
        let times = extract_prayer_times(&timetable(&CELLS)).unwrap();
        assert_eq!(times, ["5:12 am", "1:03 pm", "4:30 pm", "7:15 pm", "8:45 pm"].map(String::from));
    }

    #[test]
    fn test_extract_strips_nested_markup() {
        let mut cells = CELLS.map(String::from);
        cells[11] = "8:45 <small>pm</small>".to_string();
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();

        let times = extract_prayer_times(&timetable(&refs)).unwrap();
        assert_eq!(times[4], "8:45 pm");
    }

    #[test]
    fn test_extract_reads_past_nested_closing_tags() {
        let mut cells = CELLS.map(String::from);
        cells[11] = "<b>8:45</b> pm".to_string();
        cells[9] = "<span><i>7</i>:15</span> <span>pm</span>".to_string();
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();

        let times = extract_prayer_times(&timetable(&refs)).unwrap();
        assert_eq!(times[3], "7:15 pm");
        assert_eq!(times[4], "8:45 pm");
    }

    #[test]
    fn test_extract_rejects_short_page() {
        let result = extract_prayer_times(&timetable(&CELLS[..8]));
        assert!(matches!(result, Err(AppError::Provider(_))));
    }

    #[test]
    fn test_extract_rejects_non_time_cell() {
        let mut cells = CELLS;
        cells[7] = "TBC";
        let result = extract_prayer_times(&timetable(&cells));
        assert!(matches!(result, Err(AppError::Provider(_))));
    }

    #[test]
    fn test_validate_source_url() {
        assert!(validate_source_url(DEFAULT_SOURCE_URL).is_ok());
        assert!(validate_source_url("http://masjid.example/").is_err());
        assert!(validate_source_url("not a url").is_err());
        assert!(validate_source_url("   ").is_err());
    }
}
