use crate::error::AppResult;
use crate::models::RawTimes;
use crate::utils::BoxFuture;

pub mod website;

pub use website::{extract_prayer_times, validate_source_url, WebsiteProvider, DEFAULT_SOURCE_URL};

/// Source of the day's five prayer times, as 12-hour strings ordered Fajr to Isha.
pub trait PrayerTimeProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_raw_times(&self) -> BoxFuture<'_, AppResult<RawTimes>>;
}

/// Serves the same five times every day, from configuration.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    times: RawTimes,
}

impl FixedProvider {
    pub fn new(times: RawTimes) -> Self {
        Self { times }
    }
}

impl PrayerTimeProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch_raw_times(&self) -> BoxFuture<'_, AppResult<RawTimes>> {
        let times = self.times.clone();
        Box::pin(async move { Ok(times) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_provider_returns_configured_times() {
        let times = ["5:12am", "1:03pm", "4:30pm", "7:15pm", "8:45pm"].map(String::from);
        let provider = FixedProvider::new(times.clone());

        let fetched = tokio_test::assert_ok!(tokio_test::block_on(provider.fetch_raw_times()));
        assert_eq!(fetched, times);
        assert_eq!(provider.name(), "fixed");
    }
}
