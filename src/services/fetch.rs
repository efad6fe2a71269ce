use std::thread;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use rand::{thread_rng, Rng};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::model::canteen::{Canteen, Provider};
use crate::model::config::PipelineConfig;
use crate::services::encoding;

const USER_AGENT: &str = concat!("eat-core/", env!("CARGO_PKG_VERSION"));
const MAX_ATTEMPTS: usize = 3;
const BASE_DELAY_MS: u64 = 500;
const MAX_BACKOFF_EXP: usize = 6;

fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..200);
    let exp = attempt.min(MAX_BACKOFF_EXP) as u32;
    Duration::from_millis(BASE_DELAY_MS * 2_u64.pow(exp) + jitter)
}

/// Source of raw menu pages.
///
/// `Ok(None)` means there is no page for that date (closed day).
pub trait MenuSource: Send + Sync {
    fn fetch_page(&self, canteen: Canteen, date: NaiveDate) -> Result<Option<String>, FetchError>;
}

pub struct HttpSource {
    client: Client,
    base_url: String,
    openmensa_url: String,
    stwno_url: String,
    max_attempts: usize,
}

impl HttpSource {
    pub fn new(base_url: &str, openmensa_url: &str, stwno_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            openmensa_url: openmensa_url.trim_end_matches('/').to_string(),
            stwno_url: stwno_url.trim_end_matches('/').to_string(),
            max_attempts: MAX_ATTEMPTS,
        })
    }

    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn from_config(cfg: &PipelineConfig) -> Result<Self, FetchError> {
        Self::new(
            &cfg.base_url,
            &cfg.openmensa_url,
            &cfg.stwno_url,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn url_for(&self, canteen: Canteen, date: NaiveDate) -> String {
        match canteen.provider() {
            Provider::Studentenwerk { url_id } => format!(
                "{}/speiseplan_{:04}-{:02}-{:02}_{}_-de.html",
                self.base_url,
                date.year(),
                date.month(),
                date.day(),
                url_id
            ),
            Provider::OpenMensa { canteen_id } => format!(
                "{}/canteens/{}/days/{}/meals",
                self.openmensa_url,
                canteen_id,
                date.format("%Y-%m-%d")
            ),
            // one file per ISO week number, without the year
            Provider::Stwno { location } => format!(
                "{}/{}/{}.csv",
                self.stwno_url,
                location,
                date.iso_week().week()
            ),
        }
    }
}

impl HttpSource {
    fn fetch_once(&self, url: &str) -> Result<Option<String>, FetchError> {
        let resp = self.client.get(url).send().map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().map_err(|e| transport_error(url, e))?;
        Ok(Some(encoding::decode(&bytes)))
    }
}

impl MenuSource for HttpSource {
    /// Timeouts, transport errors and 408/429/5xx are retried with backoff.
    fn fetch_page(&self, canteen: Canteen, date: NaiveDate) -> Result<Option<String>, FetchError> {
        let url = self.url_for(canteen, date);
        debug!(canteen = %canteen, %date, %url, "fetching");

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url) {
                Ok(None) => {
                    debug!(canteen = %canteen, %date, "no menu published");
                    return Ok(None);
                }
                Ok(page) => return Ok(page),
                Err(e) if e.is_retriable() && attempt + 1 < self.max_attempts => {
                    warn!(canteen = %canteen, %date, attempt = attempt + 1, "{e}, retrying");
                    thread::sleep(backoff(attempt));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpSource {
        HttpSource::new(
            "https://example.org/mensa/speiseplan/",
            "https://openmensa.example/api/v2",
            "https://stwno.example/csv/",
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn studentenwerk_url_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            source().url_for(Canteen::MensaGarching, date),
            "https://example.org/mensa/speiseplan/speiseplan_2024-03-05_422_-de.html"
        );
    }

    #[test]
    fn only_transient_failures_are_retried() {
        let status = |status| FetchError::Status {
            url: "u".into(),
            status,
        };
        assert!(status(503).is_retriable());
        assert!(status(429).is_retriable());
        assert!(!status(403).is_retriable());
        assert!(FetchError::Timeout { url: "u".into() }.is_retriable());
        assert_eq!(source().max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn stwno_url_uses_week_number() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 18).unwrap();
        assert_eq!(
            source().url_for(Canteen::MensaStraubing, date),
            "https://stwno.example/csv/HS-SR/16.csv"
        );
    }

    #[test]
    fn backoff_is_capped() {
        assert!(backoff(200) < Duration::from_secs(60));
        assert!(backoff(0) >= Duration::from_millis(BASE_DELAY_MS));
    }

    #[test]
    fn openmensa_url() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 30).unwrap();
        assert_eq!(
            source().url_for(Canteen::MensaBildungscampusHeilbronn, date),
            "https://openmensa.example/api/v2/canteens/277/days/2024-07-30/meals"
        );
    }
}
