#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use eat_core::error::{FetchError, TranslationError};
use eat_core::model::canteen::Canteen;
use eat_core::model::language::LanguageCode;
use eat_core::services::deepl::TranslationBackend;
use eat_core::services::fetch::MenuSource;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dish(category: &str, title: &str, allergens: &str) -> String {
    format!(
        r#"<li><span class="stwm-artname">{category}</span>
            <ul class="c-menu-dish-list">
                <li class="c-menu-dish-list__item" data-essen-zusatz="" data-essen-allergene="{allergens}"
                    data-essen-typ="" data-essen-fleischlos="1">
                    <div class="c-menu-dish"><p class="c-menu-dish__title">{title}</p></div>
                </li>
            </ul>
        </li>"#
    )
}

/// Studierendenwerk page with one schedule item per `(heading, dishes)`.
pub fn page(days: &[(&str, String)]) -> String {
    let items: String = days
        .iter()
        .map(|(heading, body)| {
            format!(
                r#"<div class="c-schedule__item">
                    <div class="c-schedule__header"><span><strong>{heading}</strong></span></div>
                    <ul class="c-schedule__list">{body}</ul>
                </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div class="c-schedule">{items}</div></body></html>"#)
}

/// Serves canned pages; anything not registered is a closed day.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<(Canteen, NaiveDate), String>,
    pub requests: Mutex<Vec<(Canteen, NaiveDate)>>,
}

impl FakeSource {
    pub fn with_page(mut self, canteen: Canteen, date: NaiveDate, html: String) -> Self {
        self.pages.insert((canteen, date), html);
        self
    }

    /// One dish per day, headed `dd.mm.yyyy`.
    pub fn with_day(self, canteen: Canteen, date: NaiveDate, title: &str) -> Self {
        let heading = date.format("%A, %d.%m.%Y").to_string();
        let html = page(&[(&heading, dish("Tagesgericht 1", title, "Gl"))]);
        self.with_page(canteen, date, html)
    }
}

impl MenuSource for FakeSource {
    fn fetch_page(&self, canteen: Canteen, date: NaiveDate) -> Result<Option<String>, FetchError> {
        self.requests.lock().unwrap().push((canteen, date));
        Ok(self.pages.get(&(canteen, date)).cloned())
    }
}

/// Prefixes texts with the target language and remembers every batch.
/// A batch containing `fail_on` is rejected.
#[derive(Default)]
pub struct RecordingBackend {
    pub batches: Mutex<Vec<Vec<String>>>,
    pub fail_on: Option<&'static str>,
}

impl RecordingBackend {
    pub fn sent(&self) -> Vec<String> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

impl TranslationBackend for RecordingBackend {
    fn translate_batch(
        &self,
        texts: &[String],
        _source: LanguageCode,
        target: LanguageCode,
    ) -> Result<Vec<String>, TranslationError> {
        self.batches.lock().unwrap().push(texts.to_vec());
        if let Some(bad) = self.fail_on {
            if texts.iter().any(|t| t == bad) {
                return Err(TranslationError::Rejected {
                    status: 456,
                    message: "quota exceeded".into(),
                });
            }
        }
        Ok(texts.iter().map(|t| format!("[{}] {t}", target.base_name())).collect())
    }
}
