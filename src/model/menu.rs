use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::canteen::Canteen;
use crate::model::dish::Dish;

/// Version of the published JSON format. Bump on any change of the output shape.
pub const JSON_VERSION: &str = "2.1";

fn json_version() -> String {
    JSON_VERSION.to_string()
}

/// `(ISO year, ISO week)` address of a week artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

impl Day {
    pub fn new(date: NaiveDate, dishes: Vec<Dish>) -> Self {
        Self { date, dishes }
    }
}

/// One canteen's menu for one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WeekDocument", try_from = "WeekDocument")]
pub struct WeekFragment {
    pub canteen: Canteen,
    pub key: WeekKey,
    pub days: BTreeMap<NaiveDate, Day>,
}

impl WeekFragment {
    pub fn new(canteen: Canteen, key: WeekKey) -> Self {
        Self {
            canteen,
            key,
            days: BTreeMap::new(),
        }
    }

    /// Inserts or replaces the day for its date.
    pub fn insert_day(&mut self, day: Day) {
        self.days.insert(day.date, day);
    }

    /// Takes over every day of `other`; days of `other` replace days of the same date.
    pub fn absorb(&mut self, other: WeekFragment) {
        self.days.extend(other.days);
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn dishes_mut(&mut self) -> impl Iterator<Item = &mut Dish> {
        self.days.values_mut().flat_map(|d| d.dishes.iter_mut())
    }

    pub fn dishes(&self) -> impl Iterator<Item = &Dish> {
        self.days.values().flat_map(|d| d.dishes.iter())
    }

    /// Drops every day for which `keep` is false and returns how many were dropped.
    pub fn retain_days(&mut self, mut keep: impl FnMut(NaiveDate) -> bool) -> usize {
        let before = self.days.len();
        self.days.retain(|date, _| keep(*date));
        before - self.days.len()
    }
}

/// Every known week of one canteen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "CombinedDocument", try_from = "CombinedDocument")]
pub struct CombinedMenu {
    pub canteen: Canteen,
    pub weeks: BTreeMap<WeekKey, WeekFragment>,
}

impl CombinedMenu {
    pub fn new(canteen: Canteen) -> Self {
        Self {
            canteen,
            weeks: BTreeMap::new(),
        }
    }

    pub fn week_keys(&self) -> impl Iterator<Item = WeekKey> + '_ {
        self.weeks.keys().copied()
    }

    pub fn days(&self) -> impl Iterator<Item = &Day> {
        self.weeks.values().flat_map(|w| w.days.values())
    }

    pub fn dishes_mut(&mut self) -> impl Iterator<Item = &mut Dish> {
        self.weeks.values_mut().flat_map(|w| w.dishes_mut())
    }

    pub fn dishes(&self) -> impl Iterator<Item = &Dish> {
        self.weeks.values().flat_map(|w| w.dishes())
    }
}

/* ---------------- published documents ---------------- */

/// `<canteen>/<year>/<week>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekDocument {
    #[serde(default = "json_version")]
    pub version: String,
    pub canteen_id: Canteen,
    pub year: i32,
    pub number: u32,
    #[serde(default)]
    pub days: Vec<Day>,
}

/// A week inside `combined.json`; the canteen is given once at the top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedWeek {
    pub year: i32,
    pub number: u32,
    #[serde(default)]
    pub days: Vec<Day>,
}

/// `<canteen>/combined.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedDocument {
    #[serde(default = "json_version")]
    pub version: String,
    pub canteen_id: Canteen,
    #[serde(default)]
    pub weeks: Vec<CombinedWeek>,
}

fn days_from_list(key: WeekKey, list: Vec<Day>) -> Result<BTreeMap<NaiveDate, Day>, String> {
    if !(1..=53).contains(&key.week) {
        return Err(format!("week number {} out of range", key.week));
    }

    let mut days = BTreeMap::new();
    for day in list {
        let date = day.date;
        if days.insert(date, day).is_some() {
            return Err(format!("duplicate day {date} in week {key}"));
        }
    }
    Ok(days)
}

impl From<WeekFragment> for WeekDocument {
    fn from(w: WeekFragment) -> Self {
        Self {
            version: json_version(),
            canteen_id: w.canteen,
            year: w.key.year,
            number: w.key.week,
            days: w.days.into_values().collect(),
        }
    }
}

impl TryFrom<WeekDocument> for WeekFragment {
    type Error = String;

    fn try_from(doc: WeekDocument) -> Result<Self, Self::Error> {
        let key = WeekKey::new(doc.year, doc.number);
        Ok(Self {
            canteen: doc.canteen_id,
            key,
            days: days_from_list(key, doc.days)?,
        })
    }
}

impl From<CombinedMenu> for CombinedDocument {
    fn from(menu: CombinedMenu) -> Self {
        Self {
            version: json_version(),
            canteen_id: menu.canteen,
            weeks: menu
                .weeks
                .into_values()
                .map(|w| CombinedWeek {
                    year: w.key.year,
                    number: w.key.week,
                    days: w.days.into_values().collect(),
                })
                .collect(),
        }
    }
}

impl TryFrom<CombinedDocument> for CombinedMenu {
    type Error = String;

    fn try_from(doc: CombinedDocument) -> Result<Self, Self::Error> {
        let mut weeks = BTreeMap::new();
        for w in doc.weeks {
            let key = WeekKey::new(w.year, w.number);
            let fragment = WeekFragment {
                canteen: doc.canteen_id,
                key,
                days: days_from_list(key, w.days)?,
            };
            if weeks.insert(key, fragment).is_some() {
                return Err(format!("duplicate week {key}"));
            }
        }
        Ok(Self {
            canteen: doc.canteen_id,
            weeks,
        })
    }
}
