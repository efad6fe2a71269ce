use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::label::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceCategory {
    Students,
    Staff,
    Guests,
}

impl PriceCategory {
    pub const ALL: [PriceCategory; 3] = [
        PriceCategory::Students,
        PriceCategory::Staff,
        PriceCategory::Guests,
    ];

    /// Maps the category words used on upstream pages and feeds.
    /// Anything else (e.g. `pupils`) has no counterpart and yields `None`.
    pub fn from_upstream(word: &str) -> Option<Self> {
        match word.trim().to_lowercase().as_str() {
            "studierende" | "studenten" | "student" | "students" => Some(PriceCategory::Students),
            "bedienstete" | "mitarbeiter" | "mitarbeitende" | "employee" | "employees"
            | "staff" => Some(PriceCategory::Staff),
            "gäste" | "gaeste" | "gast" | "guest" | "guests" | "others" | "other" => {
                Some(PriceCategory::Guests)
            }
            _ => None,
        }
    }
}

/// Rounds to cents and forces exactly two fractional digits.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    let mut v = amount.round_dp(2);
    v.rescale(2);
    v
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub base_price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Price {
    pub fn fixed(base_price: Decimal) -> Self {
        Self {
            base_price: normalize_amount(base_price),
            price_per_unit: None,
            unit: None,
        }
    }

    pub fn per_unit(base_price: Decimal, price_per_unit: Decimal, unit: &str) -> Self {
        Self {
            base_price: normalize_amount(base_price),
            price_per_unit: Some(normalize_amount(price_per_unit)),
            unit: Some(unit.to_string()),
        }
    }
}

/// Which fields identify two dish entries of one day as the same dish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    TitleCategory,
    TitleCategoryPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    #[serde(rename = "name")]
    pub title: String,

    #[serde(default)]
    pub prices: BTreeMap<PriceCategory, Price>,

    #[serde(default)]
    pub labels: BTreeSet<Label>,

    #[serde(rename = "dish_type", default)]
    pub category: String,
}

impl Dish {
    pub fn same_dish(&self, other: &Dish, key: DedupKey) -> bool {
        let base = self.title == other.title && self.category == other.category;
        match key {
            DedupKey::TitleCategory => base,
            DedupKey::TitleCategoryPrice => base && self.prices == other.prices,
        }
    }

    /// Folds a repeated entry into this one: labels are united, prices of
    /// this entry win and only missing categories are taken from `other`.
    pub fn absorb_duplicate(&mut self, other: Dish) {
        self.labels.extend(other.labels);
        for (category, price) in other.prices {
            self.prices.entry(category).or_insert(price);
        }
    }
}

/// Collapses repeated dishes, keeping the position of the first occurrence.
pub fn dedup_dishes(dishes: Vec<Dish>, key: DedupKey) -> Vec<Dish> {
    let mut out: Vec<Dish> = Vec::with_capacity(dishes.len());

    for dish in dishes {
        match out.iter_mut().find(|d| d.same_dish(&dish, key)) {
            Some(existing) => existing.absorb_duplicate(dish),
            None => out.push(dish),
        }
    }

    out
}
