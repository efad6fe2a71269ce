use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use super::normalize::collapse_whitespace;
use super::ParseContext;
use crate::error::ParseError;
use crate::model::dish::{dedup_dishes, Dish, Price, PriceCategory};
use crate::model::label::{add_supertypes, Label};
use crate::model::menu::{Day, WeekFragment};
use crate::services::week::week_of;

#[derive(Debug, Deserialize)]
struct Meal {
    #[serde(default)]
    name: String,

    #[serde(default)]
    category: String,

    #[serde(default)]
    prices: BTreeMap<String, Option<serde_json::Number>>,

    #[serde(default)]
    notes: Vec<String>,
}

fn note_labels(note: &str) -> &'static [Label] {
    let lower = note.to_lowercase();
    if lower.contains("vegan") {
        &[Label::Vegan]
    } else if lower.contains("vegetarisch") || lower.contains("vegetarian") {
        &[Label::Vegetarian]
    } else if lower.contains("schwein") || lower.contains("pork") {
        &[Label::Pork]
    } else if lower.contains("rind") || lower.contains("beef") {
        &[Label::Beef]
    } else if lower.contains("geflügel") || lower.contains("poultry") {
        &[Label::Poultry]
    } else if lower.contains("fisch") || lower.contains("fish") {
        &[Label::Fish]
    } else {
        &[]
    }
}

/// Parses the OpenMensa meal list of `ctx.date`.
pub fn parse(json: &str, ctx: &ParseContext) -> Result<WeekFragment, ParseError> {
    let mut fragment = WeekFragment::new(ctx.canteen, ctx.week);

    let meals: Vec<Meal> = serde_json::from_str(json).map_err(|e| {
        ParseError::new(ctx.canteen, ctx.date, format!("invalid meal list: {e}"), json)
    })?;

    let key = week_of(ctx.date);
    if key != ctx.week {
        debug!(canteen = %ctx.canteen, date = %ctx.date, week = %key, "skipping day outside requested week");
        return Ok(fragment);
    }

    let mut dishes = Vec::with_capacity(meals.len());
    for meal in meals {
        let title = collapse_whitespace(&meal.name);
        if title.is_empty() {
            warn!(canteen = %ctx.canteen, date = %ctx.date, meal = ?meal, "skipping meal without name");
            continue;
        }

        let mut prices = BTreeMap::new();
        for (role, amount) in meal.prices {
            let Some(amount) = amount else { continue };
            let Some(category) = PriceCategory::from_upstream(&role) else {
                debug!(canteen = %ctx.canteen, role = %role, "dropping price of unmapped role");
                continue;
            };
            match Decimal::from_str(&amount.to_string()) {
                Ok(v) => {
                    prices.insert(category, Price::fixed(v));
                }
                Err(e) => warn!(canteen = %ctx.canteen, role = %role, %amount, "unreadable price: {e}"),
            }
        }

        let mut labels: BTreeSet<Label> = meal
            .notes
            .iter()
            .flat_map(|n| note_labels(n).iter().copied())
            .collect();
        add_supertypes(&mut labels);

        dishes.push(Dish {
            title,
            prices,
            labels,
            category: collapse_whitespace(&meal.category),
        });
    }

    if !dishes.is_empty() {
        fragment.insert_day(Day::new(ctx.date, dedup_dishes(dishes, ctx.dedup)));
    }

    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::canteen::Canteen;
    use crate::model::dish::DedupKey;
    use crate::model::menu::WeekKey;
    use chrono::NaiveDate;

    fn ctx() -> ParseContext {
        ParseContext {
            canteen: Canteen::MensaBildungscampusHeilbronn,
            date: NaiveDate::from_ymd_opt(2024, 7, 30).unwrap(),
            week: WeekKey::new(2024, 31),
            dedup: DedupKey::TitleCategory,
        }
    }

    #[test]
    fn parses_meals_and_maps_price_roles() {
        let json = r#"[
            {"id": 1, "name": "Chili sin Carne", "category": "Hauptgericht",
             "prices": {"students": 3.2, "employees": 4.7, "others": 5.9, "pupils": null},
             "notes": ["vegan", "enthält Sellerie"]},
            {"id": 2, "name": "Schnitzel  vom Schwein", "category": "Hauptgericht",
             "prices": {"students": 4, "employees": null, "others": 6.5, "pupils": 3.5},
             "notes": ["Schweinefleisch"]}
        ]"#;

        let fragment = parse(json, &ctx()).unwrap();
        let day = fragment.days.values().next().unwrap();

        assert_eq!(day.dishes.len(), 2);
        let chili = &day.dishes[0];
        assert_eq!(chili.prices[&PriceCategory::Students].base_price.to_string(), "3.20");
        assert_eq!(chili.prices[&PriceCategory::Staff].base_price.to_string(), "4.70");
        assert_eq!(chili.prices[&PriceCategory::Guests].base_price.to_string(), "5.90");
        assert!(chili.labels.contains(&Label::Vegan));

        let schnitzel = &day.dishes[1];
        assert_eq!(schnitzel.title, "Schnitzel vom Schwein");
        assert_eq!(schnitzel.prices.len(), 2);
        assert!(schnitzel.labels.contains(&Label::Meat));
    }

    #[test]
    fn empty_list_is_a_closed_day() {
        assert!(parse("[]", &ctx()).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse("<html>", &ctx()).unwrap_err();
        assert!(err.reason.contains("invalid meal list"));
    }

    #[test]
    fn nameless_meal_is_skipped() {
        let json = r#"[{"name": " ", "category": "Beilage"}, {"name": "Reis", "category": "Beilage"}]"#;
        let fragment = parse(json, &ctx()).unwrap();
        let day = &fragment.days[&ctx().date];
        assert_eq!(day.dishes.len(), 1);
        assert_eq!(day.dishes[0].title, "Reis");
    }
}
