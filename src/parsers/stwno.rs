use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::normalize::{collapse_whitespace, split_codes};
use super::ParseContext;
use crate::error::ParseError;
use crate::model::dish::{dedup_dishes, Dish, Price, PriceCategory};
use crate::model::label::{add_supertypes, Label};
use crate::model::menu::{Day, WeekFragment};
use crate::services::week::week_of;

// datum;tag;warengruppe;name;kennz;preis;stud;bed;gast
const COL_DATE: usize = 0;
const COL_TYPE: usize = 2;
const COL_NAME: usize = 3;
const COL_MARKS: usize = 4;
const COL_PRICES: [(usize, PriceCategory); 3] = [
    (6, PriceCategory::Students),
    (7, PriceCategory::Staff),
    (8, PriceCategory::Guests),
];

/// Codes in the bracketed suffix of a dish name.
fn label_code(code: &str) -> Option<&'static [Label]> {
    use Label::*;

    let labels: &'static [Label] = match code {
        "1" | "6" => &[Dyestuff],
        "2" => &[Preservatives],
        "3" => &[Antioxidants],
        "4" => &[FlavorEnhancer],
        "5" => &[Sulphurs],
        "7" => &[Waxed],
        "8" => &[Phosphates],
        "9" => &[Sweeteners],
        "10" | "17" => &[Phenylalanine],
        "16" => &[Sulfites],
        "AA" => &[Wheat],
        "AB" => &[Rye],
        "AC" => &[Barley],
        "AD" => &[Oat],
        "AE" => &[Spelt],
        "AF" => &[Gluten],
        "B" => &[Shellfish],
        "C" => &[ChickenEggs],
        "D" => &[Fish],
        "E" => &[Peanuts],
        "F" => &[Soy],
        "G" => &[Milk],
        "HA" => &[Almonds],
        "HB" => &[Hazelnuts],
        "HC" => &[Walnuts],
        "HD" => &[Cashews],
        "HE" => &[Pecan],
        "HG" => &[Pistachios],
        "HH" => &[Macadamia],
        "I" => &[Celery],
        "J" => &[Mustard],
        "K" => &[Sesame],
        "L" => &[Sulphurs, Sulfites],
        "M" => &[Lupin],
        "N" => &[Molluscs],
        _ => return None,
    };
    Some(labels)
}

/// Diet and meat marks of the `kennz` column.
fn mark(code: &str) -> Option<&'static [Label]> {
    use Label::*;

    let labels: &'static [Label] = match code {
        "VG" => &[Vegan, Vegetarian],
        "V" => &[Vegetarian],
        "G" => &[Poultry],
        "S" => &[Pork],
        "A" => &[Alcohol],
        "F" => &[Fish],
        "R" => &[Beef],
        "L" => &[Lamb],
        "W" => &[WildMeat],
        _ => return None,
    };
    Some(labels)
}

fn row_text(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(";")
}

/// Parses one weekly CSV file into the fragment of `ctx.week`.
///
/// The file carries no year in its name, so rows are placed by their own
/// date and rows of other weeks are skipped.
pub fn parse(text: &str, ctx: &ParseContext) -> Result<WeekFragment, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut days: BTreeMap<NaiveDate, Vec<Dish>> = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseError::new(ctx.canteen, ctx.date, format!("invalid csv: {e}"), text))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() <= COL_PRICES[2].0 {
            return Err(ParseError::new(
                ctx.canteen,
                ctx.date,
                format!("row with {} columns", record.len()),
                &row_text(&record),
            ));
        }

        let raw_date = record[COL_DATE].trim();
        let date = NaiveDate::parse_from_str(raw_date, "%d.%m.%Y").map_err(|_| {
            ParseError::new(ctx.canteen, ctx.date, format!("invalid date `{raw_date}`"), &row_text(&record))
        })?;
        let key = week_of(date);
        if key != ctx.week {
            debug!(canteen = %ctx.canteen, %date, week = %key, "skipping row outside requested week");
            continue;
        }

        if let Some(dish) = parse_row(&record, date, ctx) {
            days.entry(date).or_default().push(dish);
        }
    }

    let mut fragment = WeekFragment::new(ctx.canteen, ctx.week);
    for (date, dishes) in days {
        fragment.insert_day(Day::new(date, dedup_dishes(dishes, ctx.dedup)));
    }
    Ok(fragment)
}

fn parse_row(record: &StringRecord, date: NaiveDate, ctx: &ParseContext) -> Option<Dish> {
    let mut name = record[COL_NAME].trim();
    let mut labels = BTreeSet::new();

    if let Some(open) = name.rfind('(') {
        let codes = name[open..].trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
        for code in split_codes(codes) {
            match label_code(code) {
                Some(found) => labels.extend(found.iter().copied()),
                None => warn!(canteen = %ctx.canteen, %date, code, "dropping unknown label code"),
            }
        }
        name = &name[..open];
    }

    let title = collapse_whitespace(name);
    if title.is_empty() {
        warn!(canteen = %ctx.canteen, %date, row = %row_text(record), "skipping row without dish name");
        return None;
    }

    for code in split_codes(&record[COL_MARKS]) {
        match mark(code) {
            Some(found) => labels.extend(found.iter().copied()),
            None => warn!(canteen = %ctx.canteen, %date, code, dish = %title, "dropping unknown mark"),
        }
    }
    add_supertypes(&mut labels);

    let mut prices = BTreeMap::new();
    for (col, category) in COL_PRICES {
        let raw = record[col].trim();
        if raw.is_empty() {
            continue;
        }
        match Decimal::from_str(&raw.replace(',', ".")) {
            Ok(v) => {
                prices.insert(category, Price::fixed(v));
            }
            Err(e) => warn!(canteen = %ctx.canteen, %date, price = raw, dish = %title, "unreadable price: {e}"),
        }
    }

    Some(Dish {
        title,
        prices,
        labels,
        category: collapse_whitespace(&record[COL_TYPE]),
    })
}
