use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::normalize::{collapse_whitespace, split_codes};
use super::studentenwerk_prices::{scheduled_prices, PricingInput};
use super::ParseContext;
use crate::error::ParseError;
use crate::model::dish::{dedup_dishes, Dish, Price, PriceCategory};
use crate::model::label::{add_supertypes, Label};
use crate::model::menu::{Day, WeekFragment};
use crate::services::week::week_of;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector `{css}`: {e}"))
}

static SCHEDULE_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("div.c-schedule__item"));
static DATE_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("strong"));
// document order matters: a type heading applies to every dish entry after it
static TYPE_OR_DISH: LazyLock<Selector> =
    LazyLock::new(|| selector("span.stwm-artname, li.c-menu-dish-list__item"));
static DISH_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("p.c-menu-dish__title"));
static DISH_PRICE: LazyLock<Selector> =
    LazyLock::new(|| selector(".c-menu-dish__price, .stwm-price"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("valid date regex"));
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-zÄÖÜäöüß]+)\s*:?\s*(\d+(?:[.,]\d{1,2})?)\s*€").expect("valid price regex")
});

const ATTR_ADDITIVES: &str = "data-essen-zusatz";
const ATTR_ALLERGENS: &str = "data-essen-allergene";
const ATTR_TYPE: &str = "data-essen-typ";
const ATTR_MEATLESS: &str = "data-essen-fleischlos";

/// Marker codes used in the `data-essen-*` attributes.
fn label_code(code: &str) -> Option<&'static [Label]> {
    use Label::*;

    let labels: &'static [Label] = match code {
        "GQB" => &[Bavaria],
        "MSC" => &[Msc],
        "1" | "6" => &[Dyestuff],
        "2" => &[Preservatives],
        "3" => &[Antioxidants],
        "4" => &[FlavorEnhancer],
        "5" => &[Sulphurs],
        "7" => &[Waxed],
        "8" => &[Phosphates],
        "9" | "11" => &[Sweeteners],
        "10" => &[Phenylalanine],
        "13" => &[CocoaContainingGrease],
        "14" => &[Gelatin],
        "99" => &[Alcohol],
        "f" => &[Vegetarian],
        "v" => &[Vegan],
        "S" => &[Pork],
        "R" => &[Beef],
        "K" => &[Veal],
        "G" => &[Poultry],
        "L" => &[Lamb],
        "W" => &[WildMeat],
        "Kn" => &[Garlic],
        "Ei" => &[ChickenEggs],
        "En" => &[Peanuts],
        "Fi" => &[Fish],
        "Gl" => &[Gluten],
        "GlW" => &[Wheat],
        "GlR" => &[Rye],
        "GlG" => &[Barley],
        "GlH" => &[Oat],
        "GlD" => &[Spelt],
        "Kr" => &[Shellfish],
        "Lu" => &[Lupin],
        "Mi" => &[Milk, Lactose],
        "Sc" => &[ShellFruits],
        "ScM" => &[Almonds],
        "ScH" => &[Hazelnuts],
        "ScW" => &[Walnuts],
        "ScC" => &[Cashews],
        "ScP" => &[Pistachios],
        "Se" => &[Sesame],
        "Sf" => &[Mustard],
        "Sl" => &[Celery],
        "So" => &[Soy],
        "Sw" => &[Sulphurs, Sulfites],
        "Wt" => &[Molluscs],
        _ => return None,
    };
    Some(labels)
}

/// Parses a Studierendenwerk menu page into the fragment of `ctx.week`.
pub fn parse(html: &str, ctx: &ParseContext) -> Result<WeekFragment, ParseError> {
    let document = Html::parse_document(html);
    let mut fragment = WeekFragment::new(ctx.canteen, ctx.week);

    let mut items = 0usize;
    for item in document.select(&SCHEDULE_ITEM) {
        items += 1;

        let date = schedule_date(item, ctx)?;
        let key = week_of(date);
        if key != ctx.week {
            debug!(canteen = %ctx.canteen, %date, week = %key, "skipping day outside requested week");
            continue;
        }

        let dishes = parse_dishes(item, date, ctx);
        fragment.insert_day(Day::new(date, dedup_dishes(dishes, ctx.dedup)));
    }

    if items == 0 {
        debug!(canteen = %ctx.canteen, date = %ctx.date, "no schedule on page, treating as closed");
    }

    Ok(fragment)
}

fn schedule_date(item: ElementRef<'_>, ctx: &ParseContext) -> Result<NaiveDate, ParseError> {
    let heading = item
        .select(&DATE_HEADING)
        .next()
        .map(|h| h.text().collect::<String>())
        .unwrap_or_default();

    let caps = DATE_RE
        .captures(&heading)
        .ok_or_else(|| ParseError::new(ctx.canteen, ctx.date, "schedule item without date", &item.html()))?;

    let (d, m, y) = (&caps[1], &caps[2], &caps[3]);
    let date = match (d.parse::<u32>(), m.parse::<u32>(), y.parse::<i32>()) {
        (Ok(d), Ok(m), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };

    date.ok_or_else(|| {
        ParseError::new(
            ctx.canteen,
            ctx.date,
            format!("invalid date `{}`", &caps[0]),
            &heading,
        )
    })
}

fn parse_dishes(item: ElementRef<'_>, date: NaiveDate, ctx: &ParseContext) -> Vec<Dish> {
    let mut dishes = Vec::new();
    let mut current_type = String::new();

    for el in item.select(&TYPE_OR_DISH) {
        if el.value().name() == "span" {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                current_type = text;
            }
            continue;
        }

        dishes.extend(parse_dish(el, &current_type, date, ctx));
    }

    dishes
}

/// `None` for an entry without title; the rest of the day is kept.
fn parse_dish(el: ElementRef<'_>, category: &str, date: NaiveDate, ctx: &ParseContext) -> Option<Dish> {
    let title = el
        .select(&DISH_TITLE)
        .next()
        .map(title_text)
        .unwrap_or_default();

    if title.is_empty() {
        let skipped = ParseError::new(ctx.canteen, date, "dish without title", &el.html());
        warn!(canteen = %ctx.canteen, %date, "{skipped}, skipping dish");
        return None;
    }

    let attr = |name: &str| el.value().attr(name).unwrap_or("");

    let mut labels = BTreeSet::new();
    for raw in [attr(ATTR_ADDITIVES), attr(ATTR_ALLERGENS), attr(ATTR_TYPE)] {
        for code in split_codes(raw) {
            match label_code(code) {
                Some(found) => labels.extend(found.iter().copied()),
                None => warn!(canteen = %ctx.canteen, %date, code, dish = %title, "dropping unknown label code"),
            }
        }
    }
    add_diet(&mut labels, attr(ATTR_MEATLESS));
    add_supertypes(&mut labels);

    let mut prices = text_prices(el, ctx, date);
    if prices.is_empty() {
        prices = scheduled_prices(
            ctx.canteen,
            &PricingInput {
                title: &title,
                category,
                allergens: attr(ATTR_ALLERGENS),
                meatless: attr(ATTR_MEATLESS),
            },
        );
    }

    Some(Dish {
        title,
        prices,
        labels,
        category: category.to_string(),
    })
}

/// Text directly inside the title paragraph; nested marker spans are ignored.
fn title_text(p: ElementRef<'_>) -> String {
    let own: String = p
        .children()
        .filter_map(|n| n.value().as_text())
        .map(|t| &**t)
        .collect::<Vec<&str>>()
        .join(" ");

    let own = collapse_whitespace(&own);
    if own.is_empty() {
        collapse_whitespace(&p.text().collect::<String>())
    } else {
        own
    }
}

fn add_diet(labels: &mut BTreeSet<Label>, marker: &str) {
    match marker.trim() {
        "0" => {
            if !labels.contains(&Label::Fish) {
                labels.insert(Label::Meat);
            }
        }
        "1" => {
            labels.insert(Label::Vegetarian);
        }
        "2" => {
            labels.insert(Label::Vegan);
        }
        _ => {}
    }
}

/// Prices printed on the page, e.g. `Studierende: 2,95 €`.
fn text_prices(el: ElementRef<'_>, ctx: &ParseContext, date: NaiveDate) -> BTreeMap<PriceCategory, Price> {
    let mut prices = BTreeMap::new();

    for node in el.select(&DISH_PRICE) {
        let text = collapse_whitespace(&node.text().collect::<String>());
        for caps in PRICE_RE.captures_iter(&text) {
            let word = &caps[1];
            let Some(category) = PriceCategory::from_upstream(word) else {
                warn!(canteen = %ctx.canteen, %date, category = word, "dropping price of unknown category");
                continue;
            };
            match Decimal::from_str(&caps[2].replace(',', ".")) {
                Ok(amount) => {
                    prices.entry(category).or_insert_with(|| Price::fixed(amount));
                }
                Err(e) => warn!(canteen = %ctx.canteen, %date, price = &caps[2], "unreadable price: {e}"),
            }
        }
    }

    prices
}
