//! OpenMensa feed v2.1 rendering of a canteen's menu.

use quick_xml::se::Serializer;
use serde::Serialize;

use crate::error::PublishError;
use crate::model::dish::{Dish, PriceCategory};
use crate::model::menu::{CombinedMenu, Day};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const XMLNS: &str = "http://openmensa.org/open-mensa-v2";
const FEED_VERSION: &str = "2.1";

/// Category used for dishes that carry none.
const DEFAULT_CATEGORY: &str = "Speiseplan";

#[derive(Debug, Serialize)]
struct Feed {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    canteen: FeedCanteen,
}

#[derive(Debug, Serialize)]
struct FeedCanteen {
    day: Vec<FeedDay>,
}

#[derive(Debug, Serialize)]
struct FeedDay {
    #[serde(rename = "@date")]
    date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    closed: Option<()>,
    category: Vec<FeedCategory>,
}

#[derive(Debug, Serialize)]
struct FeedCategory {
    #[serde(rename = "@name")]
    name: String,
    meal: Vec<FeedMeal>,
}

#[derive(Debug, Serialize)]
struct FeedMeal {
    name: String,
    note: Vec<String>,
    price: Vec<FeedPrice>,
}

#[derive(Debug, Serialize)]
struct FeedPrice {
    #[serde(rename = "@role")]
    role: &'static str,
    #[serde(rename = "$text")]
    amount: String,
}

fn role(category: PriceCategory) -> &'static str {
    match category {
        PriceCategory::Students => "student",
        PriceCategory::Staff => "employee",
        PriceCategory::Guests => "other",
    }
}

fn meal(dish: &Dish) -> FeedMeal {
    let mut note: Vec<String> = dish.labels.iter().map(|l| l.text_de().to_string()).collect();
    let mut price = Vec::with_capacity(dish.prices.len());

    for (category, p) in &dish.prices {
        price.push(FeedPrice {
            role: role(*category),
            amount: p.base_price.to_string(),
        });
        // the feed has no per-unit prices; keep them readable as a note
        if let (Some(per_unit), Some(unit)) = (p.price_per_unit, p.unit.as_deref()) {
            note.push(format!("{}: {per_unit} € / {unit}", role(*category)));
        }
    }

    FeedMeal {
        name: dish.title.clone(),
        note,
        price,
    }
}

fn day(day: &Day) -> FeedDay {
    let mut categories: Vec<FeedCategory> = Vec::new();

    for dish in &day.dishes {
        let name = if dish.category.is_empty() {
            DEFAULT_CATEGORY
        } else {
            dish.category.as_str()
        };
        match categories.iter_mut().find(|c| c.name == name) {
            Some(c) => c.meal.push(meal(dish)),
            None => categories.push(FeedCategory {
                name: name.to_string(),
                meal: vec![meal(dish)],
            }),
        }
    }

    FeedDay {
        date: day.date.format("%Y-%m-%d").to_string(),
        closed: categories.is_empty().then_some(()),
        category: categories,
    }
}

/// Renders every day of `menu` as an OpenMensa feed document.
pub fn render(menu: &CombinedMenu) -> Result<String, PublishError> {
    let feed = Feed {
        version: FEED_VERSION,
        xmlns: XMLNS,
        canteen: FeedCanteen {
            day: menu.days().map(day).collect(),
        },
    };

    // unindented: quick-xml's indent would put price text on its own line
    let mut buffer = String::new();
    let serializer = Serializer::with_root(&mut buffer, Some("openmensa"))
        .map_err(|e| PublishError::Feed(e.to_string()))?;
    feed.serialize(serializer)
        .map_err(|e| PublishError::Feed(e.to_string()))?;

    Ok(format!("{XML_DECLARATION}\n{buffer}\n"))
}
