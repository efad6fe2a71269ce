//! Published price schedule of the Studierendenwerk, applied when a page
//! carries no prices of its own.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::canteen::Canteen;
use crate::model::dish::{Price, PriceCategory};

type Tier = [i64; 3];

const UNIT: &str = "100g";

/// Base price per dish kind, in cents, for students/staff/guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasePrice {
    VegetarianSoupStew,
    Sausage,
    Meat,
    Fish,
    PizzaVeggie,
    PizzaMeat,
}

impl BasePrice {
    fn cents(self) -> Tier {
        match self {
            BasePrice::VegetarianSoupStew => [0, 0, 0],
            BasePrice::Sausage => [50, 50, 50],
            BasePrice::Meat => [100, 100, 100],
            BasePrice::Fish => [150, 150, 150],
            BasePrice::PizzaVeggie => [450, 500, 600],
            BasePrice::PizzaMeat => [500, 550, 650],
        }
    }
}

/// Price per 100 g at self-service counters, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitPrice {
    Classic,
    SoupStew,
}

impl UnitPrice {
    fn cents(self) -> Tier {
        match self {
            UnitPrice::Classic => [90, 115, 160],
            UnitPrice::SoupStew => [33, 115, 160],
        }
    }
}

/// Fixed counter prices of the canteens that do not weigh their dishes.
fn counter_tier(category: &str) -> Option<Tier> {
    let tier = match category {
        "StudiTopf" | "Studitopf" => [100, 290, 390],
        "Gericht 1" => [295, 390, 510],
        "Gericht 2" => [335, 460, 590],
        "Gericht 3" => [365, 495, 630],
        "Gericht 4" => [415, 530, 670],
        "Gericht 5" => [465, 565, 710],
        "Gericht 6" => [525, 625, 780],
        "Beilage 1" | "Brot" | "Obst" => [80, 105, 150],
        "Beilage 2" => [90, 125, 170],
        "Beilage 3" => [110, 145, 200],
        "Beilage 4" => [160, 180, 260],
        "Pizza - Veggie" => [450, 500, 600],
        "Pizza - Wurst. Schinken. Fisch. Meeresfrüchte" => [500, 550, 650],
        _ => return None,
    };
    Some(tier)
}

fn cents(v: i64) -> Decimal {
    Decimal::new(v, 2)
}

fn fixed(tier: Tier) -> BTreeMap<PriceCategory, Price> {
    PriceCategory::ALL
        .iter()
        .zip(tier)
        .map(|(&c, v)| (c, Price::fixed(cents(v))))
        .collect()
}

fn self_service(base: BasePrice, unit: UnitPrice) -> BTreeMap<PriceCategory, Price> {
    PriceCategory::ALL
        .iter()
        .zip(base.cents().into_iter().zip(unit.cents()))
        .map(|(&c, (b, u))| (c, Price::per_unit(cents(b), cents(u), UNIT)))
        .collect()
}

/// Dish facts the schedule depends on.
pub struct PricingInput<'a> {
    pub title: &'a str,
    pub category: &'a str,
    pub allergens: &'a str,
    /// `data-essen-fleischlos`: `0` meat, `1` vegetarian, `2` vegan.
    pub meatless: &'a str,
}

pub fn scheduled_prices(canteen: Canteen, dish: &PricingInput<'_>) -> BTreeMap<PriceCategory, Price> {
    if matches!(canteen, Canteen::MensaWeihenstephan | Canteen::MensaLothstr) {
        // the salad buffet is weighed even where everything else has a fixed price
        if dish.category == "Salatbuffet" {
            return self_service(BasePrice::VegetarianSoupStew, UnitPrice::Classic);
        }
        return counter_tier(dish.category).map(fixed).unwrap_or_default();
    }

    if dish.category == "Beilagen" {
        return self_service(BasePrice::VegetarianSoupStew, UnitPrice::Classic);
    }

    let has_meat = dish.meatless == "0";

    if dish.category == "Pizza" {
        let base = if has_meat {
            BasePrice::PizzaMeat
        } else {
            BasePrice::PizzaVeggie
        };
        return fixed(base.cents());
    }

    let is_soup = dish.category.eq_ignore_ascii_case("studitopf");
    let unit = if is_soup {
        UnitPrice::SoupStew
    } else {
        UnitPrice::Classic
    };

    let base = if is_soup || !has_meat {
        BasePrice::VegetarianSoupStew
    } else if dish.allergens.split(',').any(|c| c.trim() == "Fi") {
        BasePrice::Fish
    } else {
        let lower = dish.title.to_lowercase();
        if lower.contains("wurst") || lower.contains("würstchen") {
            BasePrice::Sausage
        } else {
            BasePrice::Meat
        }
    };

    self_service(base, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(title: &'a str, category: &'a str, allergens: &'a str, meatless: &'a str) -> PricingInput<'a> {
        PricingInput {
            title,
            category,
            allergens,
            meatless,
        }
    }

    #[test]
    fn meat_dish_at_self_service_counter() {
        let prices = scheduled_prices(
            Canteen::MensaGarching,
            &input("Schweinebraten", "Tagesgericht 1", "Gl", "0"),
        );
        let students = &prices[&PriceCategory::Students];
        assert_eq!(students.base_price.to_string(), "1.00");
        assert_eq!(students.price_per_unit.map(|p| p.to_string()), Some("0.90".into()));
        assert_eq!(students.unit.as_deref(), Some("100g"));
        assert_eq!(prices[&PriceCategory::Guests].price_per_unit.map(|p| p.to_string()), Some("1.60".into()));
    }

    #[test]
    fn fish_and_sausage_bases() {
        let fish = scheduled_prices(Canteen::MensaArcisstr, &input("Lachs", "Aktion", "Fi,Mi", "0"));
        assert_eq!(fish[&PriceCategory::Staff].base_price.to_string(), "1.50");

        let sausage = scheduled_prices(Canteen::MensaArcisstr, &input("Currywurst", "Aktion", "", "0"));
        assert_eq!(sausage[&PriceCategory::Staff].base_price.to_string(), "0.50");
    }

    #[test]
    fn soup_uses_soup_unit_price() {
        let soup = scheduled_prices(Canteen::MensaGarching, &input("Linsensuppe", "Studitopf", "", "0"));
        let students = &soup[&PriceCategory::Students];
        assert_eq!(students.base_price.to_string(), "0.00");
        assert_eq!(students.price_per_unit.map(|p| p.to_string()), Some("0.33".into()));
    }

    #[test]
    fn pizza_is_fixed_price() {
        let pizza = scheduled_prices(Canteen::MensaGarching, &input("Pizza Margherita", "Pizza", "", "1"));
        assert_eq!(pizza[&PriceCategory::Guests].base_price.to_string(), "6.00");
        assert!(pizza[&PriceCategory::Guests].price_per_unit.is_none());
    }

    #[test]
    fn counter_canteens_use_tiers_and_unknown_tiers_are_unpriced() {
        let tier = scheduled_prices(Canteen::MensaLothstr, &input("Nudeln", "Gericht 2", "", "1"));
        assert_eq!(tier[&PriceCategory::Students].base_price.to_string(), "3.35");
        let none = scheduled_prices(Canteen::MensaLothstr, &input("Kuchen", "Dessert", "", "1"));
        assert!(none.is_empty());
    }

    #[test]
    fn salad_buffet_is_weighed_at_counter_canteens() {
        let salad = scheduled_prices(Canteen::MensaWeihenstephan, &input("Salatbuffet", "Salatbuffet", "", "2"));
        let students = &salad[&PriceCategory::Students];
        assert_eq!(students.base_price.to_string(), "0.00");
        assert_eq!(students.price_per_unit.map(|p| p.to_string()), Some("0.90".into()));
        assert_eq!(salad[&PriceCategory::Staff].price_per_unit.map(|p| p.to_string()), Some("1.15".into()));
        assert_eq!(salad[&PriceCategory::Guests].price_per_unit.map(|p| p.to_string()), Some("1.60".into()));
        assert_eq!(salad[&PriceCategory::Guests].unit.as_deref(), Some("100g"));
    }
}
