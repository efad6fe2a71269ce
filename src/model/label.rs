use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

macro_rules! labels {
    ($( $variant:ident => ($abbr:literal, $de:literal, $en:literal) ),+ $(,)?) => {
        /// Allergen, additive and diet markers a dish can carry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum Label {
            $( $variant, )+
        }

        impl Label {
            pub const ALL: &'static [Label] = &[ $( Label::$variant, )+ ];

            pub fn abbreviation(self) -> &'static str {
                match self {
                    $( Label::$variant => $abbr, )+
                }
            }

            pub fn text_de(self) -> &'static str {
                match self {
                    $( Label::$variant => $de, )+
                }
            }

            pub fn text_en(self) -> &'static str {
                match self {
                    $( Label::$variant => $en, )+
                }
            }
        }
    };
}

labels! {
    Gluten => ("🌾", "Gluten", "Gluten"),
    Wheat => ("GlW", "Weizen", "Wheat"),
    Rye => ("GlR", "Roggen", "Rye"),
    Barley => ("GlG", "Gerste", "Barley"),
    Oat => ("GlH", "Hafer", "Oat"),
    Spelt => ("GlD", "Dinkel", "Spelt"),
    Hybrids => ("GlHy", "Hybridstämme", "Hybrid strains"),
    Shellfish => ("🦀", "Krebstiere", "Shellfish"),
    ChickenEggs => ("🥚", "Eier", "Eggs"),
    Fish => ("🐟", "Fisch", "Fish"),
    Peanuts => ("🥜", "Erdnüsse", "Peanuts"),
    Soy => ("So", "Soja", "Soy"),
    Milk => ("🥛", "Milch", "Milk"),
    Lactose => ("La", "Laktose", "Lactose"),
    ShellFruits => ("🌰", "Schalenfrüchte", "Shell fruits"),
    Almonds => ("ScM", "Mandeln", "Almonds"),
    Hazelnuts => ("ScH", "Haselnüsse", "Hazelnuts"),
    Walnuts => ("ScW", "Walnüsse", "Walnuts"),
    Cashews => ("ScC", "Cashewnüsse", "Cashews"),
    Pecan => ("ScP", "Pekannüsse", "Pecans"),
    Pistachios => ("ScPi", "Pistazien", "Pistachios"),
    Macadamia => ("ScMa", "Macadamianüsse", "Macadamias"),
    Celery => ("Sl", "Sellerie", "Celery"),
    Mustard => ("Sf", "Senf", "Mustard"),
    Sesame => ("Se", "Sesam", "Sesame"),
    Sulphurs => ("Sw", "Schwefel", "Sulphurs"),
    Sulfites => ("Sfi", "Sulfite", "Sulfites"),
    Lupin => ("Lu", "Lupinen", "Lupin"),
    Molluscs => ("🐙", "Weichtiere", "Molluscs"),
    Bavaria => ("GQB", "Geprüfte Qualität Bayern", "Certified Quality Bavaria"),
    Msc => ("🎣", "Marine Stewardship Council", "Marine Stewardship Council"),
    Dyestuff => ("1", "Farbstoff", "Dyestuff"),
    Preservatives => ("2", "Konservierungsstoffe", "Preservatives"),
    Antioxidants => ("3", "Antioxidationsmittel", "Antioxidants"),
    FlavorEnhancer => ("4", "Geschmacksverstärker", "Flavor enhancer"),
    Waxed => ("7", "gewachst", "Waxed"),
    Phosphates => ("8", "Phosphate", "Phosphates"),
    Sweeteners => ("9", "Süßungsmittel", "Sweeteners"),
    Phenylalanine => ("10", "Phenylalaninquelle", "Source of phenylalanine"),
    CocoaContainingGrease => ("13", "kakaohaltige Fettglasur", "Cocoa-containing grease"),
    Gelatin => ("14", "Gelatine", "Gelatin"),
    Alcohol => ("🍷", "Alkohol", "Alcohol"),
    Pork => ("🐖", "Schweinefleisch", "Pork"),
    Beef => ("🐄", "Rindfleisch", "Beef"),
    Veal => ("🐂", "Kalbfleisch", "Veal"),
    WildMeat => ("🐗", "Wildfleisch", "Wild meat"),
    Lamb => ("🐑", "Lammfleisch", "Lamb"),
    Poultry => ("🐔", "Geflügel", "Poultry"),
    Garlic => ("🧄", "Knoblauch", "Garlic"),
    Meat => ("🍖", "Fleisch", "Meat"),
    Vegetarian => ("🥕", "Vegetarisch", "Vegetarian"),
    Vegan => ("🌱", "Vegan", "Vegan"),
}

impl Label {
    /// Broader labels implied by this one, e.g. wheat contains gluten.
    fn supertypes(self) -> &'static [Label] {
        use Label::*;

        match self {
            Wheat | Rye | Barley | Oat | Spelt | Hybrids => &[Gluten],
            Almonds | Hazelnuts | Walnuts | Cashews | Pecan | Pistachios | Macadamia => {
                &[ShellFruits]
            }
            Pork | Beef | Veal | WildMeat | Lamb | Poultry => &[Meat],
            _ => &[],
        }
    }
}

/// Adds every label implied by a member of `labels`.
pub fn add_supertypes(labels: &mut BTreeSet<Label>) {
    let implied: Vec<Label> = labels
        .iter()
        .flat_map(|l| l.supertypes().iter().copied())
        .collect();
    labels.extend(implied);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supertypes_are_added() {
        let mut labels = BTreeSet::from([Label::Wheat, Label::Walnuts, Label::Beef]);
        add_supertypes(&mut labels);
        assert!(labels.contains(&Label::Gluten));
        assert!(labels.contains(&Label::ShellFruits));
        assert!(labels.contains(&Label::Meat));
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn serializes_screaming_snake() {
        let json = serde_json::to_string(&Label::ChickenEggs).unwrap();
        assert_eq!(json, "\"CHICKEN_EGGS\"");
    }
}
