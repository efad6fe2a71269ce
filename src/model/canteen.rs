use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Where a canteen publishes its menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provider {
    /// HTML pages of the Studierendenwerk München Oberbayern, keyed by a numeric location id.
    Studentenwerk { url_id: u32 },
    /// Day/meal JSON of the OpenMensa API v2.
    OpenMensa { canteen_id: u32 },
    /// Weekly `;`-separated CSV of the Studierendenwerk Niederbayern/Oberpfalz.
    Stwno { location: &'static str },
}

macro_rules! canteens {
    ($( $variant:ident => ($key:literal, $name:literal, $provider:expr) ),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Canteen {
            $( $variant, )+
        }

        impl Canteen {
            pub const ALL: &'static [Canteen] = &[ $( Canteen::$variant, )+ ];

            /// Stable slug used in URLs and output paths.
            pub fn key(self) -> &'static str {
                match self {
                    $( Canteen::$variant => $key, )+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( Canteen::$variant => $name, )+
                }
            }

            pub fn provider(self) -> Provider {
                match self {
                    $( Canteen::$variant => $provider, )+
                }
            }

            /// Variant name, e.g. `MensaGarching`.
            pub fn enum_name(self) -> &'static str {
                match self {
                    $( Canteen::$variant => stringify!($variant), )+
                }
            }
        }
    };
}

use Provider::{OpenMensa, Studentenwerk, Stwno};

canteens! {
    MensaArcisstr => ("mensa-arcisstr", "Mensa Arcisstraße", Studentenwerk { url_id: 421 }),
    MensaGarching => ("mensa-garching", "Mensa Garching", Studentenwerk { url_id: 422 }),
    MensaLeopoldstr => ("mensa-leopoldstr", "Mensa Leopoldstraße", Studentenwerk { url_id: 411 }),
    MensaLothstr => ("mensa-lothstr", "Mensa Lothstraße", Studentenwerk { url_id: 431 }),
    MensaMartinsried => ("mensa-martinsried", "Mensa Martinsried", Studentenwerk { url_id: 412 }),
    MensaPasing => ("mensa-pasing", "Mensa Pasing", Studentenwerk { url_id: 432 }),
    MensaWeihenstephan => ("mensa-weihenstephan", "Mensa Weihenstephan", Studentenwerk { url_id: 423 }),
    StubistroArcisstr => ("stubistro-arcisstr", "StuBistro Arcisstraße", Studentenwerk { url_id: 450 }),
    StubistroGoethestr => ("stubistro-goethestr", "StuBistro Goethestraße", Studentenwerk { url_id: 418 }),
    StubistroButenandstr => ("stubistro-butenandstr", "StuBistro Butenandtstraße", Studentenwerk { url_id: 414 }),
    StubistroRosenheim => ("stubistro-rosenheim", "StuBistro Rosenheim", Studentenwerk { url_id: 441 }),
    StubistroSchellingstr => ("stubistro-schellingstr", "StuBistro Schellingstraße", Studentenwerk { url_id: 416 }),
    StubistroMartinsried => ("stubistro-martinsried", "StuBistro Martinsried", Studentenwerk { url_id: 415 }),
    StucafeAdalbertstr => ("stucafe-adalbertstr", "StuCafé Adalbertstraße", Studentenwerk { url_id: 512 }),
    StucafeAkademieWeihenstephan => ("stucafe-akademie-weihenstephan", "StuCafé Akademie Weihenstephan", Studentenwerk { url_id: 526 }),
    StucafeBoltzmannstr => ("stucafe-boltzmannstr", "StuCafé Boltzmannstraße", Studentenwerk { url_id: 527 }),
    StucafeConnollystr => ("stucafe-connollystr", "StuCafé Connollystraße", Studentenwerk { url_id: 532 }),
    StucafeGarching => ("stucafe-garching", "StuCafé Garching", Studentenwerk { url_id: 524 }),
    StucafeKarlstr => ("stucafe-karlstr", "StuCafé Karlstraße", Studentenwerk { url_id: 529 }),
    StucafePasing => ("stucafe-pasing", "StuCafé Pasing", Studentenwerk { url_id: 534 }),
    MensaBildungscampusHeilbronn => ("mensa-bildungscampus-heilbronn", "Mensa Bildungscampus Heilbronn", OpenMensa { canteen_id: 277 }),
    MensaStraubing => ("mensa-straubing", "Mensa Straubing", Stwno { location: "HS-SR" }),
}

impl fmt::Display for Canteen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown canteen `{0}`")]
pub struct UnknownCanteen(pub String);

impl FromStr for Canteen {
    type Err = UnknownCanteen;

    /// Accepts the slug (`mensa-garching`) or the enum name (`MENSA_GARCHING`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Canteen::ALL
            .iter()
            .copied()
            .find(|c| {
                c.key().eq_ignore_ascii_case(needle)
                    || screaming_snake(c.enum_name()).eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownCanteen(s.to_string()))
    }
}

impl Canteen {
    /// `MENSA_GARCHING`, as exported in `enums/canteens.json`.
    pub fn constant_name(self) -> String {
        screaming_snake(self.enum_name())
    }
}

fn screaming_snake(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 8);
    for (i, ch) in camel.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

impl Serialize for Canteen {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for Canteen {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slug_and_enum_name() {
        assert_eq!("mensa-garching".parse::<Canteen>(), Ok(Canteen::MensaGarching));
        assert_eq!("MENSA_GARCHING".parse::<Canteen>(), Ok(Canteen::MensaGarching));
        assert_eq!(
            "STUCAFE_AKADEMIE_WEIHENSTEPHAN".parse::<Canteen>(),
            Ok(Canteen::StucafeAkademieWeihenstephan)
        );
        assert!("mensa-atlantis".parse::<Canteen>().is_err());
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = Canteen::ALL.iter().map(|c| c.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Canteen::ALL.len());
    }

    #[test]
    fn serializes_as_slug() {
        let json = serde_json::to_string(&Canteen::MensaLothstr).unwrap();
        assert_eq!(json, "\"mensa-lothstr\"");
        let back: Canteen = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Canteen::MensaLothstr);
    }
}
