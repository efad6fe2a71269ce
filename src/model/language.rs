use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageCode {
    De,
    En,
    Fr,
    Es,
    It,
    Nl,
    Pl,
    Pt,
    Ru,
    Tr,
    Uk,
    Zh,
    Ja,
    Ko,
}

impl LanguageCode {
    pub const ALL: &'static [LanguageCode] = &[
        LanguageCode::De,
        LanguageCode::En,
        LanguageCode::Fr,
        LanguageCode::Es,
        LanguageCode::It,
        LanguageCode::Nl,
        LanguageCode::Pl,
        LanguageCode::Pt,
        LanguageCode::Ru,
        LanguageCode::Tr,
        LanguageCode::Uk,
        LanguageCode::Zh,
        LanguageCode::Ja,
        LanguageCode::Ko,
    ];

    /// Lower-case code, used as directory name of a translated tree.
    pub fn base_name(self) -> &'static str {
        match self {
            LanguageCode::De => "de",
            LanguageCode::En => "en",
            LanguageCode::Fr => "fr",
            LanguageCode::Es => "es",
            LanguageCode::It => "it",
            LanguageCode::Nl => "nl",
            LanguageCode::Pl => "pl",
            LanguageCode::Pt => "pt",
            LanguageCode::Ru => "ru",
            LanguageCode::Tr => "tr",
            LanguageCode::Uk => "uk",
            LanguageCode::Zh => "zh",
            LanguageCode::Ja => "ja",
            LanguageCode::Ko => "ko",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LanguageCode::De => "Deutsch",
            LanguageCode::En => "English",
            LanguageCode::Fr => "Français",
            LanguageCode::Es => "Español",
            LanguageCode::It => "Italiano",
            LanguageCode::Nl => "Nederlands",
            LanguageCode::Pl => "Polski",
            LanguageCode::Pt => "Português",
            LanguageCode::Ru => "Русский",
            LanguageCode::Tr => "Türkçe",
            LanguageCode::Uk => "Українська",
            LanguageCode::Zh => "中文",
            LanguageCode::Ja => "日本語",
            LanguageCode::Ko => "한국어",
        }
    }

    /// Code DeepL expects as `source_lang`.
    pub fn deepl_source(self) -> &'static str {
        match self {
            LanguageCode::De => "DE",
            LanguageCode::En => "EN",
            LanguageCode::Fr => "FR",
            LanguageCode::Es => "ES",
            LanguageCode::It => "IT",
            LanguageCode::Nl => "NL",
            LanguageCode::Pl => "PL",
            LanguageCode::Pt => "PT",
            LanguageCode::Ru => "RU",
            LanguageCode::Tr => "TR",
            LanguageCode::Uk => "UK",
            LanguageCode::Zh => "ZH",
            LanguageCode::Ja => "JA",
            LanguageCode::Ko => "KO",
        }
    }

    /// Code DeepL expects as `target_lang`; some languages require a regional variant.
    pub fn deepl_target(self) -> &'static str {
        match self {
            LanguageCode::En => "EN-US",
            LanguageCode::Pt => "PT-PT",
            other => other.deepl_source(),
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.deepl_source())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language `{0}`")]
pub struct UnknownLanguage(pub String);

impl FromStr for LanguageCode {
    type Err = UnknownLanguage;

    /// Accepts `en`, `EN` and regional variants such as `EN-US`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s.trim().split(['-', '_']).next().unwrap_or("");
        LanguageCode::ALL
            .iter()
            .copied()
            .find(|l| l.base_name().eq_ignore_ascii_case(primary))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.deepl_source())
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
