use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::PublishError;
use crate::model::canteen::{Canteen, Provider};
use crate::model::label::Label;
use crate::model::language::LanguageCode;
use crate::services::publish::{self, Layout};

#[derive(Debug, Serialize)]
struct CanteenRow {
    enum_name: String,
    canteen_id: &'static str,
    name: &'static str,
    provider: Provider,
}

#[derive(Debug, Serialize)]
struct LabelText {
    #[serde(rename = "DE")]
    de: &'static str,
    #[serde(rename = "EN")]
    en: &'static str,
}

#[derive(Debug, Serialize)]
struct LabelRow {
    enum_name: Label,
    abbreviation: &'static str,
    text: LabelText,
}

#[derive(Debug, Serialize)]
struct LanguageRow {
    name: LanguageCode,
    base_name: &'static str,
    label: &'static str,
}

/// Writes `canteens.json`, `labels.json` and `languages.json` into `dir`.
/// Returns how many of them changed.
pub fn export(dir: &Path) -> Result<usize, PublishError> {
    let canteens: Vec<CanteenRow> = Canteen::ALL
        .iter()
        .map(|c| CanteenRow {
            enum_name: c.constant_name(),
            canteen_id: c.key(),
            name: c.name(),
            provider: c.provider(),
        })
        .collect();

    let labels: Vec<LabelRow> = Label::ALL
        .iter()
        .map(|&l| LabelRow {
            enum_name: l,
            abbreviation: l.abbreviation(),
            text: LabelText {
                de: l.text_de(),
                en: l.text_en(),
            },
        })
        .collect();

    let languages: Vec<LanguageRow> = LanguageCode::ALL
        .iter()
        .map(|&l| LanguageRow {
            name: l,
            base_name: l.base_name(),
            label: l.name(),
        })
        .collect();

    let mut changed = 0;
    changed += usize::from(publish::write_json(&dir.join("canteens.json"), &canteens, Layout::Pretty)?);
    changed += usize::from(publish::write_json(&dir.join("labels.json"), &labels, Layout::Pretty)?);
    changed += usize::from(publish::write_json(&dir.join("languages.json"), &languages, Layout::Pretty)?);

    info!(dir = %dir.display(), changed, "enums exported");
    Ok(changed)
}
