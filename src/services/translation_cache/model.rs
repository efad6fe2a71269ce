use serde::{Deserialize, Serialize};

use crate::model::language::LanguageCode;

/// One persisted mapping of a source title to its translation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub original: String,
    pub target_lang: LanguageCode,
    pub translation: String,
}
