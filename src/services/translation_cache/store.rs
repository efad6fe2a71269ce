use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use super::model::CacheEntry;
use crate::error::CacheIoError;
use crate::services::publish::replace_file;

/// Reads the cache file. A missing file is an empty cache.
pub fn load(path: &Path) -> Result<Vec<CacheEntry>, CacheIoError> {
    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no translation cache yet");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(CacheIoError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let entries: Vec<CacheEntry> =
        serde_json::from_slice(&data).map_err(|source| CacheIoError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    let (entries, removed) = dedup(entries);
    if removed > 0 {
        warn!(path = %path.display(), removed, "dropped duplicate or empty cache entries");
    }
    Ok(entries)
}

/// Rewrites the whole cache file atomically, sorted by target language and original.
pub fn save(path: &Path, entries: &[CacheEntry]) -> Result<(), CacheIoError> {
    let mut v = entries.to_vec();
    sort_entries(&mut v);

    let mut json = serde_json::to_vec_pretty(&v).map_err(|source| CacheIoError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    json.push(b'\n');

    replace_file(path, &json).map_err(|source| CacheIoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Keeps the first non-empty translation per (target language, original).
fn dedup(entries: Vec<CacheEntry>) -> (Vec<CacheEntry>, usize) {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    let mut removed = 0usize;

    for e in entries {
        if e.translation.trim().is_empty() || !seen.insert((e.target_lang, e.original.clone())) {
            removed += 1;
            continue;
        }
        out.push(e);
    }

    (out, removed)
}

fn sort_entries(entries: &mut [CacheEntry]) {
    entries.sort_by(|a, b| {
        (a.target_lang.deepl_source(), a.original.as_str())
            .cmp(&(b.target_lang.deepl_source(), b.original.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::language::LanguageCode;

    fn entry(original: &str, lang: LanguageCode, translation: &str) -> CacheEntry {
        CacheEntry {
            original: original.into(),
            target_lang: lang,
            translation: translation.into(),
        }
    }

    #[test]
    fn saved_file_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.json");
        save(
            &path,
            &[
                entry("Suppe", LanguageCode::Fr, "Soupe"),
                entry("Suppe", LanguageCode::En, "Soup"),
                entry("Apfel", LanguageCode::En, "Apple"),
            ],
        )
        .unwrap();

        let loaded = load(&path).unwrap();
        let order: Vec<_> = loaded.iter().map(|e| e.translation.as_str()).collect();
        assert_eq!(order, vec!["Apple", "Soup", "Soupe"]);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""target_lang": "EN""#));
    }

    #[test]
    fn duplicates_and_blank_translations_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.json");
        fs::write(
            &path,
            r#"[{"original":"Reis","target_lang":"EN","translation":"Rice"},
                {"original":"Reis","target_lang":"EN","translation":"Rice (long grain)"},
                {"original":"Brot","target_lang":"EN","translation":"  "}]"#,
        )
        .unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, vec![entry("Reis", LanguageCode::En, "Rice")]);
    }

    #[test]
    fn missing_file_is_empty_and_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).unwrap().is_empty());

        let path = dir.path().join("bad.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(load(&path), Err(CacheIoError::Corrupt { .. })));
    }
}
