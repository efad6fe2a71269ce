use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PublishError, TranslationError};
use crate::model::dish::Dish;
use crate::model::language::LanguageCode;
use crate::model::menu::{CombinedMenu, WeekFragment};
use crate::services::deepl::{TranslationBackend, MAX_BATCH};
use crate::services::publish::{self, Layout, COMBINED_FILE};
use crate::services::translation_cache::TranslationCache;

/// Translates dish titles through a cache, asking the backend only for
/// titles the cache does not know yet.
pub struct Translator<'a> {
    backend: &'a dyn TranslationBackend,
    source: LanguageCode,
    batch_size: usize,
    concurrency: usize,
}

impl<'a> Translator<'a> {
    pub fn new(backend: &'a dyn TranslationBackend, source: LanguageCode) -> Self {
        Self {
            backend,
            source,
            batch_size: MAX_BATCH,
            concurrency: 2,
        }
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.clamp(1, MAX_BATCH);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn source(&self) -> LanguageCode {
        self.source
    }

    /// Makes sure every text has a cached translation into `target`.
    ///
    /// Distinct unknown texts are sent in batches by up to `concurrency`
    /// workers; this thread is the only one writing to the cache. When a
    /// batch fails no further batches are started, the ones already
    /// translated stay cached, and the first error is returned.
    ///
    /// Returns how many texts were sent.
    pub fn prefetch<'t>(
        &self,
        cache: &mut TranslationCache,
        target: LanguageCode,
        texts: impl IntoIterator<Item = &'t str>,
    ) -> Result<usize, TranslationError> {
        if target == self.source {
            return Ok(0);
        }

        let pending: Vec<String> = texts
            .into_iter()
            .filter(|t| !t.trim().is_empty() && cache.get(target, t).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        if pending.is_empty() {
            debug!(target = %target, "all titles cached");
            return Ok(0);
        }

        let batches: Vec<&[String]> = pending.chunks(self.batch_size).collect();
        let workers = self.concurrency.min(batches.len());
        info!(
            target = %target,
            texts = pending.len(),
            batches = batches.len(),
            workers,
            "requesting translations"
        );

        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, Result<Vec<String>, TranslationError>)>();
        let mut first_err: Option<TranslationError> = None;

        thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let (batches, next, failed) = (&batches, &next, &failed);
                s.spawn(move || loop {
                    if failed.load(Ordering::Relaxed) {
                        break;
                    }
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(batch) = batches.get(i) else { break };

                    let res = self.backend.translate_batch(batch, self.source, target);
                    if res.is_err() {
                        failed.store(true, Ordering::Relaxed);
                    }
                    if tx.send((i, res)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (i, res) in rx {
                match res {
                    Ok(translations) => {
                        for (original, translation) in batches[i].iter().zip(translations) {
                            cache.insert(target, original, &translation);
                        }
                    }
                    Err(e) => {
                        warn!(target = %target, batch = i, "translation batch failed: {e}");
                        first_err.get_or_insert(e);
                    }
                }
            }
        });

        match first_err {
            Some(e) => Err(e),
            None => Ok(pending.len()),
        }
    }

    /// Replaces titles by their cached translation. Titles without one are
    /// left as they are; returns how many that were.
    pub fn apply<'d>(
        &self,
        cache: &TranslationCache,
        target: LanguageCode,
        dishes: impl Iterator<Item = &'d mut Dish>,
    ) -> usize {
        if target == self.source {
            return 0;
        }

        let mut missing = 0;
        for dish in dishes {
            match cache.get(target, &dish.title) {
                Some(t) => dish.title = t.to_string(),
                None => missing += 1,
            }
        }
        missing
    }

    /// Translated copy of one canteen's combined menu.
    pub fn translate_menu(
        &self,
        cache: &mut TranslationCache,
        target: LanguageCode,
        menu: &CombinedMenu,
    ) -> Result<CombinedMenu, TranslationError> {
        self.prefetch(cache, target, menu.dishes().map(|d| d.title.as_str()))?;

        let mut out = menu.clone();
        let missing = self.apply(cache, target, out.dishes_mut());
        if missing > 0 {
            warn!(canteen = %menu.canteen, missing, "titles left untranslated");
        }
        Ok(out)
    }

    /// Translates every menu document below `input` into a mirror tree at
    /// `output`. Titles of all documents are fetched in one prefetch; no
    /// output is written unless it succeeds. Paths starting with one of
    /// `exclude` (and `output` itself) are not read.
    pub fn translate_tree(
        &self,
        cache: &mut TranslationCache,
        target: LanguageCode,
        input: &Path,
        output: &Path,
        exclude: &[PathBuf],
    ) -> Result<TreeReport, TranslationError> {
        let files = publish::json_files(input).map_err(|e| publish_error(input, e))?;

        let mut docs = Vec::new();
        let mut report = TreeReport::default();
        for path in files {
            if path.starts_with(output) || exclude.iter().any(|e| path.starts_with(e)) {
                continue;
            }
            let Ok(rel) = path.strip_prefix(input) else { continue };

            match MenuDocument::read(&path) {
                Ok(doc) => docs.push((rel.to_path_buf(), doc)),
                Err(e) => {
                    warn!(path = %path.display(), "not a menu document, skipping: {e}");
                    report.skipped += 1;
                }
            }
        }

        let titles: Vec<&str> = docs
            .iter()
            .flat_map(|(_, doc)| doc.titles())
            .collect();
        report.requested = self.prefetch(cache, target, titles)?;

        for (rel, mut doc) in docs {
            report.missing += self.apply(cache, target, doc.dishes_mut());
            let dest = output.join(&rel);
            if doc.write(&dest).map_err(|e| publish_error(&dest, e))? {
                report.written += 1;
            }
            report.files += 1;
        }

        info!(
            target = %target,
            files = report.files,
            written = report.written,
            requested = report.requested,
            "translated tree"
        );
        Ok(report)
    }
}

fn publish_error(path: &Path, e: PublishError) -> TranslationError {
    TranslationError::Publish {
        path: path.to_path_buf(),
        source: Box::new(e),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeReport {
    pub files: usize,
    pub written: usize,
    pub skipped: usize,
    /// Texts sent to the backend.
    pub requested: usize,
    pub missing: usize,
}

/// Result of translating into one language.
#[derive(Debug)]
pub struct TranslationOutcome {
    pub language: LanguageCode,
    pub result: Result<TreeReport, TranslationError>,
}

/// A published file that carries dishes.
#[derive(Debug)]
enum MenuDocument {
    Week(WeekFragment),
    Combined(CombinedMenu),
}

impl MenuDocument {
    fn read(path: &Path) -> Result<Self, PublishError> {
        if path.file_name().is_some_and(|n| n == COMBINED_FILE) {
            publish::read_json(path).map(MenuDocument::Combined)
        } else {
            publish::read_json(path).map(MenuDocument::Week)
        }
    }

    fn titles(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            MenuDocument::Week(w) => Box::new(w.dishes().map(|d| d.title.as_str())),
            MenuDocument::Combined(c) => Box::new(c.dishes().map(|d| d.title.as_str())),
        }
    }

    fn dishes_mut(&mut self) -> Box<dyn Iterator<Item = &mut Dish> + '_> {
        match self {
            MenuDocument::Week(w) => Box::new(w.dishes_mut()),
            MenuDocument::Combined(c) => Box::new(c.dishes_mut()),
        }
    }

    fn write(&self, path: &Path) -> Result<bool, PublishError> {
        match self {
            MenuDocument::Week(w) => publish::write_json(path, w, Layout::Pretty),
            MenuDocument::Combined(c) => publish::write_json(path, c, Layout::Pretty),
        }
    }
}

/// One translation pass into `target`. The cache is persisted whether or not
/// the pass succeeds, so batches that did get through are not paid for twice.
pub fn run_pass(
    translator: &Translator<'_>,
    cache: &mut TranslationCache,
    target: LanguageCode,
    input: &Path,
    output: &Path,
    exclude: &[PathBuf],
) -> Result<TreeReport, TranslationError> {
    let result = translator.translate_tree(cache, target, input, output, exclude);
    cache.persist_or_disable();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Upper-cases texts and records every batch it sees.
    #[derive(Default)]
    struct Shouting {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl TranslationBackend for Shouting {
        fn translate_batch(
            &self,
            texts: &[String],
            _source: LanguageCode,
            _target: LanguageCode,
        ) -> Result<Vec<String>, TranslationError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            if let Some(bad) = self.fail_on {
                if texts.iter().any(|t| t == bad) {
                    return Err(TranslationError::Rejected {
                        status: 456,
                        message: "quota exceeded".into(),
                    });
                }
            }
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    #[test]
    fn prefetch_deduplicates_and_batches() {
        let backend = Shouting::default();
        let translator = Translator::new(&backend, LanguageCode::De).batch_size(2).concurrency(3);
        let mut cache = TranslationCache::disabled();

        let sent = translator
            .prefetch(&mut cache, LanguageCode::En, ["Reis", "Suppe", "Reis", "Brot", " "])
            .unwrap();

        assert_eq!(sent, 3);
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.iter().map(Vec::len).sum::<usize>(), 3);
        assert_eq!(cache.get(LanguageCode::En, "Suppe"), Some("SUPPE"));
    }

    #[test]
    fn cached_titles_are_not_requested() {
        let backend = Shouting::default();
        let translator = Translator::new(&backend, LanguageCode::De);
        let mut cache = TranslationCache::disabled();
        cache.insert(LanguageCode::En, "Reis", "Rice");

        translator.prefetch(&mut cache, LanguageCode::En, ["Reis"]).unwrap();
        assert!(backend.calls.lock().unwrap().is_empty());
        assert_eq!(cache.get(LanguageCode::En, "Reis"), Some("Rice"));
    }

    #[test]
    fn source_language_is_a_no_op() {
        let backend = Shouting::default();
        let translator = Translator::new(&backend, LanguageCode::De);
        let mut cache = TranslationCache::disabled();
        assert_eq!(translator.prefetch(&mut cache, LanguageCode::De, ["Reis"]).unwrap(), 0);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_batch_keeps_successful_ones() {
        let backend = Shouting {
            fail_on: Some("Zz"),
            ..Default::default()
        };
        let translator = Translator::new(&backend, LanguageCode::De).batch_size(1).concurrency(1);
        let mut cache = TranslationCache::disabled();

        // sorted order: "Aa" goes out before "Zz"
        let err = translator
            .prefetch(&mut cache, LanguageCode::En, ["Zz", "Aa"])
            .unwrap_err();
        assert!(matches!(err, TranslationError::Rejected { status: 456, .. }));
        assert_eq!(cache.get(LanguageCode::En, "Aa"), Some("AA"));
        assert_eq!(cache.get(LanguageCode::En, "Zz"), None);
    }
}
