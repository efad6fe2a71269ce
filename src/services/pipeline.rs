use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PublishError, TranslationError};
use crate::model::canteen::Canteen;
use crate::model::config::PipelineConfig;
use crate::model::dish::DedupKey;
use crate::model::language::LanguageCode;
use crate::model::menu::{CombinedMenu, WeekFragment};
use crate::parsers::{self, ParseContext};
use crate::services::combine::{check_fragment, combine};
use crate::services::deepl::TranslationBackend;
use crate::services::enums;
use crate::services::fetch::MenuSource;
use crate::services::publish::{self, Layout};
use crate::services::reformat::{self, ReformatReport};
use crate::services::translate::{self, TranslationOutcome, Translator, TreeReport};
use crate::services::translation_cache::TranslationCache;
use crate::services::week::{date_window, group_by_week};

pub const ENUMS_DIR: &str = "enums";

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub dedup: DedupKey,
    /// Merge into and write `combined.json`.
    pub combine: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanteenSummary {
    pub weeks: usize,
    pub days: usize,
    pub dishes: usize,
    pub closed_days: usize,
    pub files_written: usize,
}

/// Fetch → parse → combine → publish for one canteen. Week files are written
/// as their week completes; `combined.json` only once every week succeeded.
pub fn run_canteen(
    source: &dyn MenuSource,
    canteen: Canteen,
    dates: &[NaiveDate],
    opts: &FetchOptions,
) -> Result<CanteenSummary, PipelineError> {
    let root = opts.output_dir.as_path();
    let mut summary = CanteenSummary::default();

    let mut menu = if opts.combine {
        publish::load_combined(root, canteen)?.unwrap_or_else(|| CombinedMenu::new(canteen))
    } else {
        CombinedMenu::new(canteen)
    };

    for (key, days) in group_by_week(dates) {
        let mut fragment = WeekFragment::new(canteen, key);

        for date in days {
            let Some(page) = source.fetch_page(canteen, date)? else {
                summary.closed_days += 1;
                continue;
            };
            let ctx = ParseContext {
                canteen,
                date,
                week: key,
                dedup: opts.dedup,
            };
            fragment.absorb(parsers::parse_page(&page, &ctx)?);
        }

        check_fragment(&fragment)?;
        if fragment.is_empty() {
            debug!(canteen = %canteen, week = %key, "nothing published for week");
            continue;
        }

        summary.weeks += 1;
        summary.days += fragment.days.len();
        summary.dishes += fragment.dishes().count();
        if publish::write_week(root, &fragment, Layout::Pretty)? {
            summary.files_written += 1;
        }
        menu = combine(menu, fragment)?;
    }

    if opts.combine && publish::write_combined(root, &menu, Layout::Pretty)? {
        summary.files_written += 1;
    }

    info!(
        canteen = %canteen,
        weeks = summary.weeks,
        days = summary.days,
        dishes = summary.dishes,
        "canteen done"
    );
    Ok(summary)
}

#[derive(Debug)]
pub struct CanteenOutcome {
    pub canteen: Canteen,
    pub result: Result<CanteenSummary, PipelineError>,
}

/// Outcome of every canteen of one run, ordered by canteen.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<CanteenOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (Canteen, &CanteenSummary)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|s| (o.canteen, s)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (Canteen, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.canteen, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for o in &self.outcomes {
            match &o.result {
                Ok(s) => writeln!(
                    f,
                    "ok    {:<32} {} weeks, {} days, {} dishes",
                    o.canteen.key(),
                    s.weeks,
                    s.days,
                    s.dishes
                )?,
                Err(e) => writeln!(f, "FAIL  {:<32} {e}", o.canteen.key())?,
            }
        }
        let failed = self.failures().count();
        write!(
            f,
            "{} canteens, {} succeeded, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Runs every canteen on at most `workers` threads. A failing (or
/// panicking) canteen is recorded and never stops the others.
pub fn run_all(
    source: &dyn MenuSource,
    canteens: &[Canteen],
    dates: &[NaiveDate],
    opts: &FetchOptions,
    workers: usize,
) -> RunReport {
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<CanteenOutcome>();
    let workers = workers.clamp(1, canteens.len().max(1));
    let mut outcomes = Vec::with_capacity(canteens.len());

    thread::scope(|s| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            s.spawn(move || loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let Some(&canteen) = canteens.get(i) else { break };

                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_canteen(source, canteen, dates, opts)
                }))
                .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(&*payload))));

                if let Err(e) = &result {
                    error!(canteen = %canteen, "{e}");
                }
                if tx.send(CanteenOutcome { canteen, result }).is_err() {
                    break;
                }
            });
        }
        drop(tx); // this thread is the only receiver now

        outcomes.extend(rx);
    });

    outcomes.sort_by_key(|o| o.canteen);
    RunReport { outcomes }
}

/// Paths a translation pass over `root` must not read: the language mirrors,
/// the enum tables and the cache itself.
pub fn translation_excludes(root: &Path, cache_path: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = LanguageCode::ALL
        .iter()
        .map(|l| root.join(l.base_name()))
        .collect();
    out.push(root.join(ENUMS_DIR));
    out.push(cache_path.to_path_buf());
    out
}

/// Everything a scheduled run produced.
#[derive(Debug, Default)]
pub struct FullReport {
    pub fetch: RunReport,
    pub translations: Vec<TranslationOutcome>,
    pub enums: Option<Result<usize, PublishError>>,
    pub reformat: Option<Result<ReformatReport, PublishError>>,
}

impl FullReport {
    pub fn is_success(&self) -> bool {
        self.fetch.is_success()
            && self.translations.iter().all(|t| t.result.is_ok())
            && !matches!(self.enums, Some(Err(_)))
            && !matches!(self.reformat, Some(Err(_)))
    }
}

impl fmt::Display for FullReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.fetch)?;
        for t in &self.translations {
            match &t.result {
                Ok(r) => writeln!(
                    f,
                    "ok    translate {:<22} {} files, {} new titles",
                    t.language.base_name(),
                    r.files,
                    r.requested
                )?,
                Err(e) => writeln!(f, "FAIL  translate {:<22} {e}", t.language.base_name())?,
            }
        }
        if let Some(Err(e)) = &self.enums {
            writeln!(f, "FAIL  enums {e}")?;
        }
        match &self.reformat {
            Some(Ok(r)) => write!(
                f,
                "ok    reformat {} files, {} stale days removed, {} weeks deleted",
                r.files, r.days_removed, r.deleted
            ),
            Some(Err(e)) => write!(f, "FAIL  reformat {e}"),
            None => Ok(()),
        }
    }
}

/// Translates the tree at `root` into every configured language. Each
/// language is its own pass; one failing does not stop the next.
pub fn translate_all(
    cfg: &PipelineConfig,
    backend: Option<&dyn TranslationBackend>,
    root: &Path,
) -> Vec<TranslationOutcome> {
    if cfg.languages.is_empty() {
        return Vec::new();
    }

    let Some(backend) = backend else {
        warn!("languages configured but no DeepL API key, skipping translation");
        return cfg
            .languages
            .iter()
            .map(|&language| TranslationOutcome {
                language,
                result: Err(TranslationError::MissingApiKey),
            })
            .collect();
    };

    let cache_path = cfg.cache_path();
    let mut cache = TranslationCache::load(&cache_path);
    let translator = Translator::new(backend, cfg.source_language)
        .batch_size(cfg.translation_batch_size)
        .concurrency(cfg.translation_concurrency);
    let exclude = translation_excludes(root, &cache_path);

    cfg.languages
        .iter()
        .map(|&language| {
            let output = root.join(language.base_name());
            let result: Result<TreeReport, TranslationError> =
                translate::run_pass(&translator, &mut cache, language, root, &output, &exclude);
            if let Err(e) = &result {
                error!(language = %language, "translation failed: {e}");
            }
            TranslationOutcome { language, result }
        })
        .collect()
}

/// Fetch, combine, translate, export enums and reformat, in that order.
/// Later stages run even if some canteens failed; the report says what did.
pub fn run(
    cfg: &PipelineConfig,
    source: &dyn MenuSource,
    backend: Option<&dyn TranslationBackend>,
    canteens: &[Canteen],
    today: NaiveDate,
) -> FullReport {
    let root = cfg.output_dir.as_path();
    let dates = date_window(today, cfg.days_ahead, cfg.include_weekends);
    let opts = FetchOptions {
        output_dir: cfg.output_dir.clone(),
        dedup: cfg.dedup_key,
        combine: true,
    };

    info!(canteens = canteens.len(), days = dates.len(), workers = cfg.workers, "starting run");
    let fetch = run_all(source, canteens, &dates, &opts, cfg.workers);
    let translations = translate_all(cfg, backend, root);

    let enums = enums::export(&root.join(ENUMS_DIR));
    if let Err(e) = &enums {
        error!("enum export failed: {e}");
    }

    let reformat = reformat::reformat(root, today, cfg.retention_days);
    if let Err(e) = &reformat {
        error!("reformat failed: {e}");
    }

    FullReport {
        fetch,
        translations,
        enums: Some(enums),
        reformat: Some(reformat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    struct Panicky;

    impl MenuSource for Panicky {
        fn fetch_page(&self, canteen: Canteen, _date: NaiveDate) -> Result<Option<String>, FetchError> {
            match canteen {
                Canteen::MensaGarching => panic!("boom"),
                Canteen::MensaPasing => Err(FetchError::Status {
                    url: "https://example.org".into(),
                    status: 503,
                }),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn panics_and_errors_stay_within_their_canteen() {
        let dir = tempfile::tempdir().unwrap();
        let opts = FetchOptions {
            output_dir: dir.path().to_path_buf(),
            dedup: DedupKey::TitleCategory,
            combine: true,
        };
        let dates = [NaiveDate::from_ymd_opt(2024, 7, 29).unwrap()];
        let canteens = [Canteen::MensaArcisstr, Canteen::MensaGarching, Canteen::MensaPasing];

        let report = run_all(&Panicky, &canteens, &dates, &opts, 2);

        assert_eq!(report.outcomes.len(), 3);
        let failed: Vec<_> = report.failures().map(|(c, _)| c).collect();
        assert_eq!(failed, vec![Canteen::MensaGarching, Canteen::MensaPasing]);
        assert!(matches!(
            report.failures().next(),
            Some((_, PipelineError::Panicked(msg))) if msg == "boom"
        ));

        let (ok, summary) = report.succeeded().next().unwrap();
        assert_eq!(ok, Canteen::MensaArcisstr);
        assert_eq!(summary.closed_days, 1);
        assert!(report.to_string().ends_with("3 canteens, 1 succeeded, 2 failed"));
    }

    #[test]
    fn excludes_cover_mirrors_and_cache() {
        let root = Path::new("dist");
        let ex = translation_excludes(root, &root.join("translations.json"));
        assert!(ex.contains(&root.join("en")));
        assert!(ex.contains(&root.join("enums")));
        assert!(ex.contains(&root.join("translations.json")));
    }
}
