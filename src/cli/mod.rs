use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::info;

use eat_core::model::canteen::Canteen;
use eat_core::model::config::PipelineConfig;
use eat_core::model::language::LanguageCode;
use eat_core::parsers::{self, ParseContext};
use eat_core::services::deepl::{DeepL, TranslationBackend};
use eat_core::services::fetch::{HttpSource, MenuSource};
use eat_core::services::pipeline::{self, FetchOptions};
use eat_core::services::translate::{self, Translator};
use eat_core::services::translation_cache::TranslationCache;
use eat_core::services::week::{date_window, week_of};
use eat_core::services::{config, enums, reformat};

mod command;
pub use command::{Cli, Command};

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn selected(canteens: Vec<Canteen>) -> Vec<Canteen> {
    if canteens.is_empty() {
        Canteen::ALL.to_vec()
    } else {
        canteens
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    config::load(path).context("loading configuration")
}

fn deepl_backend(cfg: &PipelineConfig) -> Result<Option<DeepL>> {
    match cfg.deepl_api_key.as_deref() {
        Some(key) => Ok(Some(DeepL::new(key).context("building DeepL client")?)),
        None => Ok(None),
    }
}

/// Dispatches one parsed command line. Command output goes to stdout.
pub fn run(cli: Cli, today: NaiveDate) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Fetch {
            canteens,
            out,
            combine,
            start,
            days,
        } => {
            let mut cfg = load_config(config_path)?;
            if let Some(out) = out {
                cfg.output_dir = out;
            }
            let dates = date_window(
                start.unwrap_or(today),
                days.unwrap_or(cfg.days_ahead),
                cfg.include_weekends,
            );
            let source = HttpSource::from_config(&cfg).context("building HTTP client")?;
            let opts = FetchOptions {
                output_dir: cfg.output_dir.clone(),
                dedup: cfg.dedup_key,
                combine,
            };

            let report = pipeline::run_all(&source, &selected(canteens), &dates, &opts, cfg.workers);
            println!("{report}");
            Ok(exit_code(report.is_success()))
        }

        Command::Query { canteen, date } => {
            let cfg = load_config(config_path)?;
            let source = HttpSource::from_config(&cfg).context("building HTTP client")?;
            query(&source, &cfg, canteen, date)
        }

        Command::Translate {
            input,
            output,
            language,
            source_language,
            no_cache,
            cache,
        } => {
            let cfg = load_config(config_path)?;
            let Some(backend) = deepl_backend(&cfg)? else {
                bail!("no DeepL API key, set DEEPL_API_KEY or deepl_api_key in {}", config::CONFIG_FILE);
            };
            let source = source_language.unwrap_or(cfg.source_language);
            translate_cmd(&backend, &cfg, input, output, language, source, no_cache, cache)
        }

        Command::Reformat {
            root,
            retention_days,
            openmensa,
            today: reference,
        } => {
            let cfg = load_config(config_path)?;
            let today = reference.unwrap_or(today);
            let retention = retention_days.unwrap_or(cfg.retention_days);

            let report = reformat::reformat(&root, today, retention)
                .with_context(|| format!("reformatting {}", root.display()))?;
            println!(
                "{} files, {} rewritten, {} stale days removed, {} weeks deleted",
                report.files, report.rewritten, report.days_removed, report.deleted
            );

            if let Some(dir) = openmensa {
                let feeds = reformat::reformat_openmensa(&root, &dir, today, retention)
                    .with_context(|| format!("rendering OpenMensa feeds into {}", dir.display()))?;
                println!("{feeds} feeds written to {}", dir.display());
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Enums { dir } => {
            let changed = enums::export(&dir).with_context(|| format!("exporting enums to {}", dir.display()))?;
            println!("{changed} tables updated in {}", dir.display());
            Ok(ExitCode::SUCCESS)
        }

        Command::Canteens => {
            for c in Canteen::ALL {
                println!("{:<30} {}", c.key(), c.name());
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Run { canteens } => {
            let cfg = load_config(config_path)?;
            let source = HttpSource::from_config(&cfg).context("building HTTP client")?;
            let backend = deepl_backend(&cfg)?;

            let report = pipeline::run(
                &cfg,
                &source,
                backend.as_ref().map(|b| b as &dyn TranslationBackend),
                &selected(canteens),
                today,
            );
            println!("{report}");
            Ok(exit_code(report.is_success()))
        }
    }
}

fn query(source: &dyn MenuSource, cfg: &PipelineConfig, canteen: Canteen, date: NaiveDate) -> Result<ExitCode> {
    let page = source
        .fetch_page(canteen, date)
        .with_context(|| format!("fetching {canteen} for {date}"))?;
    let Some(page) = page else {
        println!("{canteen} has no menu on {date}");
        return Ok(ExitCode::SUCCESS);
    };

    let ctx = ParseContext {
        canteen,
        date,
        week: week_of(date),
        dedup: cfg.dedup_key,
    };
    let fragment = parsers::parse_page(&page, &ctx)?;

    match fragment.days.get(&date) {
        Some(day) => println!("{}", serde_json::to_string_pretty(day)?),
        None => println!("{canteen} has no menu on {date}"),
    }
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
fn translate_cmd(
    backend: &dyn TranslationBackend,
    cfg: &PipelineConfig,
    input: PathBuf,
    output: PathBuf,
    target: LanguageCode,
    source: LanguageCode,
    no_cache: bool,
    cache_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let cache_path = cache_path.unwrap_or_else(|| output.join("translations.json"));
    let mut cache = if no_cache {
        TranslationCache::disabled()
    } else {
        TranslationCache::load(&cache_path)
    };

    let translator = Translator::new(backend, source)
        .batch_size(cfg.translation_batch_size)
        .concurrency(cfg.translation_concurrency);
    let exclude = vec![output.clone(), cache_path];

    info!(input = %input.display(), output = %output.display(), target = %target, "translating tree");
    let report = translate::run_pass(&translator, &mut cache, target, &input, &output, &exclude)
        .with_context(|| format!("translating {} into {}", input.display(), target.base_name()))?;

    println!(
        "{} files, {} written, {} skipped, {} new titles, {} untranslated",
        report.files, report.written, report.skipped, report.requested, report.missing
    );
    Ok(ExitCode::SUCCESS)
}
