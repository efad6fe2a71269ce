use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use eat_core::model::canteen::Canteen;
use eat_core::model::language::LanguageCode;

/// Accepts `dd.mm.yyyy` and `yyyy-mm-dd`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date `{s}`, expected dd.mm.yyyy or yyyy-mm-dd"))
}

#[derive(Parser, Debug)]
#[command(name = "eat-core")]
#[command(about = "Fetches canteen menus and publishes them as a static JSON API")]
pub struct Cli {
    /// Config file; defaults to ./eat.json when present
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and parse menus, writing week files (and combined.json with --combine)
    Fetch {
        /// Canteens to fetch; all when omitted
        #[arg(value_parser = clap::value_parser!(Canteen))]
        canteens: Vec<Canteen>,

        /// Output root; overrides the config
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Merge into <canteen>/combined.json
        #[arg(long)]
        combine: bool,

        /// First day to fetch; defaults to today
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// Number of days to fetch; overrides the config
        #[arg(long)]
        days: Option<u32>,
    },

    /// Print the menu of one canteen on one day
    Query {
        #[arg(value_parser = clap::value_parser!(Canteen))]
        canteen: Canteen,

        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// Translate every menu document of a tree into another language
    Translate {
        input: PathBuf,

        output: PathBuf,

        #[arg(value_parser = clap::value_parser!(LanguageCode))]
        language: LanguageCode,

        #[arg(long, value_parser = clap::value_parser!(LanguageCode))]
        source_language: Option<LanguageCode>,

        /// Neither read nor write the translation cache
        #[arg(long)]
        no_cache: bool,

        /// Cache file; defaults to <OUTPUT>/translations.json
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Drop stale days and rewrite the tree minified
    Reformat {
        root: PathBuf,

        #[arg(long)]
        retention_days: Option<u32>,

        /// Also render OpenMensa XML feeds into this directory
        #[arg(long)]
        openmensa: Option<PathBuf>,

        /// Reference date for retention; defaults to today
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },

    /// Export canteen, label and language tables as JSON
    Enums { dir: PathBuf },

    /// List canteen ids
    Canteens,

    /// Fetch, combine, translate and reformat in one go
    Run {
        /// Canteens to run; all when omitted
        #[arg(value_parser = clap::value_parser!(Canteen))]
        canteens: Vec<Canteen>,
    },
}
