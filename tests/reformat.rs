mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use common::{date, FakeSource};
use eat_core::model::canteen::Canteen;
use eat_core::model::dish::DedupKey;
use eat_core::services::pipeline::{run_all, FetchOptions};
use eat_core::services::publish;
use eat_core::services::reformat::{reformat, reformat_openmensa};

fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    publish::json_files(root)
        .unwrap()
        .into_iter()
        .map(|p| (p.strip_prefix(root).unwrap().display().to_string(), fs::read(&p).unwrap()))
        .collect()
}

fn publish_yesterday_and_today(root: &Path, canteen: Canteen) {
    let source = FakeSource::default()
        .with_day(canteen, date(2024, 7, 29), "Gestern")
        .with_day(canteen, date(2024, 7, 30), "Heute");
    let opts = FetchOptions {
        output_dir: root.to_path_buf(),
        dedup: DedupKey::TitleCategory,
        combine: true,
    };
    assert!(run_all(&source, &[canteen], &[date(2024, 7, 29), date(2024, 7, 30)], &opts, 1).is_success());
}

#[test]
fn one_day_retention_keeps_only_today_and_second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let canteen = Canteen::MensaGarching;
    publish_yesterday_and_today(root, canteen);
    let today = date(2024, 7, 30);

    let first = reformat(root, today, 1).unwrap();
    assert_eq!(first.days_removed, 2); // once in the week file, once in combined.json
    assert_eq!(first.deleted, 0);

    let menu = publish::load_combined(root, canteen).unwrap().unwrap();
    let days: Vec<_> = menu.days().map(|d| d.date).collect();
    assert_eq!(days, vec![today]);

    let compact = fs::read_to_string(publish::combined_path(root, canteen)).unwrap();
    assert!(!compact.contains('\n'));

    let before = snapshot(root);
    let second = reformat(root, today, 1).unwrap();
    assert_eq!(second.rewritten, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.days_removed, 0);
    assert_eq!(snapshot(root), before);
}

#[test]
fn weeks_that_fall_out_of_retention_are_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let canteen = Canteen::MensaArcisstr;
    publish_yesterday_and_today(root, canteen);

    let report = reformat(root, date(2024, 8, 12), 1).unwrap();
    assert_eq!(report.deleted, 1);
    assert!(!root.join("mensa-arcisstr/2024").exists());

    let menu = publish::load_combined(root, canteen).unwrap().unwrap();
    assert!(menu.weeks.is_empty());
}

#[test]
fn openmensa_feeds_are_rendered_for_retained_days() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    publish_yesterday_and_today(root, Canteen::MensaGarching);
    let feeds = dir.path().join("openmensa");

    let written = reformat_openmensa(root, &feeds, date(2024, 7, 30), 1).unwrap();
    assert_eq!(written, 1);

    let xml = fs::read_to_string(feeds.join("mensa-garching.xml")).unwrap();
    assert!(xml.contains(r#"<day date="2024-07-30">"#));
    assert!(!xml.contains("2024-07-29"));
    assert!(xml.contains("<name>Heute</name>"));
}
