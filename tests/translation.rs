mod common;

use std::fs;

use common::{date, FakeSource, RecordingBackend};
use eat_core::error::TranslationError;
use eat_core::model::canteen::Canteen;
use eat_core::model::dish::DedupKey;
use eat_core::model::language::LanguageCode;
use eat_core::model::menu::CombinedMenu;
use eat_core::services::pipeline::{run_all, translation_excludes, FetchOptions};
use eat_core::services::publish;
use eat_core::services::translate::{run_pass, Translator};
use eat_core::services::translation_cache::TranslationCache;

fn publish_two_canteens(root: &std::path::Path) {
    let monday = date(2024, 7, 29);
    let source = FakeSource::default()
        .with_day(Canteen::MensaArcisstr, monday, "Schweinebraten")
        .with_day(Canteen::MensaGarching, monday, "Schweinebraten")
        .with_day(Canteen::MensaGarching, date(2024, 7, 30), "Kartoffelsuppe");
    let opts = FetchOptions {
        output_dir: root.to_path_buf(),
        dedup: DedupKey::TitleCategory,
        combine: true,
    };
    let report = run_all(
        &source,
        &[Canteen::MensaArcisstr, Canteen::MensaGarching],
        &[monday, date(2024, 7, 30)],
        &opts,
        2,
    );
    assert!(report.is_success());
}

#[test]
fn titles_are_requested_once_across_canteens_and_runs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    publish_two_canteens(root);

    let backend = RecordingBackend::default();
    let translator = Translator::new(&backend, LanguageCode::De);
    let cache_path = root.join("translations.json");
    let exclude = translation_excludes(root, &cache_path);
    let output = root.join("en");

    let mut cache = TranslationCache::load(&cache_path);
    let report = run_pass(&translator, &mut cache, LanguageCode::En, root, &output, &exclude).unwrap();
    assert_eq!(report.requested, 2);
    assert_eq!(report.missing, 0);
    assert!(cache_path.is_file());

    let mut sent = backend.sent();
    sent.sort();
    assert_eq!(sent, vec!["Kartoffelsuppe", "Schweinebraten"]);

    // a fresh cache instance reads what the first run persisted
    let mut cache = TranslationCache::load(&cache_path);
    let report = run_pass(&translator, &mut cache, LanguageCode::En, root, &output, &exclude).unwrap();
    assert_eq!(report.requested, 0);
    assert_eq!(backend.sent().len(), 2);

    let translated: CombinedMenu = publish::read_json(&publish::combined_path(&output, Canteen::MensaGarching)).unwrap();
    let titles: Vec<_> = translated.dishes().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["[en] Schweinebraten", "[en] Kartoffelsuppe"]);
}

#[test]
fn disabled_cache_translates_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    publish_two_canteens(root);

    let backend = RecordingBackend::default();
    let translator = Translator::new(&backend, LanguageCode::De);
    let output = root.join("fr");
    let cache_path = root.join("translations.json");

    let mut cache = TranslationCache::disabled();
    run_pass(&translator, &mut cache, LanguageCode::Fr, root, &output, &[]).unwrap();
    assert_eq!(backend.sent().len(), 2);
    assert!(!cache_path.exists());

    // nothing persisted, so a second pass asks again
    let mut cache = TranslationCache::disabled();
    run_pass(&translator, &mut cache, LanguageCode::Fr, root, &output, &[]).unwrap();
    assert_eq!(backend.sent().len(), 4);
}

#[test]
fn translating_into_the_source_language_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    publish_two_canteens(root);

    let backend = RecordingBackend::default();
    let translator = Translator::new(&backend, LanguageCode::De);
    let mut cache = TranslationCache::disabled();
    let output = root.join("de");

    let report = run_pass(&translator, &mut cache, LanguageCode::De, root, &output, &[]).unwrap();
    assert_eq!(report.requested, 0);
    assert!(backend.sent().is_empty());
    assert_eq!(
        fs::read_to_string(publish::combined_path(&output, Canteen::MensaArcisstr)).unwrap(),
        fs::read_to_string(publish::combined_path(root, Canteen::MensaArcisstr)).unwrap()
    );
}

#[test]
fn failed_pass_still_persists_translated_batches() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    publish_two_canteens(root);

    let cache_path = root.join("translations.json");
    let mut seeded = TranslationCache::try_load(&cache_path).unwrap();
    seeded.insert(LanguageCode::En, "Apfel", "Apple");
    seeded.persist().unwrap();

    // one title per batch, in sorted order: Kartoffelsuppe gets through, Schweinebraten is rejected
    let backend = RecordingBackend {
        fail_on: Some("Schweinebraten"),
        ..Default::default()
    };
    let translator = Translator::new(&backend, LanguageCode::De).batch_size(1).concurrency(1);
    let exclude = translation_excludes(root, &cache_path);
    let output = root.join("en");

    let mut cache = TranslationCache::load(&cache_path);
    let err = run_pass(&translator, &mut cache, LanguageCode::En, root, &output, &exclude).unwrap_err();
    assert!(matches!(err, TranslationError::Rejected { status: 456, .. }));
    assert!(!output.exists());

    let raw = fs::read_to_string(&cache_path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).unwrap().is_array());

    let reloaded = TranslationCache::try_load(&cache_path).unwrap();
    assert_eq!(reloaded.get(LanguageCode::En, "Apfel"), Some("Apple"));
    assert_eq!(reloaded.get(LanguageCode::En, "Kartoffelsuppe"), Some("[en] Kartoffelsuppe"));
    assert_eq!(reloaded.get(LanguageCode::En, "Schweinebraten"), None);
    assert_eq!(reloaded.len(), 2);
}
