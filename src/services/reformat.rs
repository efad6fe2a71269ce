use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PublishError;
use crate::model::canteen::Canteen;
use crate::model::menu::{CombinedMenu, WeekFragment};
use crate::services::openmensa_feed;
use crate::services::publish::{self, Layout, COMBINED_FILE};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReformatReport {
    pub files: usize,
    pub rewritten: usize,
    pub deleted: usize,
    pub days_removed: usize,
}

/// Days on or before this date are stale. Today is never stale, so a
/// retention of 0 keeps the same days as a retention of 1.
pub fn stale_until(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days.max(1))))
        .unwrap_or(NaiveDate::MIN)
}

/// `<year>/<NN>.json`
fn is_week_file(path: &Path) -> bool {
    let digits = |s: Option<&str>| s.is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()));
    let year = path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str());
    let stem = path.file_stem().and_then(|n| n.to_str());
    digits(year) && digits(stem)
}

fn remove_if_empty(dir: &Path) {
    let empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            debug!(dir = %dir.display(), "cannot list directory: {e}");
            return;
        }
    };
    if !empty {
        return;
    }
    match fs::remove_dir(dir) {
        Ok(()) => debug!(dir = %dir.display(), "removed empty year directory"),
        Err(e) => debug!(dir = %dir.display(), "cannot remove empty directory: {e}"),
    }
}

fn prune_combined(menu: &mut CombinedMenu, stale: NaiveDate) -> usize {
    let mut removed = 0;
    for week in menu.weeks.values_mut() {
        removed += week.retain_days(|d| d > stale);
    }
    menu.weeks.retain(|_, w| !w.is_empty());
    removed
}

/// Drops stale days from every menu document below `root` and rewrites what
/// remains minified. Week files left without days are deleted. Files whose
/// content would not change are not touched, so a second run is a no-op.
pub fn reformat(root: &Path, today: NaiveDate, retention_days: u32) -> Result<ReformatReport, PublishError> {
    let stale = stale_until(today, retention_days);
    let mut report = ReformatReport::default();

    for path in publish::json_files(root)? {
        if path.file_name().is_some_and(|n| n == COMBINED_FILE) {
            let mut menu: CombinedMenu = publish::read_json(&path)?;
            report.days_removed += prune_combined(&mut menu, stale);
            report.files += 1;
            if publish::write_json(&path, &menu, Layout::Compact)? {
                report.rewritten += 1;
            }
        } else if is_week_file(&path) {
            let mut week: WeekFragment = publish::read_json(&path)?;
            report.days_removed += week.retain_days(|d| d > stale);
            report.files += 1;

            if week.is_empty() {
                fs::remove_file(&path).map_err(|e| PublishError::io(&path, e))?;
                debug!(path = %path.display(), "deleted stale week");
                report.deleted += 1;
                // drop the year directory once its last week is gone
                if let Some(dir) = path.parent() {
                    remove_if_empty(dir);
                }
            } else if publish::write_json(&path, &week, Layout::Compact)? {
                report.rewritten += 1;
            }
        } else {
            debug!(path = %path.display(), "not a menu document");
        }
    }

    info!(
        root = %root.display(),
        %stale,
        files = report.files,
        rewritten = report.rewritten,
        deleted = report.deleted,
        days_removed = report.days_removed,
        "reformatted"
    );
    Ok(report)
}

/// Renders the retained days of every canteen's `combined.json` below `root`
/// as `<out_dir>/<canteen>.xml`. Returns how many feeds were written.
pub fn reformat_openmensa(
    root: &Path,
    out_dir: &Path,
    today: NaiveDate,
    retention_days: u32,
) -> Result<usize, PublishError> {
    let stale = stale_until(today, retention_days);
    let mut written = 0;

    for &canteen in Canteen::ALL {
        let Some(mut menu) = publish::load_combined(root, canteen)? else {
            continue;
        };
        prune_combined(&mut menu, stale);

        let xml = openmensa_feed::render(&menu)?;
        let path = out_dir.join(format!("{}.xml", canteen.key()));
        if publish::write_if_changed(&path, xml.as_bytes())? {
            written += 1;
        }
    }

    info!(out = %out_dir.display(), written, "openmensa feeds rendered");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn one_day_retention_keeps_today() {
        let today = date(2024, 7, 31);
        let stale = stale_until(today, 1);
        assert!(date(2024, 7, 30) <= stale);
        assert!(today > stale);
    }

    #[test]
    fn zero_retention_still_keeps_today() {
        let today = date(2024, 7, 31);
        assert_eq!(stale_until(today, 0), stale_until(today, 1));
        assert!(today > stale_until(today, 0));
    }

    #[test]
    fn only_empty_year_directories_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("2023");
        let used = dir.path().join("2024");
        fs::create_dir_all(&empty).unwrap();
        fs::create_dir_all(&used).unwrap();
        fs::write(used.join("31.json"), "{}").unwrap();

        remove_if_empty(&empty);
        remove_if_empty(&used);
        remove_if_empty(&dir.path().join("2022"));

        assert!(!empty.exists());
        assert!(used.join("31.json").is_file());
    }

    #[test]
    fn week_file_detection() {
        assert!(is_week_file(Path::new("dist/mensa-garching/2024/07.json")));
        assert!(!is_week_file(Path::new("dist/mensa-garching/combined.json")));
        assert!(!is_week_file(Path::new("dist/enums/labels.json")));
        assert!(!is_week_file(Path::new("dist/translations.json")));
    }
}
