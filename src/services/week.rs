use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::model::menu::WeekKey;

/// ISO-8601 week of `date`. The year is the ISO year, which differs from the
/// calendar year for some days around New Year.
pub fn week_of(date: NaiveDate) -> WeekKey {
    let iso = date.iso_week();
    WeekKey::new(iso.year(), iso.week())
}

pub fn monday_of(key: WeekKey) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(key.year, key.week, Weekday::Mon)
}

/// Dates from `start` on, `days` long; weekends are skipped unless asked for.
pub fn date_window(start: NaiveDate, days: u32, include_weekends: bool) -> Vec<NaiveDate> {
    (0..u64::from(days))
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .filter(|d| include_weekends || !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Groups dates by week, keeping weeks and dates in chronological order.
pub fn group_by_week(dates: &[NaiveDate]) -> Vec<(WeekKey, Vec<NaiveDate>)> {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut groups: Vec<(WeekKey, Vec<NaiveDate>)> = Vec::new();
    for date in sorted {
        let key = week_of(date);
        match groups.last_mut() {
            Some((last, days)) if *last == key => days.push(date),
            _ => groups.push((key, vec![date])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn december_31_can_be_week_one_of_next_year() {
        // 2024-12-31 is a Tuesday in ISO week 2025-W01
        assert_eq!(week_of(date(2024, 12, 31)), WeekKey::new(2025, 1));
        // 2019-12-30 likewise belongs to 2020-W01
        assert_eq!(week_of(date(2019, 12, 30)), WeekKey::new(2020, 1));
    }

    #[test]
    fn january_days_can_be_week_53_of_previous_year() {
        assert_eq!(week_of(date(2021, 1, 3)), WeekKey::new(2020, 53));
        assert_eq!(week_of(date(2021, 1, 4)), WeekKey::new(2021, 1));
    }

    #[test]
    fn monday_lookup() {
        assert_eq!(monday_of(WeekKey::new(2017, 44)), Some(date(2017, 10, 30)));
        assert_eq!(monday_of(WeekKey::new(2018, 1)), Some(date(2018, 1, 1)));
        assert_eq!(monday_of(WeekKey::new(2019, 2)), Some(date(2019, 1, 7)));
        assert_eq!(monday_of(WeekKey::new(2019, 60)), None);
    }

    #[test]
    fn window_skips_weekends() {
        // Friday 2024-08-02 .. Tuesday 2024-08-06
        let dates = date_window(date(2024, 8, 2), 5, false);
        assert_eq!(dates, vec![date(2024, 8, 2), date(2024, 8, 5), date(2024, 8, 6)]);
        assert_eq!(date_window(date(2024, 8, 2), 5, true).len(), 5);
    }

    #[test]
    fn grouping_crosses_year_boundary() {
        let dates = date_window(date(2024, 12, 27), 7, false);
        let groups = group_by_week(&dates);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, WeekKey::new(2024, 52));
        assert_eq!(groups[0].1, vec![date(2024, 12, 27)]);
        assert_eq!(groups[1].0, WeekKey::new(2025, 1));
        assert_eq!(groups[1].1.len(), 4);
    }
}
