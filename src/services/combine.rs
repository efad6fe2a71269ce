use tracing::debug;

use crate::error::ConsistencyError;
use crate::model::menu::{CombinedMenu, WeekFragment};
use crate::services::week::week_of;

/// Checks that the fragment's days all index to its own week key.
pub fn check_fragment(fragment: &WeekFragment) -> Result<(), ConsistencyError> {
    for date in fragment.days.keys() {
        let actual = week_of(*date);
        if actual != fragment.key {
            return Err(ConsistencyError::WeekMismatch {
                canteen: fragment.canteen,
                date: *date,
                expected: fragment.key,
                actual,
            });
        }
    }
    Ok(())
}

/// Replaces the fragment's week in `menu`. Other weeks are left alone; a
/// fragment without days is ignored so that an unpublished week cannot wipe
/// an earlier fetch.
pub fn combine(mut menu: CombinedMenu, fragment: WeekFragment) -> Result<CombinedMenu, ConsistencyError> {
    if fragment.canteen != menu.canteen {
        return Err(ConsistencyError::CanteenMismatch {
            expected: menu.canteen,
            found: fragment.canteen,
        });
    }
    check_fragment(&fragment)?;

    if fragment.is_empty() {
        debug!(canteen = %menu.canteen, week = %fragment.key, "not combining empty week");
        return Ok(menu);
    }

    menu.weeks.insert(fragment.key, fragment);
    Ok(menu)
}
