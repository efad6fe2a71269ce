use chrono::NaiveDate;

use crate::error::ParseError;
use crate::model::canteen::{Canteen, Provider};
use crate::model::dish::DedupKey;
use crate::model::menu::{WeekFragment, WeekKey};

pub mod normalize;
pub mod openmensa;
pub mod studentenwerk;
mod studentenwerk_prices;
pub mod stwno;

/// What the parser is asked to produce from one fetched page.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    pub canteen: Canteen,
    /// Date the page was fetched for; used to attribute errors.
    pub date: NaiveDate,
    /// Week the resulting fragment is keyed by. Days outside it are skipped.
    pub week: WeekKey,
    pub dedup: DedupKey,
}

/// Parses one upstream page with the parser matching the canteen's provider.
pub fn parse_page(text: &str, ctx: &ParseContext) -> Result<WeekFragment, ParseError> {
    match ctx.canteen.provider() {
        Provider::Studentenwerk { .. } => studentenwerk::parse(text, ctx),
        Provider::OpenMensa { .. } => openmensa::parse(text, ctx),
        Provider::Stwno { .. } => stwno::parse(text, ctx),
    }
}
