//! Canteen menu ingestion: fetches upstream menu pages, parses them into
//! weekly fragments, merges them per canteen, translates dish titles and
//! publishes the result as a tree of static JSON files.

pub mod error;
pub mod model;
pub mod parsers;
pub mod services;
