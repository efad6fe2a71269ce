pub mod combine;
pub mod config;
pub mod deepl;
pub mod encoding;
pub mod enums;
pub mod fetch;
pub mod openmensa_feed;
pub mod pipeline;
pub mod publish;
pub mod reformat;
pub mod translate;
pub mod translation_cache;
pub mod week;
