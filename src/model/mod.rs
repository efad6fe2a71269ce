pub mod canteen;
pub mod config;
pub mod dish;
pub mod label;
pub mod language;
pub mod menu;
