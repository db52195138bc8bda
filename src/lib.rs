pub mod ai_driver;
pub mod config;
pub mod data;
pub mod geometry;
pub mod race;
pub mod track;
pub mod vehicle;
