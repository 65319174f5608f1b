#![forbid(unsafe_code)]

pub mod analyze;
pub mod cache;
pub mod clean;
pub mod cli;
pub mod config;
pub mod extract;
pub mod formats;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod scrape;
pub mod store;
pub mod table;
