#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod data;
pub mod logging;
pub mod preview;
pub mod progress;
pub mod report;
pub mod results;
pub mod source;
pub mod subreddits;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
