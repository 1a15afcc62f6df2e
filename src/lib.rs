//! HTTP calculator with a persistent history of results.

pub mod api;
pub mod args;
pub mod calc;
pub mod config;
pub mod history;
pub mod logging;
