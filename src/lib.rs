//! Work-log tracking with ticket imports.
//!
//! The library half of the `alignzo` CLI: timers that turn into work logs,
//! manual log entry, and a CSV ticket-import pipeline that maps incident
//! dumps onto internal projects and users.

pub mod commands;
pub mod config;
pub mod csv;
pub mod db;
pub mod feed;
pub mod import;
pub mod models;
