//! gifgrab - resolve a web page into downloadable animated media and save it.
//!
//! The core is a target-resolution pipeline: site-specific API strategies,
//! a generic HTML/CSS scan, and a live browser capture fallback converge on
//! one normalized list of download targets, which a sequential executor
//! turns into uniquely-named files.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod services;
pub mod strategies;
pub mod utils;
