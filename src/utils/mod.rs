//! Shared utilities.

pub mod formats;
pub mod naming;
