//! Output formatting for CLI commands

pub mod colors;
pub mod human;
pub mod json;
