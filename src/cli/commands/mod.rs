//! CLI Commands

pub mod complete;
pub mod config;
pub mod structure;
pub mod tokens;
