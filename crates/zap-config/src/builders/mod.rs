//! Builders for constructing configuration values in code.

pub mod config;
