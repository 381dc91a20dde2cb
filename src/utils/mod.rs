//! Shared helpers.

pub mod tokens;
