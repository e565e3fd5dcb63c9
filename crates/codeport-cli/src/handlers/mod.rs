//! Command handlers.

pub mod refactor;
pub mod serve;
pub mod tools;
