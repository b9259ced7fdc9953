//! Command implementations

pub mod context;
pub mod diff;
pub mod merge;
pub mod pull;
pub mod repo;
pub mod style;
