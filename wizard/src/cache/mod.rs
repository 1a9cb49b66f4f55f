//! In-memory caches

pub mod parameters;
