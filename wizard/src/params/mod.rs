//! Component parameter handling

pub mod components;
pub mod normalize;
pub mod units;
