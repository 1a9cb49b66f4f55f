//! Wizard-side models

pub mod deployment;
