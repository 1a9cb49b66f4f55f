//! Installer service REST client

pub mod client;
pub mod component_change;
pub mod components;
pub mod deployments;
pub mod pipeline;
pub mod service;
