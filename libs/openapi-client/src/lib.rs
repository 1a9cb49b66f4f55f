//! Wire models shared with the installer service

pub mod models;
