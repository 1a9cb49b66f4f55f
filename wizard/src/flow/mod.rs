//! Wizard flows: state machine, resume record and controller

pub mod controller;
pub mod fsm;
pub mod resume;
