//! Background workers

pub mod keep_alive;
pub mod log_tail;
pub mod poller;
