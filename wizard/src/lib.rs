//! OceanBase deployment wizard
//!
//! Client of the installer service and the engine behind the deployment
//! wizard: parameter normalization, secret encryption, task polling with
//! transport-failure tracking, and the step state machine tying them
//! together.

pub mod app;
pub mod cache;
pub mod errors;
pub mod filesys;
pub mod flow;
pub mod http;
pub mod logs;
pub mod models;
pub mod params;
pub mod secure;
pub mod storage;
pub mod utils;
pub mod workers;
