//! Resume record of a quit wizard session

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::WizardError;
use crate::filesys::file::File;
use crate::flow::fsm::Flow;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Where the operator left the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub flow: Flow,
    pub step: usize,
    pub saved_at_epoch_millis: i64,
}

/// Persists the resume record next to the session
pub struct ResumeStore {
    file: File,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl ResumeStore {
    pub fn new(file: File, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            file,
            window,
            clock,
        }
    }

    /// Record `step` of `flow` as of now
    pub async fn save(&self, flow: Flow, step: usize) -> Result<ResumeRecord, WizardError> {
        let record = ResumeRecord {
            flow,
            step,
            saved_at_epoch_millis: self.clock.now_epoch_millis(),
        };
        self.file.write_json(&record).await?;
        info!("Saved resume point: {} step {}", flow, step);
        Ok(record)
    }

    /// The saved record, if it is still fresh; a stale one is deleted
    pub async fn load(&self) -> Result<Option<ResumeRecord>, WizardError> {
        let Some(record) = self.file.read_json_opt::<ResumeRecord>().await? else {
            return Ok(None);
        };

        let age_millis = self.clock.now_epoch_millis() - record.saved_at_epoch_millis;
        if age_millis < 0 || age_millis as u128 >= self.window.as_millis() {
            debug!("Discarding resume record {} ms old", age_millis);
            self.file.delete().await?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    pub async fn clear(&self) -> Result<(), WizardError> {
        self.file.delete().await
    }
}
