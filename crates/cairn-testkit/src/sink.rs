//! Recording configuration sink

use async_trait::async_trait;
use cairn_core::effects::{ConfigSinkEffects, RestartMode, SinkError};
use cairn_core::{Fingerprint, RenderedConfig};
use parking_lot::Mutex;

/// One call made against the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    /// Configuration applied
    Apply(Fingerprint),
    /// Service restarted
    Restart(RestartMode),
}

/// Sink that records calls and can inject failures
#[derive(Debug, Default)]
pub struct RecordingConfigSink {
    calls: Mutex<Vec<SinkCall>>,
    last_content: Mutex<Option<Vec<u8>>>,
    fail_apply: Mutex<bool>,
    fail_restart: Mutex<bool>,
}

impl RecordingConfigSink {
    /// Sink that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    /// Restarts only, in order
    pub fn restarts(&self) -> Vec<RestartMode> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Restart(mode) => Some(*mode),
                SinkCall::Apply(_) => None,
            })
            .collect()
    }

    /// Number of successful applies
    pub fn apply_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SinkCall::Apply(_)))
            .count()
    }

    /// Last applied configuration as text
    pub fn last_content(&self) -> Option<String> {
        self.last_content
            .lock()
            .as_ref()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }

    /// Make applies fail
    pub fn fail_apply(&self, fail: bool) {
        *self.fail_apply.lock() = fail;
    }

    /// Make restarts fail
    pub fn fail_restart(&self, fail: bool) {
        *self.fail_restart.lock() = fail;
    }
}

#[async_trait]
impl ConfigSinkEffects for RecordingConfigSink {
    async fn apply(&self, config: &RenderedConfig) -> Result<(), SinkError> {
        if *self.fail_apply.lock() {
            return Err(SinkError::new("injected apply failure"));
        }
        *self.last_content.lock() = Some(config.content().to_vec());
        self.calls.lock().push(SinkCall::Apply(config.fingerprint()));
        Ok(())
    }

    async fn restart(&self, mode: RestartMode) -> Result<(), SinkError> {
        if *self.fail_restart.lock() {
            return Err(SinkError::new("service did not come up"));
        }
        self.calls.lock().push(SinkCall::Restart(mode));
        Ok(())
    }
}
