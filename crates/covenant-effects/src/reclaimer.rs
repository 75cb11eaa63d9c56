//! Background sweeping of weak maps.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PermissionError;
use crate::weak_map::Sweep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimerConfig {
    /// Milliseconds between two sweeps.
    pub sweep_interval_ms: u64,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        ReclaimerConfig {
            sweep_interval_ms: 1000,
        }
    }
}

impl ReclaimerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Handle to a thread that periodically sweeps a target.
///
/// The thread exits when the handle is dropped or when the target itself has
/// been dropped.
pub struct Reclaimer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reclaimer {
    pub fn spawn(target: Weak<dyn Sweep>, config: ReclaimerConfig) -> Result<Self, PermissionError> {
        let (stop, stopped) = mpsc::channel::<()>();
        let interval = config.interval();
        let handle = thread::Builder::new()
            .name("covenant-reclaimer".into())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(target) = target.upgrade() else {
                            break;
                        };
                        let removed = target.sweep();
                        if removed > 0 {
                            debug!("Reclaimed {} stale weak entries", removed);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| PermissionError::ReclaimerSpawn {
                reason: e.to_string(),
            })?;
        Ok(Reclaimer {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
