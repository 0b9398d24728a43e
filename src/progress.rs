use std::io::{self, Write};
use std::time::Instant;

use crate::extract::ExtractEvent;

/// Elapsed-stamped stderr reporter for CLI runs. The core pipeline only emits
/// structured events; this is one possible sink for them.
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.enabled {
            return;
        }
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {}", msg.as_ref());
    }

    pub fn handle(&self, event: &ExtractEvent) {
        match event {
            ExtractEvent::ChunkStarted {
                index,
                total,
                units,
            } => {
                self.info(format!("Chunk {}/{total}: {units} units", index + 1));
            }
            ExtractEvent::AttemptFailed {
                index,
                attempt,
                reason,
                backoff,
            } => {
                self.info(format!(
                    "Chunk {} attempt {attempt} failed: {reason} (retry in {}ms)",
                    index + 1,
                    backoff.as_millis()
                ));
            }
            ExtractEvent::ChunkExtracted {
                index,
                candidates,
                attempts,
            } => {
                self.info(format!(
                    "Chunk {}: {candidates} candidate pairs (attempts: {attempts})",
                    index + 1
                ));
            }
            ExtractEvent::ChunkFailed {
                index,
                attempts,
                reason,
            } => {
                self.info(format!(
                    "Chunk {} failed after {attempts} attempts: {reason}",
                    index + 1
                ));
            }
            ExtractEvent::Progress { percent } => {
                self.info(format!("Progress: {percent}%"));
            }
        }
    }
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
