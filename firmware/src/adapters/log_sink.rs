//! Log-based status sink adapter.
//!
//! Implements [`StatusSink`] by writing display-bound status events to the
//! console logger. The display driver on the target implements the same
//! trait and renders the events into its widgets.

use log::info;

use crate::app::events::StatusEvent;
use crate::app::ports::StatusSink;

/// Adapter that logs every [`StatusEvent`] to the console.
pub struct LogStatusSink;

impl LogStatusSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for LogStatusSink {
    fn emit(&self, event: &StatusEvent) {
        match event {
            StatusEvent::Status(s) => {
                info!("UI | status={}", s.as_str());
            }
            StatusEvent::Temperatures { nozzle, bed } => {
                info!("UI | nozzle={}\u{00b0}C bed={}\u{00b0}C", nozzle, bed);
            }
            StatusEvent::Progress(p) => {
                info!("UI | progress={}%", p);
            }
            StatusEvent::RemainingTime(t) => {
                info!(
                    "UI | remaining={:02}:{:02}:{:02}",
                    t.hours, t.minutes, t.seconds
                );
            }
            StatusEvent::FilamentWeight(g) => {
                info!("UI | filament={}g", g);
            }
            StatusEvent::FilesListed(n) => {
                info!("UI | files listed={}", n);
            }
            StatusEvent::UploadComplete(name) => {
                info!("UI | upload complete: {}", name);
            }
        }
    }
}
