//! Periodic parameter poller.
//!
//! ```text
//!   every telemetry_interval:
//!     printer not Busy    ──▶ M105 query ──▶ cached temperatures
//!     companion not Busy  ──▶ load cell  ──▶ cached filament weight
//!     printer Busy        ──▶ publish progress + remaining time
//!     always              ──▶ publish temperatures
//! ```
//!
//! Runs as its own low-priority task. While a job streams, temperatures
//! come only from the telemetry fields of the printer's replies.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_time::Duration;
use log::{debug, info};

use crate::app::events::StatusEvent;
use crate::app::ports::{StatusSink, WeightSensor};
use crate::config::{SystemConfig, millis};
use crate::link_state::{CompanionState, LinkState, PrinterState};
use crate::print::link::{PrinterLink, TempQuery};
use crate::print::params::PrinterParams;
use crate::sync::sleep;

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub temp_query: Option<TempQuery>,
    pub weight_read: bool,
    pub job_published: bool,
}

pub struct TelemetryPoller {
    link: Arc<PrinterLink>,
    params: Arc<PrinterParams>,
    links: Arc<LinkState>,
    weight: Arc<dyn WeightSensor>,
    status: Arc<dyn StatusSink>,
    interval: Duration,
    query_timeout: Duration,
}

impl TelemetryPoller {
    pub fn new(
        cfg: &SystemConfig,
        link: Arc<PrinterLink>,
        params: Arc<PrinterParams>,
        links: Arc<LinkState>,
        weight: Arc<dyn WeightSensor>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            link,
            params,
            links,
            weight,
            status,
            interval: millis(cfg.telemetry_interval_ms),
            query_timeout: millis(cfg.temp_query_timeout_ms),
        }
    }

    pub fn tick(&self) -> PollReport {
        let mut report = PollReport::default();
        let links = self.links.snapshot();

        if links.printer != PrinterState::Busy {
            match self.link.query_temperatures(self.query_timeout) {
                Ok(q) => report.temp_query = Some(q),
                Err(e) => debug!("POLL: M105 not sent: {}", e),
            }
        }

        if links.companion != CompanionState::Busy {
            let g = self.weight.read_grams();
            self.params.set_filament_weight(g);
            self.status.emit(&StatusEvent::FilamentWeight(g));
            report.weight_read = true;
        }

        let p = self.params.snapshot();
        if links.printer == PrinterState::Busy {
            self.status.emit(&StatusEvent::Progress(p.progress));
            self.status
                .emit(&StatusEvent::RemainingTime(p.remaining_time()));
            report.job_published = true;
        }
        self.status.emit(&StatusEvent::Temperatures {
            nozzle: p.nozzle_temp,
            bed: p.bed_temp,
        });
        report
    }

    /// Poll until `shutdown` is set.
    pub fn run(&self, shutdown: &AtomicBool) {
        info!("POLL: running (interval={}ms)", self.interval.as_millis());
        while !shutdown.load(Ordering::Acquire) {
            let _ = self.tick();
            sleep(self.interval);
        }
        info!("POLL: stopped");
    }
}
