//! G-code streaming job.
//!
//! ```text
//!   prepare: open → size > 0 → scan header for print time → rewind
//!   run:     ┌──────────────────────────────────────────────────────┐
//!            │ stop? ─▶ exit                                        │
//!            │ read line ── EOF ─▶ exit (completed)                 │
//!            │ paused? ─▶ poll until resumed (stop ─▶ exit)         │
//!            │ progress / ETA                                       │
//!            │ strip comment, skip blank                            │
//!            │ send ── error ─▶ exit (failed)                       │
//!            │ wait ack (standard | blocking timeout), log timeout  │
//!            └──────────────────────────────────────────────────────┘
//!   cleanup (JobGuard, every exit path): flags cleared, links Idle,
//!            display Idle
//! ```

use std::sync::Arc;

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use super::gcode::{HEADER_SCAN, LineKind, classify, parse_print_time, strip_comment};
use super::job::JobControl;
use super::link::{AckOutcome, PrinterLink};
use super::params::PrinterParams;
use super::progress::ProgressTracker;
use super::reader::LineReader;
use crate::app::events::{FileName, MachineStatus, StatusEvent};
use crate::app::ports::{FileHandle, FileStore, StatusSink, StorageError};
use crate::config::{SystemConfig, millis};
use crate::error::{Error, PrintError, Result};
use crate::link_state::LinkState;
use crate::sync::sleep;

// ── Collaborators and timing ──────────────────────────────────

#[derive(Clone)]
pub struct PrintDeps {
    pub store: Arc<dyn FileStore>,
    pub link: Arc<PrinterLink>,
    pub params: Arc<PrinterParams>,
    pub links: Arc<LinkState>,
    pub status: Arc<dyn StatusSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintTiming {
    pub ack_timeout: Duration,
    pub blocking_ack_timeout: Duration,
    pub pause_poll: Duration,
    pub eta_refresh: Duration,
}

impl PrintTiming {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            ack_timeout: millis(cfg.ack_timeout_ms),
            blocking_ack_timeout: millis(cfg.blocking_ack_timeout_ms),
            pause_poll: millis(cfg.pause_poll_ms),
            eta_refresh: millis(cfg.eta_refresh_ms),
        }
    }

    pub fn ack_timeout_for(&self, kind: LineKind) -> Duration {
        match kind {
            LineKind::Blocking => self.blocking_ack_timeout,
            LineKind::Standard => self.ack_timeout,
        }
    }
}

// ── Report ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// End of file reached.
    Completed,
    /// Stop requested (stop-print, emergency stop).
    Stopped,
    /// Read or transmit failure.
    Failed(Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub file_name: FileName,
    /// G-code lines sent to the printer (blank and comment lines excluded).
    pub lines_sent: u32,
    /// Lines whose ack never came.
    pub ack_timeouts: u32,
    pub outcome: JobOutcome,
}

// ── Cleanup guard ─────────────────────────────────────────────

/// Restores shared state however the job ends, panics included.
struct JobGuard<'a> {
    deps: &'a PrintDeps,
    control: &'a JobControl,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.control.clear();
        self.deps.links.release_companion();
        self.deps.links.release_printer();
        self.deps
            .status
            .emit(&StatusEvent::Status(MachineStatus::Idle));
    }
}

// ── Streamer ──────────────────────────────────────────────────

pub struct PrintStreamer {
    name: FileName,
    deps: PrintDeps,
    timing: PrintTiming,
    control: Arc<JobControl>,
    reader: LineReader,
    size: u64,
    initial_secs: u32,
}

impl PrintStreamer {
    /// Open `name` and read its header. Fails without touching any shared
    /// state.
    pub fn prepare(
        name: FileName,
        deps: PrintDeps,
        timing: PrintTiming,
        control: Arc<JobControl>,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(PrintError::EmptySelection.into());
        }
        let mut file = deps.store.open_read(&name)?;
        let size = file.size();
        if size == 0 {
            warn!("PRINT: '{}' is empty", name);
            return Err(PrintError::EmptyFile.into());
        }

        let mut header = [0u8; HEADER_SCAN];
        let n = read_header(file.as_mut(), &mut header)?;
        let initial_secs = match parse_print_time(&header[..n]) {
            Some(secs) => {
                info!("PRINT: header estimate {} s", secs);
                secs
            }
            None => {
                debug!("PRINT: no print-time comment in header");
                0
            }
        };
        file.seek(0)?;

        Ok(Self {
            name,
            deps,
            timing,
            control,
            reader: LineReader::new(file),
            size,
            initial_secs,
        })
    }

    pub fn initial_secs(&self) -> u32 {
        self.initial_secs
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stream the file to the printer. Blocks for the whole job.
    pub fn run(self) -> JobReport {
        let Self {
            name,
            deps,
            timing,
            control,
            mut reader,
            size,
            initial_secs,
        } = self;

        let link = Arc::clone(&deps.link);
        let _session = link.session();
        let _guard = JobGuard {
            deps: &deps,
            control: &control,
        };

        deps.params.start_job(initial_secs);
        deps.status
            .emit(&StatusEvent::Status(MachineStatus::Printing));
        info!("PRINT: '{}' started ({} bytes)", name, size);

        let mut progress = ProgressTracker::new(size, initial_secs, timing.eta_refresh);
        let mut lines_sent = 0u32;
        let mut ack_timeouts = 0u32;
        let started = Instant::now();

        let outcome = 'job: loop {
            if control.stop_requested() {
                info!("PRINT: stop requested");
                break JobOutcome::Stopped;
            }
            let raw = match reader.next_line() {
                Ok(Some(l)) => l,
                Ok(None) => break JobOutcome::Completed,
                Err(e) => {
                    warn!("PRINT: read failed: {}", e);
                    break JobOutcome::Failed(e.into());
                }
            };

            if control.is_paused() {
                info!("PRINT: paused");
                deps.status.emit(&StatusEvent::Status(MachineStatus::Paused));
                while control.is_paused() {
                    if control.stop_requested() {
                        info!("PRINT: stop requested while paused");
                        break 'job JobOutcome::Stopped;
                    }
                    sleep(timing.pause_poll);
                }
                info!("PRINT: resumed");
                deps.status
                    .emit(&StatusEvent::Status(MachineStatus::Printing));
            }

            progress.update(reader.consumed(), Instant::now());
            deps.params
                .set_progress(progress.progress(), progress.remaining_secs());

            let Ok(text) = core::str::from_utf8(&raw) else {
                warn!("PRINT: skipping non-text line");
                continue;
            };
            let code = strip_comment(text);
            if code.is_empty() {
                continue;
            }

            let kind = classify(code);
            link.discard_replies();
            if let Err(e) = link.send_line(code) {
                warn!("PRINT: send failed at line {}: {}", lines_sent + 1, e);
                break JobOutcome::Failed(e.into());
            }
            lines_sent += 1;

            let timeout = timing.ack_timeout_for(kind);
            match link.wait_ack(timeout, &|| control.stop_requested()) {
                AckOutcome::Ack => {}
                AckOutcome::TimedOut => {
                    ack_timeouts += 1;
                    warn!("PRINT: no ack for line {} '{}'", lines_sent, code);
                }
                // Seen at the top of the loop.
                AckOutcome::Cancelled => {}
            }
        };

        if let Err(e) = reader.into_inner().close() {
            warn!("PRINT: close failed: {}", e);
        }
        if outcome == JobOutcome::Completed {
            progress.complete();
            deps.params.set_progress(100, 0);
        }
        info!(
            "PRINT: '{}' ended {:?}: {} lines, {} ack timeouts, {} ms",
            name,
            outcome,
            lines_sent,
            ack_timeouts,
            started.elapsed().as_millis()
        );

        JobReport {
            file_name: name,
            lines_sent,
            ack_timeouts,
            outcome,
        }
    }
}

/// Fill `buf` from the start of the file, stopping early at EOF.
fn read_header(file: &mut dyn FileHandle, buf: &mut [u8]) -> core::result::Result<usize, StorageError> {
    let mut n = 0;
    while n < buf.len() {
        let got = file.read(&mut buf[n..])?;
        if got == 0 {
            break;
        }
        n += got;
    }
    Ok(n)
}
