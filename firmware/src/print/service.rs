//! Printer-side command handlers.
//!
//! Query handlers answer from the parameter cache; only the poller and
//! these handlers' notification siblings talk to the printer directly.

use core::fmt::Write as _;
use std::sync::Arc;

use log::{info, warn};

use super::job::JobControl;
use super::params::PrinterParams;
use super::streamer::{JobReport, PrintDeps, PrintStreamer, PrintTiming};
use crate::app::events::{FileName, StatusEvent};
use crate::app::ports::{DirEntry, WeightSensor};
use crate::config::SystemConfig;
use crate::dispatcher::command::{RESPONSE_SIZE, Response, Verb};
use crate::dispatcher::registry::CommandHandler;
use crate::error::{Error, PrintError, ProtocolError, Result};
use crate::link_state::{CompanionState, PrinterState};
use crate::tasks::{TaskSlot, TaskSpec, spawn_task};
use crate::transfer::service::validate_file_name;

/// Home, then both heaters off.
pub const STOP_GCODE: &str = "G28\nM104 S0\nM140 S0\n";
pub const HOME_GCODE: &str = "G28\n";
pub const ESTOP_GCODE: &str = "M112\n";
pub const HEATERS_OFF_GCODE: &str = "M104 S0\nM140 S0\n";

pub struct PrintService {
    deps: PrintDeps,
    timing: PrintTiming,
    weight: Arc<dyn WeightSensor>,
    max_nozzle_c: i32,
    max_bed_c: i32,
    control: Arc<JobControl>,
    slot: TaskSlot<JobReport>,
}

impl PrintService {
    /// Verbs served by this handler.
    pub const VERBS: [Verb; 13] = [
        Verb::StartPrint,
        Verb::PausePrint,
        Verb::StopPrint,
        Verb::Home,
        Verb::GetRemainingTime,
        Verb::GetProgress,
        Verb::GetNozzleTemp,
        Verb::GetBedTemp,
        Verb::SetNozzleTemp,
        Verb::SetBedTemp,
        Verb::GetFilamentWeight,
        Verb::EmergencyStop,
        Verb::ListFiles,
    ];

    pub fn new(cfg: &SystemConfig, deps: PrintDeps, weight: Arc<dyn WeightSensor>) -> Self {
        Self {
            deps,
            timing: PrintTiming::from_config(cfg),
            weight,
            max_nozzle_c: cfg.max_nozzle_temp_c,
            max_bed_c: cfg.max_bed_temp_c,
            control: Arc::new(JobControl::new()),
            slot: TaskSlot::new("print"),
        }
    }

    pub fn is_printing(&self) -> bool {
        self.slot.is_running()
    }

    pub fn control(&self) -> &Arc<JobControl> {
        &self.control
    }

    pub fn params(&self) -> &Arc<PrinterParams> {
        &self.deps.params
    }

    /// Wait for the current job to end and collect its report.
    pub fn join_job(&self, period: embassy_time::Duration, retries: u32) -> Option<JobReport> {
        self.slot.join_within(period, retries)
    }

    // ── Job control ───────────────────────────────────────────

    fn start_print(&self, args: &str) -> Result<()> {
        if self.slot.is_running() {
            return Err(Error::AlreadyRunning("print"));
        }
        let name: FileName = if args.trim().is_empty() {
            FileName::new()
        } else {
            validate_file_name(args)?
        };

        let streamer = PrintStreamer::prepare(
            name,
            self.deps.clone(),
            self.timing,
            Arc::clone(&self.control),
        )?;

        match self.deps.links.try_claim_printer() {
            Ok(()) => {}
            Err(PrinterState::Error) => {
                warn!("PRINT: printer in error state, start refused");
                return Err(PrintError::PrinterFault.into());
            }
            Err(_) => return Err(Error::AlreadyRunning("print")),
        }
        self.control.clear();

        let res = self
            .slot
            .start(|| spawn_task(TaskSpec::PRINT, move || streamer.run()));
        if let Err(e) = res {
            warn!("PRINT: job not started: {}", e);
            self.deps.links.release_printer();
            self.deps.links.release_companion();
            return Err(e);
        }
        info!("PRINT: job spawned");
        Ok(())
    }

    fn pause_print(&self) -> Result<()> {
        if !self.slot.is_running() {
            return Err(PrintError::NotPrinting.into());
        }
        let paused = self.control.toggle_pause();
        info!("PRINT: {}", if paused { "pause requested" } else { "resume requested" });
        Ok(())
    }

    fn stop_print(&self) -> Result<()> {
        self.control.set_paused(false);
        self.deps.links.release_companion();
        if self.slot.is_running() {
            info!("PRINT: stop requested");
            self.control.request_stop();
        } else if self.deps.links.printer() == PrinterState::Error {
            // Nothing running; a deliberate stop acknowledges the fault.
            self.deps.links.set_printer(PrinterState::Idle);
        }
        self.deps.link.send_raw(STOP_GCODE)?;
        Ok(())
    }

    fn home(&self) -> Result<()> {
        self.deps.link.send_raw(HOME_GCODE)?;
        Ok(())
    }

    fn emergency_stop(&self) -> Result<()> {
        warn!("PRINT: EMERGENCY STOP");
        let sent = self.deps.link.send_raw(ESTOP_GCODE);
        self.control.request_stop();
        self.control.set_paused(false);
        let heaters = self.deps.link.send_raw(HEATERS_OFF_GCODE);
        self.deps.links.set_printer(PrinterState::Error);
        sent?;
        heaters?;
        Ok(())
    }

    // ── Setpoints ─────────────────────────────────────────────

    fn set_temp(&self, verb: Verb, args: &str) -> Result<()> {
        let requested = super::gcode::atoi(args).ok_or(ProtocolError::MalformedArgument)?;
        let (max, code) = match verb {
            Verb::SetNozzleTemp => (self.max_nozzle_c, "M104"),
            _ => (self.max_bed_c, "M140"),
        };
        let c = requested.clamp(0, max);
        if c != requested {
            warn!("PRINT: {} setpoint {} clamped to {}", code, requested, c);
        }
        match verb {
            Verb::SetNozzleTemp => self.deps.params.set_nozzle_target(c),
            _ => self.deps.params.set_bed_target(c),
        }
        let mut cmd: heapless::String<24> = heapless::String::new();
        let _ = writeln!(cmd, "{} S{}", code, c);
        self.deps.link.send_raw(&cmd)?;
        info!("PRINT: {} target {} C", code, c);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    fn remaining_time(&self, out: &mut Response) {
        let p = self.deps.params.snapshot();
        let _ = write!(out, "RemainingTime:{}", p.remaining_secs);
        self.deps
            .status
            .emit(&StatusEvent::RemainingTime(p.remaining_time()));
    }

    fn progress(&self, out: &mut Response) {
        let p = self.deps.params.progress();
        let _ = write!(out, "Progress:{}", p);
        self.deps.status.emit(&StatusEvent::Progress(p));
    }

    fn temperature(&self, verb: Verb, out: &mut Response) {
        let p = self.deps.params.snapshot();
        let _ = match verb {
            Verb::GetNozzleTemp => write!(out, "NozzleTemp:{}", p.nozzle_temp),
            _ => write!(out, "BedTemp:{}", p.bed_temp),
        };
        self.deps.status.emit(&StatusEvent::Temperatures {
            nozzle: p.nozzle_temp,
            bed: p.bed_temp,
        });
    }

    fn filament_weight(&self, out: &mut Response) {
        let grams = if self.deps.links.companion() == CompanionState::Busy {
            self.deps.params.filament_weight()
        } else {
            let g = self.weight.read_grams();
            self.deps.params.set_filament_weight(g);
            g
        };
        let _ = write!(out, "FilamentWeight:{}", grams);
        self.deps.status.emit(&StatusEvent::FilamentWeight(grams));
    }

    fn list_files(&self, out: &mut Response) -> Result<()> {
        let entries = match self.deps.store.list("/") {
            Ok(e) => e,
            Err(e) => {
                let _ = out.push_str("Files:Error");
                return Err(e.into());
            }
        };
        let count = format_file_list(&entries, out);
        self.deps.status.emit(&StatusEvent::FilesListed(count));
        Ok(())
    }
}

/// Write `Files:<names>` (or `Files:NoFiles`) into `out`, skipping
/// directories and hidden/system entries. Names that no longer fit (the
/// terminator included) are left out. Returns the number listed.
pub fn format_file_list(entries: &[DirEntry], out: &mut Response) -> usize {
    const PREFIX: &str = "Files:";
    let _ = out.push_str(PREFIX);
    let mut count = 0;
    for e in entries {
        if e.is_dir || e.hidden || e.system || e.name.is_empty() {
            continue;
        }
        let sep = usize::from(count > 0);
        // One byte stays free for the line terminator.
        if out.len() + sep + e.name.len() + 1 > RESPONSE_SIZE {
            break;
        }
        if sep == 1 {
            let _ = out.push(' ');
        }
        let _ = out.push_str(&e.name);
        count += 1;
    }
    if count == 0 {
        let _ = out.push_str("NoFiles");
    }
    count
}

impl CommandHandler for PrintService {
    fn handle(&self, verb: Verb, args: &str, response: Option<&mut Response>) -> Result<()> {
        match (verb, response) {
            (Verb::StartPrint, _) => self.start_print(args),
            (Verb::PausePrint, _) => self.pause_print(),
            (Verb::StopPrint, _) => self.stop_print(),
            (Verb::Home, _) => self.home(),
            (Verb::EmergencyStop, _) => self.emergency_stop(),
            (Verb::SetNozzleTemp | Verb::SetBedTemp, _) => self.set_temp(verb, args),
            (Verb::GetRemainingTime, Some(out)) => {
                self.remaining_time(out);
                Ok(())
            }
            (Verb::GetProgress, Some(out)) => {
                self.progress(out);
                Ok(())
            }
            (Verb::GetNozzleTemp | Verb::GetBedTemp, Some(out)) => {
                self.temperature(verb, out);
                Ok(())
            }
            (Verb::GetFilamentWeight, Some(out)) => {
                self.filament_weight(out);
                Ok(())
            }
            (Verb::ListFiles, Some(out)) => self.list_files(out),
            _ => Err(ProtocolError::UnknownVerb.into()),
        }
    }
}
