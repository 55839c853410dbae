//! Simulated motion controller on the printer link.
//!
//! Answers every received G-code line with `ok`, and `M105` with a
//! temperature report. Heater setpoints from `M104`/`M140` (and their
//! wait variants) are reached instantly. Replies are delivered through the
//! printer link's receive channel, as the idle-line interrupt would.

use std::fmt::Write as _;
use std::sync::Arc;

use log::debug;

use crate::print::gcode::{atoi, strip_comment};
use crate::transport::route::PrinterRoute;
use crate::transport::rx::RxChannel;
use crate::transport::uart::{TxDone, UartError, UartPort};

pub struct SimPrinter {
    rx: Arc<RxChannel<PrinterRoute>>,
    nozzle: i32,
    bed: i32,
    halted: bool,
}

impl SimPrinter {
    pub fn new(rx: Arc<RxChannel<PrinterRoute>>) -> Self {
        Self {
            rx,
            nozzle: 21,
            bed: 21,
            halted: false,
        }
    }

    fn setpoint(line: &str) -> Option<i32> {
        let at = line.find('S')?;
        atoi(&line[at + 1..])
    }

    fn reply_to(&mut self, line: &str, out: &mut String) {
        let word = line.split_ascii_whitespace().next().unwrap_or("");
        match word {
            "M112" => {
                self.halted = true;
                return;
            }
            "M104" | "M109" => self.nozzle = Self::setpoint(line).unwrap_or(self.nozzle),
            "M140" | "M190" => self.bed = Self::setpoint(line).unwrap_or(self.bed),
            _ => {}
        }
        if self.halted {
            return;
        }
        if word == "M105" {
            let _ = writeln!(
                out,
                "ok T:{}.0 /{}.0 B:{}.0 /{}.0",
                self.nozzle, self.nozzle, self.bed, self.bed
            );
        } else {
            out.push_str("ok\n");
        }
    }
}

impl UartPort for SimPrinter {
    fn start_transmit(&mut self, data: &[u8], done: TxDone) -> Result<(), UartError> {
        let text = String::from_utf8_lossy(data).into_owned();
        done.complete();

        let mut reply = String::new();
        for line in text.lines() {
            let code = strip_comment(line);
            if !code.is_empty() {
                debug!("SIM: < {}", code);
                self.reply_to(code, &mut reply);
            }
        }
        if !reply.is_empty() {
            self.rx.on_idle_line(reply.as_bytes());
        }
        Ok(())
    }
}
