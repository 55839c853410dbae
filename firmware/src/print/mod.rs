//! G-code printing over the printer link.
//!
//! | Module     | Role                                                  |
//! |------------|-------------------------------------------------------|
//! | `gcode`    | comment stripping, blocking lines, header/reply parse |
//! | `reader`   | bounded line reader over a stored file                |
//! | `progress` | bytes-consumed progress and remaining-time estimate   |
//! | `params`   | cached temperatures, setpoints, weight, progress      |
//! | `link`     | line send, ack wait, `M105` query                     |
//! | `job`      | pause/stop flags of the running job                   |
//! | `streamer` | the print job itself (own task)                       |
//! | `service`  | printer verbs on the companion link                   |

pub mod gcode;
pub mod job;
pub mod link;
pub mod params;
pub mod progress;
pub mod reader;
pub mod service;
pub mod streamer;

pub use job::JobControl;
pub use link::{AckOutcome, PrinterLink, TempQuery};
pub use params::{ParamSnapshot, PrinterParams};
pub use service::PrintService;
pub use streamer::{JobOutcome, JobReport, PrintDeps, PrintStreamer, PrintTiming};
