//! Outbound status events.
//!
//! The transfer, print and telemetry services emit these through the
//! [`StatusSink`](super::ports::StatusSink) port. The display layer on the
//! other side decides how to render them.

/// File names as carried on the companion link.
pub type FileName = heapless::String<{ crate::transfer::MAX_FILE_NAME }>;

/// Coarse machine status shown on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineStatus {
    Idle,
    Receiving,
    Printing,
    Paused,
    Error,
}

impl MachineStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Receiving => "Receiving",
            Self::Printing => "Printing",
            Self::Paused => "Paused",
            Self::Error => "Error",
        }
    }
}

/// Structured events fed to the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The machine status text changed.
    Status(MachineStatus),

    /// Latest cached nozzle/bed temperatures (°C).
    Temperatures { nozzle: i32, bed: i32 },

    /// Job progress, 0–100.
    Progress(u8),

    /// Estimated remaining print time.
    RemainingTime(RemainingTime),

    /// Spool weight in grams.
    FilamentWeight(i32),

    /// A file listing was produced with this many entries.
    FilesListed(usize),

    /// A received file passed verification.
    UploadComplete(FileName),
}

/// Remaining time split for the display's h/m/s fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingTime {
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
}

impl RemainingTime {
    pub const fn from_secs(total: u32) -> Self {
        Self {
            hours: total / 3600,
            minutes: ((total % 3600) / 60) as u8,
            seconds: (total % 60) as u8,
        }
    }
}
