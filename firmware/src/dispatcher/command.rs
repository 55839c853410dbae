//! Companion-link command vocabulary and frame grammar.
//!
//! ```text
//!   frame    := VERB | VERB "[" ARGS "]"      terminated by "\n" ("\r" ignored)
//!   response := Key ":" Value "\n"
//! ```
//!
//! The verb set is closed: every verb maps to a slot in the dispatcher's
//! handler table by its `repr(u8)` discriminant.

use crate::error::ProtocolError;

/// Maximum length of one command frame, terminator excluded.
pub const CMD_FRAME_SIZE: usize = 100;

/// Depth of the dispatcher's command queue.
pub const CMD_QUEUE_DEPTH: usize = 10;

/// Capacity of a query response (file listings are the largest).
pub const RESPONSE_SIZE: usize = 512;

/// A command frame copied out of a receive buffer.
pub type CommandFrame = heapless::String<CMD_FRAME_SIZE>;

/// A query handler's response, `Key:Value` without the terminator.
pub type Response = heapless::String<RESPONSE_SIZE>;

pub type CommandQueue = crate::sync::Queue<CommandFrame, CMD_QUEUE_DEPTH>;

/// Whether a verb expects a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbKind {
    Notification,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verb {
    WifiStatus = 0,
    StartTransmission = 1,
    SetFilename = 2,
    TransmissionComplete = 3,
    StartPrint = 4,
    PausePrint = 5,
    StopPrint = 6,
    Home = 7,
    GetRemainingTime = 8,
    GetProgress = 9,
    GetNozzleTemp = 10,
    GetBedTemp = 11,
    SetNozzleTemp = 12,
    SetBedTemp = 13,
    GetFilamentWeight = 14,
    EmergencyStop = 15,
    ListFiles = 16,
}

impl Verb {
    /// Total number of verbs — sizes the handler table.
    pub const COUNT: usize = 17;

    pub const ALL: [Self; Self::COUNT] = [
        Self::WifiStatus,
        Self::StartTransmission,
        Self::SetFilename,
        Self::TransmissionComplete,
        Self::StartPrint,
        Self::PausePrint,
        Self::StopPrint,
        Self::Home,
        Self::GetRemainingTime,
        Self::GetProgress,
        Self::GetNozzleTemp,
        Self::GetBedTemp,
        Self::SetNozzleTemp,
        Self::SetBedTemp,
        Self::GetFilamentWeight,
        Self::EmergencyStop,
        Self::ListFiles,
    ];

    /// Token on the wire.
    pub const fn wire(self) -> &'static str {
        match self {
            Self::WifiStatus => "WIFI_STATUS",
            Self::StartTransmission => "START_TRANSMISSION",
            Self::SetFilename => "SET_FILENAME",
            Self::TransmissionComplete => "TRANSMISSION_OVER",
            Self::StartPrint => "START_PRINT",
            Self::PausePrint => "PAUSE_PRINT",
            Self::StopPrint => "STOP_PRINT",
            Self::Home => "GO_HOME",
            Self::GetRemainingTime => "GET_REMAINING_TIME",
            Self::GetProgress => "GET_PROGRESS",
            Self::GetNozzleTemp => "GET_NOZZLE_TEMP",
            Self::GetBedTemp => "GET_BED_TEMP",
            Self::SetNozzleTemp => "SET_NOZZLE_TEMP",
            Self::SetBedTemp => "SET_BED_TEMP",
            Self::GetFilamentWeight => "GET_FILAMENT_WEIGHT",
            Self::EmergencyStop => "EMERGENCY_STOP",
            Self::ListFiles => "GET_ALL_FILES",
        }
    }

    pub fn from_wire(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.wire() == token)
    }

    pub const fn kind(self) -> VerbKind {
        match self {
            Self::TransmissionComplete
            | Self::GetRemainingTime
            | Self::GetProgress
            | Self::GetNozzleTemp
            | Self::GetBedTemp
            | Self::GetFilamentWeight
            | Self::ListFiles => VerbKind::Query,
            _ => VerbKind::Notification,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Split a frame into verb and argument text.
///
/// `ARGS` is everything between the first `[` and the last `]`.
pub fn parse_frame(frame: &str) -> Result<(Verb, &str), ProtocolError> {
    let frame = frame.trim();
    let (token, args) = match frame.find('[') {
        None => (frame, ""),
        Some(open) => {
            let close = frame.rfind(']').ok_or(ProtocolError::MalformedArgument)?;
            if close < open {
                return Err(ProtocolError::MalformedArgument);
            }
            (&frame[..open], &frame[open + 1..close])
        }
    };
    let verb = Verb::from_wire(token.trim_end()).ok_or(ProtocolError::UnknownVerb)?;
    Ok((verb, args))
}

/// Split received text into non-empty, newline-delimited frames.
/// A trailing segment without terminator still counts as a frame: the idle
/// line marks the end of the burst.
pub fn split_frames(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes
        .split(|&b| b == b'\n')
        .map(|seg| seg.strip_suffix(b"\r").unwrap_or(seg))
        .filter(|seg| !seg.trim_ascii().is_empty())
}

/// Copy one raw frame into dispatcher-owned storage.
pub fn copy_frame(raw: &[u8]) -> Result<CommandFrame, ProtocolError> {
    let text = core::str::from_utf8(raw).map_err(|_| ProtocolError::NotText)?;
    CommandFrame::try_from(text.trim()).map_err(|_| ProtocolError::FrameTooLong)
}
