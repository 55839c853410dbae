//! Unified error types for the PrintBridge controller core.
//!
//! One `Error` enum that every subsystem converts into, so the dispatcher
//! and the long-running tasks can log any failure the same way. All
//! variants are `Copy` and carry no heap data; they cross task boundaries
//! as plain values inside reports and handler results.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A UART send could not be started.
    Transport(TransportError),
    /// A command frame could not be understood.
    Protocol(ProtocolError),
    /// The file store rejected an operation.
    Storage(StorageError),
    /// The file transfer pipeline failed.
    Transfer(TransferError),
    /// A print job could not be started or controlled.
    Print(PrintError),
    /// A single-instance task is already alive.
    AlreadyRunning(&'static str),
    /// A task or queue could not be created.
    Task(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Transfer(e) => write!(f, "transfer: {e}"),
            Self::Print(e) => write!(f, "print: {e}"),
            Self::AlreadyRunning(task) => write!(f, "{task} task already running"),
            Self::Task(msg) => write!(f, "task: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Payload does not fit the link's send buffer.
    Oversized,
    /// The link's transmit lock was not released in time.
    LinkBusy,
    /// The UART refused to start the transmission.
    StartFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversized => write!(f, "payload exceeds send buffer"),
            Self::LinkBusy => write!(f, "link busy"),
            Self::StartFailed => write!(f, "transmission start failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The verb token is not in the command table.
    UnknownVerb,
    /// The argument is missing, unterminated, or not parseable.
    MalformedArgument,
    /// The frame exceeds the command frame capacity.
    FrameTooLong,
    /// The frame is not valid ASCII/UTF-8 text.
    NotText,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVerb => write!(f, "unknown verb"),
            Self::MalformedArgument => write!(f, "malformed argument"),
            Self::FrameTooLong => write!(f, "frame too long"),
            Self::NotText => write!(f, "frame is not text"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transfer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// Transmission-complete arrived with no transfer task alive.
    NotActive,
    /// The transfer task did not terminate within the teardown window.
    TeardownTimeout,
    /// The sender stopped delivering data.
    Stalled,
    /// Digest mismatch persisted after re-hashing the stored file.
    IntegrityMismatch,
    /// The requested file name is empty or not storable.
    InvalidName,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActive => write!(f, "no transfer in progress"),
            Self::TeardownTimeout => write!(f, "transfer task did not stop"),
            Self::Stalled => write!(f, "sender stalled"),
            Self::IntegrityMismatch => write!(f, "content hash mismatch"),
            Self::InvalidName => write!(f, "invalid file name"),
        }
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

// ---------------------------------------------------------------------------
// Print errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintError {
    /// start-print was sent without a file name.
    EmptySelection,
    /// The selected file has no content.
    EmptyFile,
    /// A job control command arrived with no job running.
    NotPrinting,
    /// The printer link is latched in its error state.
    PrinterFault,
}

impl fmt::Display for PrintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelection => write!(f, "no file selected"),
            Self::EmptyFile => write!(f, "file is empty"),
            Self::NotPrinting => write!(f, "no print job running"),
            Self::PrinterFault => write!(f, "printer in error state"),
        }
    }
}

impl From<PrintError> for Error {
    fn from(e: PrintError) -> Self {
        Self::Print(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
