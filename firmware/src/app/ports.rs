//! Port traits — the boundary between the protocol core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Transfer / Print / Telemetry services
//! ```
//!
//! Driven adapters (file store, weight sensor, display sink, config file)
//! implement these traits. The services hold them as `Arc<dyn Port>` because
//! several tasks (dispatcher, transfer engine, print streamer, poller) share
//! the same collaborator at once.
//!
//! The UART seam lives next to the transport in
//! [`transport::uart`](crate::transport::uart).

use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// File store port (driven adapter: core ↔ SD card / flash FS)
// ───────────────────────────────────────────────────────────────

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub hidden: bool,
    pub system: bool,
}

impl DirEntry {
    /// A plain, visible file entry.
    pub fn file(name: &str) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            hidden: false,
            system: false,
        }
    }
}

/// Filesystem primitives consumed by the transfer engine and the streamer.
///
/// Paths are relative to the store root. Implementations must be usable from
/// several tasks at once; an open [`FileHandle`] belongs to exactly one task.
pub trait FileStore: Send + Sync {
    /// Create `name`, truncating any existing content, opened for writing.
    fn create(&self, name: &str) -> Result<Box<dyn FileHandle>, StorageError>;

    /// Open an existing file for reading.
    fn open_read(&self, name: &str) -> Result<Box<dyn FileHandle>, StorageError>;

    /// List the entries of a directory (`""` or `"/"` is the root).
    fn list(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError>;
}

/// An open file. Dropping the handle closes it; [`close`](Self::close)
/// reports flush failures explicitly.
pub trait FileHandle: Send {
    /// Read up to `buf.len()` bytes at the current position. `Ok(0)` is EOF.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Append `data` at the current position. Short writes are errors.
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Move the position to an absolute byte offset.
    fn seek(&mut self, pos: u64) -> Result<(), StorageError>;

    /// Current file size in bytes.
    fn size(&self) -> u64;

    /// Current position in bytes.
    fn position(&self) -> u64;

    /// Flush and close.
    fn close(self: Box<Self>) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Weight sensor port (driven adapter: load cell → core)
// ───────────────────────────────────────────────────────────────

/// Read-only filament weight provider (load-cell driver).
pub trait WeightSensor: Send + Sync {
    /// Current spool weight in grams.
    fn read_grams(&self) -> i32;
}

// ───────────────────────────────────────────────────────────────
// Status sink port (driven adapter: core → display)
// ───────────────────────────────────────────────────────────────

/// The core pushes [`StatusEvent`](super::events::StatusEvent)s through this
/// port. Adapters decide where they go (display widgets, serial log).
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: &super::events::StatusEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting; invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load configuration. Returns [`ConfigError::NotFound`] when nothing is
    /// stored yet.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`FileStore`] and [`FileHandle`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested file does not exist.
    NotFound,
    /// File could not be created or truncated.
    CreateFailed,
    /// Read failed mid-file.
    ReadFailed,
    /// Write failed or was short.
    WriteFailed,
    /// Medium is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::CreateFailed => write!(f, "create failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
