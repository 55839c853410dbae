//! Host directory file store.
//!
//! Implements [`FileStore`] on a directory of the host filesystem, standing
//! in for the SD card. Dot-files are reported hidden.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{DirEntry, FileHandle, FileStore, StorageError};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Use `root` as the store root, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            warn!("FS: cannot create {}: {}", root.display(), e);
            StorageError::IoError
        })?;
        info!("FS: store at {}", root.display());
        Ok(Self { root })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn map_io(e: &std::io::Error, fallback: StorageError) -> StorageError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound,
        std::io::ErrorKind::StorageFull => StorageError::Full,
        _ => fallback,
    }
}

impl FileStore for FsStore {
    fn create(&self, name: &str) -> Result<Box<dyn FileHandle>, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path(name))
            .map_err(|e| {
                warn!("FS: create '{}' failed: {}", name, e);
                StorageError::CreateFailed
            })?;
        Ok(Box::new(FsFile { file, pos: 0 }))
    }

    fn open_read(&self, name: &str) -> Result<Box<dyn FileHandle>, StorageError> {
        let file = File::open(self.path(name)).map_err(|e| map_io(&e, StorageError::IoError))?;
        Ok(Box::new(FsFile { file, pos: 0 }))
    }

    fn list(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let rd = fs::read_dir(self.path(dir)).map_err(|e| map_io(&e, StorageError::IoError))?;
        let mut out = Vec::new();
        for entry in rd {
            let entry = entry.map_err(|e| map_io(&e, StorageError::ReadFailed))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            out.push(DirEntry {
                hidden: name.starts_with('.'),
                is_dir,
                system: false,
                name,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

struct FsFile {
    file: File,
    pos: u64,
}

impl FileHandle for FsFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let n = self
            .file
            .read(buf)
            .map_err(|e| map_io(&e, StorageError::ReadFailed))?;
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(data)
            .map_err(|e| map_io(&e, StorageError::WriteFailed))?;
        self.pos += data.len() as u64;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<(), StorageError> {
        self.pos = self
            .file
            .seek(SeekFrom::Start(pos))
            .map_err(|e| map_io(&e, StorageError::IoError))?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.file.metadata().map(|m| m.len()).unwrap_or(0)
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        self.file
            .sync_all()
            .map_err(|e| map_io(&e, StorageError::WriteFailed))
    }
}
