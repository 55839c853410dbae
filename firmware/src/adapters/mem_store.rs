//! In-memory file store.
//!
//! Implements [`FileStore`] over a map of shared byte vectors. Used by the
//! host simulation and tests; failure switches let tests drive the storage
//! error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::ports::{DirEntry, FileHandle, FileStore, StorageError};

type Shared = Arc<Mutex<Vec<u8>>>;

struct MemEntry {
    data: Shared,
    hidden: bool,
    system: bool,
}

#[derive(Default)]
struct Inner {
    files: BTreeMap<String, MemEntry>,
    dirs: BTreeSet<String>,
    fail_create: bool,
    fail_writes: bool,
    fail_list: bool,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

fn key(name: &str) -> &str {
    name.trim_start_matches('/')
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `name`, replacing any previous content.
    pub fn insert(&self, name: &str, data: &[u8]) {
        lock(&self.inner).files.insert(
            key(name).into(),
            MemEntry {
                data: Arc::new(Mutex::new(data.to_vec())),
                hidden: false,
                system: false,
            },
        );
    }

    /// Store a file flagged hidden and/or system.
    pub fn insert_flagged(&self, name: &str, data: &[u8], hidden: bool, system: bool) {
        self.insert(name, data);
        if let Some(e) = lock(&self.inner).files.get_mut(key(name)) {
            e.hidden = hidden;
            e.system = system;
        }
    }

    pub fn add_dir(&self, name: &str) {
        lock(&self.inner).dirs.insert(key(name).into());
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let inner = lock(&self.inner);
        let entry = inner.files.get(key(name))?;
        Some(lock(&entry.data).clone())
    }

    /// Overwrite one byte of a stored file in place.
    pub fn corrupt(&self, name: &str, offset: usize, byte: u8) -> bool {
        let inner = lock(&self.inner);
        let Some(entry) = inner.files.get(key(name)) else {
            return false;
        };
        let mut data = lock(&entry.data);
        match data.get_mut(offset) {
            Some(b) => {
                *b = byte;
                true
            }
            None => false,
        }
    }

    pub fn set_fail_create(&self, on: bool) {
        lock(&self.inner).fail_create = on;
    }

    /// Make writes through handles opened from now on fail.
    pub fn set_fail_writes(&self, on: bool) {
        lock(&self.inner).fail_writes = on;
    }

    pub fn set_fail_list(&self, on: bool) {
        lock(&self.inner).fail_list = on;
    }
}

impl FileStore for MemStore {
    fn create(&self, name: &str) -> Result<Box<dyn FileHandle>, StorageError> {
        let mut inner = lock(&self.inner);
        if inner.fail_create || key(name).is_empty() {
            return Err(StorageError::CreateFailed);
        }
        let data: Shared = Arc::new(Mutex::new(Vec::new()));
        inner.files.insert(
            key(name).into(),
            MemEntry {
                data: data.clone(),
                hidden: false,
                system: false,
            },
        );
        Ok(Box::new(MemFile {
            data,
            pos: 0,
            writable: true,
            fail_writes: inner.fail_writes,
        }))
    }

    fn open_read(&self, name: &str) -> Result<Box<dyn FileHandle>, StorageError> {
        let inner = lock(&self.inner);
        let entry = inner.files.get(key(name)).ok_or(StorageError::NotFound)?;
        Ok(Box::new(MemFile {
            data: entry.data.clone(),
            pos: 0,
            writable: false,
            fail_writes: true,
        }))
    }

    fn list(&self, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let inner = lock(&self.inner);
        if inner.fail_list {
            return Err(StorageError::IoError);
        }
        if !key(dir).is_empty() {
            // Flat store: only the root has entries.
            return Err(StorageError::NotFound);
        }
        let dirs = inner.dirs.iter().map(|d| DirEntry {
            is_dir: true,
            ..DirEntry::file(d)
        });
        let files = inner.files.iter().map(|(n, e)| DirEntry {
            hidden: e.hidden,
            system: e.system,
            ..DirEntry::file(n)
        });
        Ok(dirs.chain(files).collect())
    }
}

struct MemFile {
    data: Shared,
    pos: u64,
    writable: bool,
    fail_writes: bool,
}

impl FileHandle for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = lock(&self.data);
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if !self.writable || self.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        let mut data = lock(&self.data);
        let start = self.pos as usize;
        if data.len() < start {
            data.resize(start, 0);
        }
        let overlap = (data.len() - start).min(bytes.len());
        data[start..start + overlap].copy_from_slice(&bytes[..overlap]);
        data.extend_from_slice(&bytes[overlap..]);
        self.pos += bytes.len() as u64;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<(), StorageError> {
        self.pos = pos;
        Ok(())
    }

    fn size(&self) -> u64 {
        lock(&self.data).len() as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }
}
