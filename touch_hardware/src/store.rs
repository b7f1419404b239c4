use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use touch_traits::ByteStore;

use crate::error::{HwError, Result};

/// Value of an erased EEPROM cell.
const ERASED: u8 = 0xFF;

/// Write `bytes` to a sibling temp file, sync it, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

/// RAM-backed EEPROM. Reads past the end return the erased value and writes
/// past the end are ignored, as on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    bytes: Vec<u8>,
}

impl MemoryStore {
    pub fn erased(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ByteStore for MemoryStore {
    fn read(&self, addr: usize) -> u8 {
        self.bytes.get(addr).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, addr: usize, value: u8) {
        if let Some(b) = self.bytes.get_mut(addr) {
            *b = value;
        }
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

/// EEPROM image kept on disk between simulator runs.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    mem: MemoryStore,
    dirty: bool,
}

impl FileStore {
    /// Open the image at `path`, or start erased when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HwError::ZeroCapacity);
        }
        let path = path.into();
        let mem = match fs::read(&path) {
            Ok(bytes) if bytes.len() == capacity => MemoryStore::from_bytes(bytes),
            Ok(bytes) => {
                return Err(HwError::ImageSize {
                    path: path.display().to_string(),
                    expected: capacity,
                    found: bytes.len(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), capacity, "no store image, starting erased");
                MemoryStore::erased(capacity)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            mem,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist pending writes; a clean store is left untouched.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        write_atomic(&self.path, self.mem.as_bytes())?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), "store image written");
        Ok(())
    }
}

impl ByteStore for FileStore {
    fn read(&self, addr: usize) -> u8 {
        self.mem.read(addr)
    }

    fn write(&mut self, addr: usize, value: u8) {
        if addr < self.mem.capacity() {
            self.mem.write(addr, value);
            self.dirty = true;
        }
    }

    fn capacity(&self) -> usize {
        self.mem.capacity()
    }
}
