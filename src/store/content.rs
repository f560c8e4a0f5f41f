//! Content Store
//!
//! Named byte blobs, in memory or under the content root.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::ContentName;
use crate::error::{Result, VkscError};
use crate::protocol::MAX_CONTENT_SIZE;

/// Keyed blob storage shared by all connections
///
/// ## Concurrency:
/// - `memory`: one Mutex guards the in-memory map AND every file operation,
///   so each call is atomic with respect to every other call
/// - `get(.., remove_after = true)` reads and deletes under the same guard;
///   no other connection can observe a half-removed entry
/// - All methods use `&self`
///
/// ## Size Limit:
/// No entry grows past `max_entry_size` through `store` or `append`, and
/// `get` refuses (without removing) an entry that is already larger, for
/// example a file placed under the root by another process.
pub struct ContentStore {
    /// Directory holding file-backed entries
    root: PathBuf,

    /// In-memory entries (`@` keys)
    memory: Mutex<HashMap<String, Vec<u8>>>,

    /// Largest entry a client can store or read back
    max_entry_size: usize,
}

impl ContentStore {
    /// Open or create a store rooted at `root`
    pub fn open(root: &Path) -> Result<Self> {
        Self::with_max_entry_size(root, MAX_CONTENT_SIZE)
    }

    /// Open a store with a custom per-entry size limit
    pub fn with_max_entry_size(root: &Path, max_entry_size: usize) -> Result<Self> {
        fs::create_dir_all(root)?;

        Ok(Self {
            root: root.to_path_buf(),
            memory: Mutex::new(HashMap::new()),
            max_entry_size,
        })
    }

    /// Insert or overwrite an entry (last write wins)
    pub fn store(&self, name: &str, data: &[u8]) -> Result<()> {
        let resolved = ContentName::resolve(name, &self.root)?;
        self.check_size(name, data.len() as u64)?;
        let mut memory = self.memory.lock();

        match resolved {
            ContentName::Memory(key) => {
                memory.insert(key, data.to_vec());
            }
            ContentName::File(path) => {
                Self::create_parent(&path)?;
                fs::write(&path, data)?;
            }
        }

        Ok(())
    }

    /// Read an entry, optionally deleting it in the same step.
    ///
    /// Returns:
    /// - `Ok(Some(data))` — entry found
    /// - `Ok(None)` — no such entry
    /// - `Err(ContentTooLarge)` — entry exceeds the size limit; it is kept
    pub fn get(&self, name: &str, remove_after: bool) -> Result<Option<Vec<u8>>> {
        let resolved = ContentName::resolve(name, &self.root)?;
        let mut memory = self.memory.lock();

        match resolved {
            ContentName::Memory(key) => {
                if let Some(data) = memory.get(&key) {
                    self.check_size(name, data.len() as u64)?;
                }
                if remove_after {
                    Ok(memory.remove(&key))
                } else {
                    Ok(memory.get(&key).cloned())
                }
            }
            ContentName::File(path) => {
                match fs::metadata(&path) {
                    Ok(meta) => self.check_size(name, meta.len())?,
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e.into()),
                }

                let data = match fs::read(&path) {
                    Ok(data) => data,
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                if remove_after {
                    fs::remove_file(&path)?;
                }

                Ok(Some(data))
            }
        }
    }

    /// Append to an entry, creating it if missing.
    ///
    /// With `clear` the entry is emptied first. An append that would take
    /// the entry past the size limit fails and leaves it unchanged.
    pub fn append(&self, name: &str, data: &[u8], clear: bool) -> Result<()> {
        let resolved = ContentName::resolve(name, &self.root)?;
        let mut memory = self.memory.lock();

        match resolved {
            ContentName::Memory(key) => {
                let current = match (clear, memory.get(&key)) {
                    (false, Some(entry)) => entry.len() as u64,
                    _ => 0,
                };
                self.check_size(name, current + data.len() as u64)?;

                let entry = memory.entry(key).or_default();
                if clear {
                    entry.clear();
                }
                entry.extend_from_slice(data);
            }
            ContentName::File(path) => {
                let current = match fs::metadata(&path) {
                    Ok(meta) if !clear => meta.len(),
                    Ok(_) => 0,
                    Err(e) if e.kind() == ErrorKind::NotFound => 0,
                    Err(e) => return Err(e.into()),
                };
                self.check_size(name, current + data.len() as u64)?;

                Self::create_parent(&path)?;
                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(!clear)
                    .truncate(clear)
                    .open(&path)?;
                file.write_all(data)?;
                file.flush()?;
            }
        }

        Ok(())
    }

    /// Check whether an entry exists
    pub fn contains(&self, name: &str) -> Result<bool> {
        let name = ContentName::resolve(name, &self.root)?;
        let memory = self.memory.lock();

        Ok(match name {
            ContentName::Memory(key) => memory.contains_key(&key),
            ContentName::File(path) => path.is_file(),
        })
    }

    /// Number of in-memory entries
    pub fn memory_entry_count(&self) -> usize {
        self.memory.lock().len()
    }

    /// Get the content root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_size(&self, name: &str, size: u64) -> Result<()> {
        let max = self.max_entry_size as u64;
        if size > max {
            return Err(VkscError::ContentTooLarge {
                name: name.to_string(),
                size,
                max,
            });
        }
        Ok(())
    }

    fn create_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
