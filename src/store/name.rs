//! Content key resolution
//!
//! Maps a client-supplied key onto the namespace it lives in.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, VkscError};

/// Keys with this prefix stay in memory
pub const MEMORY_PREFIX: char = '@';

/// A validated content key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentName {
    /// In-memory entry, key kept verbatim (prefix included)
    Memory(String),

    /// File under the content root
    File(PathBuf),
}

impl ContentName {
    /// Validate `name` and resolve file keys against `root`.
    ///
    /// Rejected: empty names, absolute paths, drive prefixes, `..`.
    pub fn resolve(name: &str, root: &Path) -> Result<Self> {
        if name.is_empty() {
            return Err(VkscError::InvalidContentName("empty name".to_string()));
        }

        if name.starts_with(MEMORY_PREFIX) {
            return Ok(ContentName::Memory(name.to_string()));
        }

        let mut relative = PathBuf::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(VkscError::InvalidContentName(name.to_string()));
                }
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(VkscError::InvalidContentName(name.to_string()));
        }

        Ok(ContentName::File(root.join(relative)))
    }
}
