//! Content Store Module
//!
//! Process-wide keyed blob storage shared by every connection.
//!
//! ## Key Namespaces
//! ```text
//!   "@name"          → in-memory entry, never written to disk
//!   "dir/file.bin"   → {content_root}/dir/file.bin
//! ```
//!
//! File-backed keys are always relative to the content root. Absolute
//! paths and `..` components are rejected.

mod content;
mod name;

pub use content::ContentStore;
pub use name::{ContentName, MEMORY_PREFIX};
