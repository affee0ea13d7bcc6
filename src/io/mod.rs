//! I/O layer
//!
//! File system abstraction used where tests need control over timestamps.

pub mod file_system;

pub use file_system::{FileMetadata, FileSystemTrait, RealFileSystem};
