//! File system abstraction layer
//!
//! The cache gate reads artifact existence, the fingerprint file and the
//! manifest modification time through this trait so freshness decisions can
//! be tested against controlled timestamps.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Subset of file metadata the generator cares about
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    /// Last modification time
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl FileMetadata {
    pub fn new(modified: SystemTime, size: u64) -> Self {
        Self { modified, size }
    }

    /// Convert from standard library metadata
    pub fn from_std_metadata(metadata: &std::fs::Metadata) -> Result<Self, std::io::Error> {
        Ok(Self {
            modified: metadata.modified()?,
            size: metadata.len(),
        })
    }

    /// Modification time as whole nanoseconds since the Unix epoch
    ///
    /// Times before the epoch collapse to zero.
    pub fn modified_ns(&self) -> u64 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// Trait for file system operations
pub trait FileSystemTrait: Clone + Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Read file contents as bytes
    fn read(&self, path: &Path) -> Result<Vec<u8>, std::io::Error>;

    /// Get file metadata
    fn metadata(&self, path: &Path) -> Result<FileMetadata, std::io::Error>;
}

/// Real file system implementation using std::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystemTrait for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, std::io::Error> {
        std::fs::read(path)
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, std::io::Error> {
        let metadata = std::fs::metadata(path)?;
        FileMetadata::from_std_metadata(&metadata)
    }
}


#[cfg(test)]
pub use test_filesystem::TestFileSystem;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_modified_ns_keeps_sub_second_precision() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let metadata = FileMetadata::new(time, 0);

        assert_eq!(metadata.modified_ns(), 1_700_000_000_123_456_789);
    }

    #[test]
    fn test_modified_ns_before_epoch_is_zero() {
        let time = UNIX_EPOCH - Duration::from_secs(10);

        assert_eq!(FileMetadata::new(time, 0).modified_ns(), 0);
    }

    #[test]
    fn test_test_filesystem_basic_operations() {
        let fs = TestFileSystem::new();
        let path = PathBuf::from("/test/file.txt");
        let time = UNIX_EPOCH + Duration::from_secs(1000);

        assert!(!fs.exists(&path));

        fs.set_file_content(&path, "Hello, world!", time);
        assert!(fs.exists(&path));
        assert_eq!(fs.read(&path).unwrap(), b"Hello, world!");
        assert_eq!(fs.metadata(&path).unwrap(), FileMetadata::new(time, 13));

        fs.remove_file(&path);
        assert!(!fs.exists(&path));
        assert!(fs.metadata(&path).is_err());
    }

    #[test]
    fn test_real_filesystem_reads_metadata() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "abc").unwrap();

        let fs = RealFileSystem;
        let metadata = fs.metadata(temp_file.path()).unwrap();

        assert!(fs.exists(temp_file.path()));
        assert_eq!(metadata.size, 3);
        assert!(metadata.modified_ns() > 0);
    }
}
