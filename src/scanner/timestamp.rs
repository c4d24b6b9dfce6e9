//! Reference timestamps for log files.
//!
//! The scanner only needs "when was this file created". Platforms disagree on
//! how to answer that, so the answer is hidden behind [`TimestampSource`].

use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Yields the timestamp used to decide whether a file falls in the age window.
pub trait TimestampSource: Send + Sync {
    fn reference_time(&self, path: &Path, metadata: &Metadata) -> io::Result<DateTime<Utc>>;
}

/// Uses the file's birth time where the platform records it. On unix systems
/// that do not, the inode change time is used instead; elsewhere the
/// modification time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformTimestamp;

impl TimestampSource for PlatformTimestamp {
    fn reference_time(&self, _path: &Path, metadata: &Metadata) -> io::Result<DateTime<Utc>> {
        match metadata.created() {
            Ok(created) => Ok(created.into()),
            Err(_) => fallback_time(metadata),
        }
    }
}

#[cfg(unix)]
fn fallback_time(metadata: &Metadata) -> io::Result<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;

    DateTime::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("change time out of range: {}", metadata.ctime()),
        )
    })
}

#[cfg(not(unix))]
fn fallback_time(metadata: &Metadata) -> io::Result<DateTime<Utc>> {
    metadata.modified().map(Into::into)
}
