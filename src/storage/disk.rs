use std::io;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

pub const MIN_DISK_SPACE_MB: i64 = 500;

pub trait DiskProbe: Send + Sync {
    fn available_mb(&self) -> io::Result<u64>;
}

pub type SharedDiskProbe = Arc<dyn DiskProbe>;

// Probes the volume backing the OS temp directory, where segmentation
// scratch space lands.
pub struct TempVolumeProbe;

impl DiskProbe for TempVolumeProbe {
    fn available_mb(&self) -> io::Result<u64> {
        let free = fs2::available_space(std::env::temp_dir())?;
        Ok(free / (1024 * 1024))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiskSpaceStatus {
    pub sufficient: bool,
    pub free_mb: i64,
}

#[derive(Clone)]
pub struct DiskGuard {
    probe: SharedDiskProbe,
    min_mb: i64,
}

impl DiskGuard {
    pub fn new(probe: SharedDiskProbe) -> Self {
        Self::with_minimum(probe, MIN_DISK_SPACE_MB)
    }

    pub fn with_minimum(probe: SharedDiskProbe, min_mb: i64) -> Self {
        Self { probe, min_mb }
    }

    pub fn min_required_mb(&self) -> i64 {
        self.min_mb
    }

    // Probe failure reads as sufficient with the -1 sentinel; recomputed on
    // every call, never cached.
    pub fn check(&self) -> DiskSpaceStatus {
        match self.probe.available_mb() {
            Ok(free) => {
                let free_mb = i64::try_from(free).unwrap_or(i64::MAX);
                DiskSpaceStatus {
                    sufficient: free_mb >= self.min_mb,
                    free_mb,
                }
            }
            Err(error) => {
                warn!(%error, "disk capacity probe failed, continuing");
                DiskSpaceStatus {
                    sufficient: true,
                    free_mb: -1,
                }
            }
        }
    }
}
