//! POSIX shared-memory transport for Kitty `t=s` payloads.
//!
//! The writer creates a uniquely named segment, fills it, and hands only the
//! name to the terminal. The terminal reads and unlinks it. We unlink only
//! segments we failed to fill or that never reached the terminal.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ShmUnavailable;

/// Monotonic per-process counter; several images queued in one frame must
/// never share a name.
static NEXT_SEGMENT: AtomicU64 = AtomicU64::new(0);

/// A filled segment ready to be named in an escape sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShmHandle {
    pub name: String,
    pub len: usize,
}

/// Somewhere to put a payload so the terminal can read it directly.
pub trait SharedMemory: std::fmt::Debug + Send + Sync {
    /// Copy `data` into a fresh segment.
    fn write(&self, data: &[u8]) -> Result<ShmHandle, ShmUnavailable>;

    /// Remove a segment written by [`write`](Self::write) whose name never
    /// reached the terminal.
    fn release(&self, name: &str);
}

/// Segment name: `/pixtui-<pid>-<counter>`.
#[must_use]
pub fn segment_name(pid: u32, counter: u64) -> String {
    format!("/pixtui-{pid}-{counter}")
}

fn next_segment_name() -> String {
    segment_name(std::process::id(), NEXT_SEGMENT.fetch_add(1, Ordering::Relaxed))
}

/// `shm_open(3)` backed segments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixShm;

impl PosixShm {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// One-time capability check: create, fill, and unlink a tiny segment.
    #[must_use]
    pub fn probe() -> bool {
        #[cfg(unix)]
        {
            match Self.write(&[0]) {
                Ok(handle) => {
                    Self.release(&handle.name);
                    true
                }
                Err(_err) => {
                    pixtui_core::logging::debug!(error = %_err, "shared memory probe failed");
                    false
                }
            }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[cfg(unix)]
impl SharedMemory for PosixShm {
    fn write(&self, data: &[u8]) -> Result<ShmHandle, ShmUnavailable> {
        use nix::fcntl::OFlag;
        use nix::sys::mman::{shm_open, shm_unlink};
        use nix::sys::stat::Mode;
        use std::fs::File;
        use std::io::Write;

        let name = next_segment_name();
        let fd = shm_open(
            name.as_str(),
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|errno| ShmUnavailable::Open {
            name: name.clone(),
            source: errno.into(),
        })?;

        let mut file = File::from(fd);
        if let Err(source) = file.write_all(data) {
            let _ = shm_unlink(name.as_str());
            return Err(ShmUnavailable::Write { name, source });
        }
        Ok(ShmHandle {
            name,
            len: data.len(),
        })
    }

    fn release(&self, name: &str) {
        if let Err(_errno) = nix::sys::mman::shm_unlink(name) {
            pixtui_core::logging::debug!(name, error = %_errno, "shm_unlink failed");
        }
    }
}

#[cfg(not(unix))]
impl SharedMemory for PosixShm {
    fn write(&self, _data: &[u8]) -> Result<ShmHandle, ShmUnavailable> {
        Err(ShmUnavailable::Unsupported)
    }

    fn release(&self, _name: &str) {}
}
