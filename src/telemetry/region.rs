//! Read-only attachment to the producer's shared memory regions
//!
//! The server owns and writes both regions without any locking. We map
//! them read-only and copy slots out each cycle; a slot caught mid-update
//! yields a torn record, which the dashboard tolerates rather than guards
//! against (the producer offers nothing to synchronize on).

use super::layout::{RegionKind, RegionLayout};
use anyhow::{bail, Context, Result};
use memmap2::{Mmap, MmapOptions};
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::unix::io::FromRawFd;
use std::path::PathBuf;
use tracing::debug;

/// Where region names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSource {
    /// POSIX shared memory via `shm_open`
    Shm,
    /// Plain files named after the region inside a directory
    Directory(PathBuf),
}

/// Opens and maps exported regions for one layout.
#[derive(Debug, Clone)]
pub struct RegionAttacher {
    source: RegionSource,
    layout: RegionLayout,
}

impl RegionAttacher {
    pub fn new(source: RegionSource, layout: RegionLayout) -> Self {
        Self { source, layout }
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// Map a region read-only.
    ///
    /// Fails when the layout is unusable, the region does not exist, is
    /// shorter than the layout requires, or cannot be mapped. Callers treat
    /// this as fatal.
    pub fn attach(&self, kind: RegionKind, instance_id: u32) -> Result<RegionView> {
        self.layout.validate().context("Invalid region layout")?;

        let name = kind.name(instance_id);
        let file = self
            .open(&name)
            .with_context(|| format!("Cannot open shared memory: {}", name))?;

        let expected = self.layout.region_size(kind);
        let actual = file
            .metadata()
            .with_context(|| format!("Cannot stat shared memory: {}", name))?
            .len();
        if actual < expected as u64 {
            bail!(
                "Shared memory {} is {} bytes, expected at least {}",
                name,
                actual,
                expected
            );
        }

        // SAFETY: the mapping is read-only and exactly `expected` bytes, which
        // the size check above guarantees exist. The producer keeps writing
        // through its own mapping; readers copy out and accept torn values.
        let mmap = unsafe { MmapOptions::new().len(expected).map(&file) }
            .with_context(|| format!("Cannot mmap shared memory: {}", name))?;

        debug!(region = %name, bytes = expected, "attached");
        Ok(RegionView { kind, name, mmap })
    }

    /// Release a view. Dropping it has the same effect; this makes the
    /// pairing with `attach` explicit at call sites.
    pub fn detach(&self, view: RegionView) {
        drop(view);
    }

    fn open(&self, name: &str) -> io::Result<File> {
        match &self.source {
            RegionSource::Shm => shm_open_readonly(name),
            RegionSource::Directory(dir) => File::open(dir.join(name)),
        }
    }
}

fn shm_open_readonly(name: &str) -> io::Result<File> {
    let path = CString::new(format!("/{}", name))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `path` is a valid NUL-terminated string that outlives the call.
    let fd = unsafe { libc::shm_open(path.as_ptr(), libc::O_RDONLY, 0o600) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` was just returned by shm_open and is owned by nobody else.
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// A mapped, read-only region. Unmapped on drop.
pub struct RegionView {
    kind: RegionKind,
    name: String,
    mmap: Mmap,
}

impl RegionView {
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}

impl std::fmt::Debug for RegionView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionView")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("len", &self.mmap.len())
            .finish()
    }
}

impl Drop for RegionView {
    fn drop(&mut self) {
        debug!(region = %self.name, "detached");
    }
}
