//! Named POSIX shared-memory objects.
//!
//! Thin wrapper over `shm_open`/`mmap` via rustix. An [`ShmObject`] is an
//! open file descriptor for a named object; a [`Mapping`] is one mmap of it
//! that unmaps on drop. Callers re-open and re-map per operation — mappings
//! are never cached across calls, so a grow by another process is picked up
//! on the next map.

use std::ptr::NonNull;

use rustix::fd::OwnedFd;
use rustix::fs::Mode;
use rustix::io::Errno;
use rustix::mm::{MapFlags, ProtFlags};
use rustix::shm::ShmOFlags;

use crate::error::{Error, Result};

/// Validate a segment name and produce the OS-level object name.
///
/// POSIX wants a leading slash and no interior slashes.
fn object_name(name: &str) -> Result<String> {
    if name.is_empty() || name.len() > 250 || name.contains('/') {
        return Err(Error::InvalidSegment(format!(
            "'{name}' is not a usable segment name"
        )));
    }
    Ok(format!("/{name}"))
}

/// An open named shared-memory object.
pub(crate) struct ShmObject {
    fd: OwnedFd,
}

impl ShmObject {
    /// Create a new named object of `len` bytes; the name must be unused.
    pub(crate) fn create(name: &str, len: u64) -> Result<Self> {
        let path = object_name(name)?;
        let fd = rustix::shm::shm_open(
            path.as_str(),
            ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP,
        )
        .map_err(|errno| match errno {
            Errno::EXIST => Error::AlreadyExists(name.to_string()),
            other => Error::System(other),
        })?;
        if let Err(errno) = rustix::fs::ftruncate(&fd, len) {
            // Don't leave a zero-sized object behind.
            let _ = rustix::shm::shm_unlink(path.as_str());
            return Err(Error::System(errno));
        }
        Ok(Self { fd })
    }

    /// Open an existing named object.
    pub(crate) fn open(name: &str) -> Result<Self> {
        let path = object_name(name)?;
        let fd = rustix::shm::shm_open(path.as_str(), ShmOFlags::RDWR, Mode::empty()).map_err(
            |errno| match errno {
                Errno::NOENT => Error::NotFound(name.to_string()),
                other => Error::System(other),
            },
        )?;
        Ok(Self { fd })
    }

    /// Remove the name binding; the object disappears once unmapped everywhere.
    pub(crate) fn unlink(name: &str) -> Result<()> {
        let path = object_name(name)?;
        rustix::shm::shm_unlink(path.as_str()).map_err(|errno| match errno {
            Errno::NOENT => Error::NotFound(name.to_string()),
            other => Error::System(other),
        })
    }

    /// Current object size in bytes.
    pub(crate) fn size(&self) -> Result<u64> {
        let stat = rustix::fs::fstat(&self.fd)?;
        Ok(stat.st_size as u64)
    }

    /// Grow (or shrink) the object to `len` bytes.
    pub(crate) fn resize(&self, len: u64) -> Result<()> {
        rustix::fs::ftruncate(&self.fd, len)?;
        Ok(())
    }

    /// Map `len` bytes of the object read-write.
    pub(crate) fn map(&self, len: usize) -> Result<Mapping> {
        if len == 0 {
            return Err(Error::InvalidSegment("cannot map zero bytes".into()));
        }
        // SAFETY: mapping a shared file-backed region we own an fd for;
        // lifetime is managed by Mapping's Drop.
        let ptr = unsafe {
            rustix::mm::mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &self.fd,
                0,
            )?
        };
        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::InvalidSegment("mmap returned null".into()))?;
        Ok(Mapping { ptr, len })
    }
}

/// One mmap of a shared-memory object; unmaps on drop.
pub(crate) struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl Mapping {
    /// Base address of the mapping.
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable base address of the mapping.
    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Mapped length in bytes.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: ptr/len came from a successful mmap and are unmapped once.
        unsafe {
            let _ = rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }
}

// SAFETY: the mapping is plain shared memory; any thread may address it,
// and synchronization is the caller's responsibility (the segment lock).
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniq(tag: &str) -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static N: AtomicU32 = AtomicU32::new(0);
        format!(
            "bytebridge-{tag}-{}-{}",
            std::process::id(),
            N.fetch_add(1, Ordering::Relaxed)
        )
    }

    #[test]
    fn test_create_open_unlink() {
        let name = uniq("shm");
        let created = ShmObject::create(&name, 4096).unwrap();
        assert_eq!(created.size().unwrap(), 4096);

        let opened = ShmObject::open(&name).unwrap();
        assert_eq!(opened.size().unwrap(), 4096);

        ShmObject::unlink(&name).unwrap();
        assert!(matches!(
            ShmObject::open(&name),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ShmObject::unlink(&name),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_create_exclusive() {
        let name = uniq("excl");
        let _a = ShmObject::create(&name, 4096).unwrap();
        assert!(matches!(
            ShmObject::create(&name, 4096),
            Err(Error::AlreadyExists(_))
        ));
        ShmObject::unlink(&name).unwrap();
    }

    #[test]
    fn test_mappings_share_bytes() {
        let name = uniq("map");
        let obj = ShmObject::create(&name, 4096).unwrap();
        let a = obj.map(4096).unwrap();
        let b = obj.map(4096).unwrap();
        // SAFETY: single-threaded test, no concurrent access.
        unsafe {
            *a.as_mut_ptr() = 42;
            assert_eq!(*b.as_ptr(), 42);
        }
        ShmObject::unlink(&name).unwrap();
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(matches!(
            ShmObject::create("", 4096),
            Err(Error::InvalidSegment(_))
        ));
        assert!(matches!(
            ShmObject::create("a/b", 4096),
            Err(Error::InvalidSegment(_))
        ));
    }
}
