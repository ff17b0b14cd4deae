//! Shared-memory value exchange.
//!
//! A [`Segment`] is a named, lock-guarded shared-memory region holding one
//! length-prefixed encoded payload. One process creates it, any process
//! that knows the name attaches, and a single cross-process lock serializes
//! all access. Values go through the SBS codec on the way in and out.
//!
//! # Layout
//!
//! ```text
//! ┌────────────┬──────────────┬────────┬─────────┬──────────────────┐
//! │ capacity   │ payload_len  │ lock   │ written │ payload bytes... │
//! │ u64        │ u64          │ u32    │ u32     │                  │
//! └────────────┴──────────────┴────────┴─────────┴──────────────────┘
//! ```
//!
//! # Re-resolution contract
//!
//! Every operation re-opens the named object and re-maps it; no mapping is
//! cached across calls. A writer may grow the object (only while holding
//! the exclusive lock), and because everyone re-resolves per call, nobody
//! ever writes through a stale mapping. The object size is re-read under
//! the lock before it is trusted.

mod lock;
mod shm;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sbs;
use crate::value::Value;
use shm::{Mapping, ShmObject};

/// Mapping granularity; object sizes are rounded up to this.
const PAGE: usize = 4096;

/// Shared header at the start of every segment.
#[repr(C)]
struct SegmentHeader {
    /// Payload-area size in bytes (object size minus this header).
    capacity: AtomicU64,
    /// Committed payload length; valid once `written` is set.
    payload_len: AtomicU64,
    /// Cross-process lock word.
    lock: AtomicU32,
    /// 0 until the first successful write.
    written: AtomicU32,
}

const HEADER_LEN: usize = std::mem::size_of::<SegmentHeader>();

/// View the shared header of a mapping.
fn header(map: &Mapping) -> &SegmentHeader {
    debug_assert!(map.len() >= HEADER_LEN);
    // SAFETY: segment mappings are checked to cover at least HEADER_LEN
    // bytes before this is called, and mmap returns page-aligned memory,
    // which satisfies the header's alignment.
    unsafe { &*map.as_ptr().cast::<SegmentHeader>() }
}

/// The payload area of a mapping.
///
/// # Safety
///
/// The caller must hold the segment lock; the bytes are shared with other
/// processes.
unsafe fn payload_ref(map: &Mapping) -> &[u8] {
    // SAFETY: the mapping covers map.len() bytes and the caller holds the
    // lock, so no other process mutates the region.
    unsafe { std::slice::from_raw_parts(map.as_ptr().add(HEADER_LEN), map.len() - HEADER_LEN) }
}

/// The payload area of a mapping, mutable.
///
/// # Safety
///
/// The caller must hold the segment lock; this hands out `&mut` into
/// memory reachable from `&self`-style shared mappings.
#[allow(clippy::mut_from_ref)]
unsafe fn payload_mut(map: &Mapping) -> &mut [u8] {
    // SAFETY: as for payload_ref, plus exclusivity from the held lock.
    unsafe {
        std::slice::from_raw_parts_mut(map.as_mut_ptr().add(HEADER_LEN), map.len() - HEADER_LEN)
    }
}

/// Total object size for a requested payload capacity.
fn total_size(capacity_hint: usize) -> usize {
    (HEADER_LEN + capacity_hint.max(1)).div_ceil(PAGE) * PAGE
}

/// Map just the header, verifying the object is big enough to have one.
fn map_header(name: &str, shm: &ShmObject) -> Result<Mapping> {
    if (shm.size()? as usize) < HEADER_LEN {
        return Err(Error::InvalidSegment(format!(
            "segment '{name}' is smaller than its header"
        )));
    }
    shm.map(HEADER_LEN)
}

/// A handle to a named shared segment.
///
/// The handle holds only the name; every operation resolves the name
/// against the OS, so independent handles in independent processes stay
/// coherent, and a removed segment fails with [`Error::NotFound`] on the
/// next use no matter who still holds a handle.
#[derive(Debug, Clone)]
pub struct Segment {
    name: String,
}

impl Segment {
    /// Create a new named segment sized for at least `capacity_hint`
    /// payload bytes.
    ///
    /// Fails with [`Error::AlreadyExists`] if the name is taken.
    pub fn create(name: &str, capacity_hint: usize) -> Result<Self> {
        let total = total_size(capacity_hint);
        let obj = ShmObject::create(name, total as u64)?;
        let map = obj.map(total)?;
        let head = header(&map);
        head.capacity
            .store((total - HEADER_LEN) as u64, Ordering::Release);
        head.payload_len.store(0, Ordering::Release);
        head.written.store(0, Ordering::Release);
        head.lock.store(lock::UNLOCKED, Ordering::Release);
        tracing::debug!(name, capacity = total - HEADER_LEN, "created segment");
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Attach to an existing named segment.
    ///
    /// Fails with [`Error::NotFound`] if no such segment exists.
    pub fn attach(name: &str) -> Result<Self> {
        let obj = ShmObject::open(name)?;
        if (obj.size()? as usize) < HEADER_LEN {
            return Err(Error::InvalidSegment(format!(
                "segment '{name}' is smaller than its header"
            )));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// The segment's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode `value` and store it as the segment's payload, blocking on
    /// the lock as long as it takes.
    ///
    /// The write is atomic with respect to other attachers: it applies
    /// fully under the lock or not at all, and a failure leaves any
    /// previously committed payload intact.
    pub fn write(&self, value: &Value) -> Result<()> {
        self.write_opts(value, None)
    }

    /// [`write`](Self::write) with a bound on how long to wait for the
    /// lock; lapsing fails with [`Error::LockTimeout`].
    pub fn write_timeout(&self, value: &Value, timeout: Duration) -> Result<()> {
        self.write_opts(value, Some(timeout))
    }

    fn write_opts(&self, value: &Value, timeout: Option<Duration>) -> Result<()> {
        // Encode before touching the segment: an encode failure must not
        // disturb the committed payload.
        let payload = sbs::encode(value)?;
        let obj = ShmObject::open(&self.name)?;
        let head = map_header(&self.name, &obj)?;
        lock::acquire(&header(&head).lock, &self.name, timeout)?;
        let result = write_locked(&self.name, &obj, &payload);
        lock::release(&header(&head).lock);
        result
    }

    /// Read and decode the segment's payload.
    ///
    /// Fails with [`Error::NotFound`] if the name no longer exists and
    /// [`Error::Empty`] if nothing has ever been written.
    pub fn read(&self) -> Result<Value> {
        self.read_opts(None)
    }

    /// [`read`](Self::read) with a bound on how long to wait for the lock.
    pub fn read_timeout(&self, timeout: Duration) -> Result<Value> {
        self.read_opts(Some(timeout))
    }

    fn read_opts(&self, timeout: Option<Duration>) -> Result<Value> {
        let obj = ShmObject::open(&self.name)?;
        let head = map_header(&self.name, &obj)?;
        lock::acquire(&header(&head).lock, &self.name, timeout)?;
        let result = read_locked(&self.name, &obj);
        lock::release(&header(&head).lock);
        // Decode outside the lock; the copy is already ours.
        sbs::decode(&result?)
    }

    /// Remove the named segment.
    ///
    /// Waits for any in-flight lock holder before releasing the name;
    /// attached handles fail with [`Error::NotFound`] on their next
    /// operation. Removing a missing segment is itself
    /// [`Error::NotFound`].
    pub fn remove(name: &str) -> Result<()> {
        let obj = ShmObject::open(name)?;
        let head = map_header(name, &obj)?;
        lock::acquire(&header(&head).lock, name, None)?;
        let result = ShmObject::unlink(name);
        lock::release(&header(&head).lock);
        result?;
        tracing::debug!(name, "removed segment");
        Ok(())
    }
}

fn write_locked(name: &str, obj: &ShmObject, payload: &[u8]) -> Result<()> {
    // Re-read the size under the lock: another process may have grown the
    // object since we opened it.
    let mut total = obj.size()? as usize;
    if total < HEADER_LEN {
        return Err(Error::InvalidSegment(format!(
            "segment '{name}' is smaller than its header"
        )));
    }
    if payload.len() > total - HEADER_LEN {
        let grown = (HEADER_LEN + payload.len()).div_ceil(PAGE) * PAGE;
        obj.resize(grown as u64)?;
        tracing::debug!(name, from = total, to = grown, "grew segment");
        total = grown;
    }
    let map = obj.map(total)?;
    // SAFETY: we hold the segment lock.
    let dst = unsafe { payload_mut(&map) };
    dst[..payload.len()].copy_from_slice(payload);
    let head = header(&map);
    head.capacity
        .store((total - HEADER_LEN) as u64, Ordering::Release);
    head.payload_len
        .store(payload.len() as u64, Ordering::Release);
    head.written.store(1, Ordering::Release);
    Ok(())
}

fn read_locked(name: &str, obj: &ShmObject) -> Result<Vec<u8>> {
    let total = obj.size()? as usize;
    if total < HEADER_LEN {
        return Err(Error::InvalidSegment(format!(
            "segment '{name}' is smaller than its header"
        )));
    }
    let map = obj.map(total)?;
    let head = header(&map);
    if head.written.load(Ordering::Acquire) == 0 {
        return Err(Error::Empty(name.to_string()));
    }
    let len = head.payload_len.load(Ordering::Acquire) as usize;
    if len > total - HEADER_LEN {
        return Err(Error::InvalidSegment(format!(
            "segment '{name}' declares a payload larger than itself"
        )));
    }
    // SAFETY: we hold the segment lock.
    let payload = unsafe { payload_ref(&map) };
    Ok(payload[..len].to_vec())
}
