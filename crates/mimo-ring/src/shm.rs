//! POSIX shared-memory arena backing a [`crate::SlotBuffer`].
//!
//! The control loop creates a named segment (`SlotBuffer::create`); each
//! worker process attaches to the same name after it has been spawned as a
//! separate executable (`SlotBuffer::attach`). Once mapped, the region holds
//! only fixed-layout `#[repr(C)]` data (atomics and `Copy` structs), so
//! cross-process access never needs a pthread-shared mutex: atomics operate
//! directly on the shared bytes.

use std::ffi::CString;
use std::num::NonZeroUsize;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr::NonNull;

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;

use crate::error::BufferError;

/// An anonymous-by-name POSIX shared-memory mapping.
///
/// Owns the mapping for its lifetime; the creator additionally `shm_unlink`s
/// the name on drop so the segment doesn't outlive every process that
/// references it.
pub(crate) struct ShmArena {
    base: NonNull<u8>,
    size: usize,
    fd: RawFd,
    name: String,
    owner: bool,
}

// SAFETY: the mapping is `MAP_SHARED` memory; all cross-process access goes
// through atomics or is externally synchronized by the slot lease protocol,
// so sharing the pointer across threads within a process is sound.
unsafe impl Send for ShmArena {}
unsafe impl Sync for ShmArena {}

impl ShmArena {
    /// Creates and truncates a new named shared-memory segment of `size`
    /// bytes, mapping it read-write.
    pub(crate) fn create(name: &str, size: usize) -> Result<Self, BufferError> {
        Self::open_impl(name, size, true)
    }

    /// Attaches to an existing segment previously created with `create`.
    pub(crate) fn attach(name: &str, size: usize) -> Result<Self, BufferError> {
        Self::open_impl(name, size, false)
    }

    fn open_impl(name: &str, size: usize, create: bool) -> Result<Self, BufferError> {
        let shm_name = CString::new(format!("/mimo-{name}")).map_err(|e| BufferError::ShmAllocation {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;

        let oflag = if create {
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR
        } else {
            OFlag::O_RDWR
        };

        let fd = shm_open(shm_name.as_c_str(), oflag, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| {
            BufferError::ShmAllocation {
                name: name.to_owned(),
                reason: format!("shm_open: {e}"),
            }
        })?;

        if create {
            ftruncate(&fd, size as i64).map_err(|e| BufferError::ShmAllocation {
                name: name.to_owned(),
                reason: format!("ftruncate: {e}"),
            })?;
        }

        let len = NonZeroUsize::new(size).ok_or_else(|| BufferError::ShmAllocation {
            name: name.to_owned(),
            reason: "zero-sized arena".to_owned(),
        })?;

        // SAFETY: `fd` is a freshly opened (and, if we created it,
        // correctly sized) shared-memory object; the mapping is dropped by
        // `munmap` in `Drop` before the fd is closed.
        let base = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
        }
        .map_err(|e| BufferError::ShmAllocation {
            name: name.to_owned(),
            reason: format!("mmap: {e}"),
        })?
        .cast::<u8>();

        if create {
            // SAFETY: just-mapped, exclusively-owned memory of `size` bytes.
            unsafe { std::ptr::write_bytes(base.as_ptr(), 0, size) };
        }

        Ok(Self {
            base,
            size,
            fd: fd.as_raw_fd(),
            name: name.to_owned(),
            owner: create,
        })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }
}

impl Drop for ShmArena {
    fn drop(&mut self) {
        // SAFETY: `base`/`size` describe exactly the mapping created above;
        // nothing else in this process holds a reference into it once the
        // owning `SlotBuffer` is dropped.
        unsafe {
            let _ = munmap(self.base.cast(), self.size);
        }
        let _ = nix::unistd::close(self.fd);
        if self.owner {
            if let Ok(shm_name) = CString::new(format!("/mimo-{}", self.name)) {
                let _ = shm_unlink(shm_name.as_c_str());
            }
        }
    }
}
