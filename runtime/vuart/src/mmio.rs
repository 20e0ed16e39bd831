//! MMIO Mapping - the VUART register page
//!
//! Maps one page of physical memory out of `/dev/mem` and exposes it as a
//! [`RegisterIo`] implementation. The mapping lives exactly as long as the
//! [`DeviceWindow`] and is unmapped when it drops, on every exit path.

use std::fs::OpenOptions;
use std::io;
use std::marker::PhantomData;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::{read_volatile, write_volatile};

use memmap2::{MmapOptions, MmapRaw};

use crate::barrier::full_barrier;
use crate::regs::Register;
use crate::{RegisterIo, Result, VuartError};

/// Physical memory pseudo-file
pub const DEV_MEM: &str = "/dev/mem";

/// Minimum page size (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Platform page size, as reported by the kernel
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        PAGE_SIZE
    } else {
        size as usize
    }
}

/// Helper to check if address is aligned to the platform page size
pub fn is_aligned(addr: usize) -> bool {
    addr % page_size() == 0
}

/// One mapped page of VUART registers.
///
/// Owned, not `Clone`, and neither `Send` nor `Sync`: the drill thread is the
/// only one that ever touches the device.
pub struct DeviceWindow {
    map: MmapRaw,
    paddr: usize,
    _not_send: PhantomData<*mut u8>,
}

impl DeviceWindow {
    /// Map the register page at physical address `paddr` from `/dev/mem`
    ///
    /// # Errors
    /// Returns error if:
    /// - `paddr` is not page aligned
    /// - `/dev/mem` cannot be opened (usually permission denied)
    /// - the kernel refuses the mapping
    pub fn open(paddr: usize) -> Result<Self> {
        Self::open_path(DEV_MEM, paddr)
    }

    /// Map one page at byte offset `paddr` of the file at `path`
    pub fn open_path(path: impl AsRef<Path>, paddr: usize) -> Result<Self> {
        let path = path.as_ref();

        // mmap(2) rejects an unaligned offset with EINVAL
        if !is_aligned(paddr) {
            return Err(VuartError::MapFailed {
                base: paddr,
                source: io::Error::from_raw_os_error(libc::EINVAL),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| VuartError::ResourceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let map = MmapOptions::new()
            .offset(paddr as u64)
            .len(page_size())
            .map_raw(&file)
            .map_err(|source| VuartError::MapFailed {
                base: paddr,
                source,
            })?;

        log::debug!(
            "Mapped {} bytes of {} at {:#x} -> {:p}",
            map.len(),
            path.display(),
            paddr,
            map.as_ptr()
        );

        Ok(Self {
            map,
            paddr,
            _not_send: PhantomData,
        })
    }

    /// Physical address of the window
    pub fn paddr(&self) -> usize {
        self.paddr
    }

    /// Length of the window in bytes
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// The window is never empty once mapped
    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }
}

impl RegisterIo for DeviceWindow {
    #[inline]
    fn read(&mut self, reg: Register) -> u8 {
        let offset = reg.offset();
        debug_assert!(offset < self.map.len(), "VUART read offset out of bounds");
        // SAFETY: the map is live for &self and at least one page long, and
        // every register offset is below WINDOW_SPAN <= PAGE_SIZE
        let value = unsafe { read_volatile(self.map.as_ptr().add(offset)) };
        full_barrier();
        value
    }

    #[inline]
    fn write(&mut self, reg: Register, value: u8) {
        let offset = reg.offset();
        debug_assert!(offset < self.map.len(), "VUART write offset out of bounds");
        // SAFETY: as for read; the mapping is PROT_WRITE and exclusively ours
        unsafe { write_volatile(self.map.as_mut_ptr().add(offset), value) };
        full_barrier();
    }
}

impl Drop for DeviceWindow {
    fn drop(&mut self) {
        log::debug!("Unmapping VUART window at {:#x}", self.paddr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    fn backing_file(pages: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; pages * page_size()]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_page_alignment() {
        assert!(page_size() >= PAGE_SIZE);
        assert!(is_aligned(0));
        assert!(is_aligned(page_size() * 3));
        assert!(!is_aligned(0x1234));
    }

    #[test]
    fn test_unaligned_base_rejected() {
        let file = backing_file(2);
        let result = DeviceWindow::open_path(file.path(), 0x14);
        match result {
            Err(VuartError::MapFailed { base, source }) => {
                assert_eq!(base, 0x14);
                assert_eq!(source.raw_os_error(), Some(libc::EINVAL));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unaligned base was mapped"),
        }
    }

    #[test]
    fn test_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let result = DeviceWindow::open_path(dir.path().join("mem"), 0);
        assert!(matches!(
            result,
            Err(VuartError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_window_covers_one_page() {
        let file = backing_file(2);
        let window = DeviceWindow::open_path(file.path(), page_size()).unwrap();
        assert_eq!(window.len(), page_size());
        assert_eq!(window.paddr(), page_size());
        assert!(!window.is_empty());
    }

    #[test]
    fn test_accesses_land_at_register_offsets() {
        let mut file = backing_file(2);
        let base = page_size();

        {
            let mut window = DeviceWindow::open_path(file.path(), base).unwrap();
            window.write(Register::Mcr, 0x0b);
            window.write(Register::Gcra, 0x21);
            window.write(Register::Thr, b'y');
            assert_eq!(window.read(Register::Mcr), 0x0b);
            assert_eq!(window.read(Register::Rbr), b'y');
        }

        let mut contents = Vec::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_end(&mut contents).unwrap();

        assert_eq!(contents[base + 0x10], 0x0b);
        assert_eq!(contents[base + 0x20], 0x21);
        assert_eq!(contents[base], b'y');
        // The page before the window is untouched
        assert!(contents[..base].iter().all(|&b| b == 0));
    }
}
