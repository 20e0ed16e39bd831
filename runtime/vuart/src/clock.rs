//! Boot-relative timestamps for stall/resume reports

use std::fmt;
use std::io;
use std::time::Duration;

use crate::{Result, VuartError};

/// Time since boot, including time spent suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const fn new(since_boot: Duration) -> Self {
        Self(since_boot)
    }

    pub const fn since_boot(self) -> Duration {
        self.0
    }
}

impl fmt::Display for Timestamp {
    /// `[  12345.000678]`, the kernel log layout
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:7}.{:06}]", self.0.as_secs(), self.0.subsec_micros())
    }
}

/// Source of timestamps for the poll loop
pub trait Clock {
    /// Read the current time.
    ///
    /// # Errors
    /// Returns [`VuartError::ClockUnavailable`] if the clock cannot be read.
    fn now(&mut self) -> Result<Timestamp>;
}

/// `CLOCK_BOOTTIME`
#[derive(Debug, Clone, Copy, Default)]
pub struct BootClock;

impl Clock for BootClock {
    fn now(&mut self) -> Result<Timestamp> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // SAFETY: ts is a valid, writable timespec
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_BOOTTIME, &mut ts) };
        if rc != 0 {
            return Err(VuartError::ClockUnavailable(io::Error::last_os_error()));
        }

        Ok(Timestamp(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)))
    }
}
