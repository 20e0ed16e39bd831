//! VUART - Register drill for the Aspeed virtual UART
//!
//! # Purpose
//! Exercises the BMC's virtual UART through its memory-mapped register file:
//! maps the device page out of `/dev/mem`, applies a configurable
//! initialisation sequence, then polls the line status register to push and
//! pull bytes while tracking when the peripheral stalls and resumes.
//!
//! # Integration Points
//! - Depends on: Linux `/dev/mem`, `CLOCK_BOOTTIME`
//! - Provides to: the `uuart` command line tool
//! - Capabilities required: read/write access to physical memory (root)
//!
//! # Architecture
//! ```text
//! DeviceWindow (mmio) ──► RegisterIo ──┬─► dump      (diagnostics)
//!                                      ├─► initialize (sequencer)
//!                                      └─► PollLoop   (stall/resume engine)
//! ```
//! Everything above the mapping talks to the device through the
//! [`RegisterIo`] trait, so the sequencer and the poll loop run unchanged
//! against [`mock::MockVuart`].
//!
//! # Testing Strategy
//! - Unit tests: register encodings, IER computation, detector transitions
//! - Integration tests: full drill scenarios against the mock register file
//! - Mapping tests: `DeviceWindow` over a temporary file standing in for `/dev/mem`

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod barrier;
mod clock;
mod dump;
mod init;
mod mmio;
mod poll;
mod regs;

pub mod mock;

pub use clock::{BootClock, Clock, Timestamp};
pub use dump::{dump, Checkpoint, RegisterSnapshot, DUMP_ORDER};
pub use init::{configure_ier, initialize};
pub use mmio::{is_aligned, page_size, DeviceWindow, DEV_MEM, PAGE_SIZE};
pub use poll::{FlowState, Iterations, PollLoop, PollReport, PollState, Transition, TX_BYTE};
pub use regs::{Fcr, Gcra, Ier, Instance, Lsr, Mcr, Register};

/// Error types for VUART operations
#[derive(Debug, Error)]
pub enum VuartError {
    #[error("Cannot open {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot map physical address {base:#x}: {source}")]
    MapFailed {
        base: usize,
        #[source]
        source: io::Error,
    },

    #[error("Boot clock unavailable: {0}")]
    ClockUnavailable(#[source] io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to emit received data: {0}")]
    Output(#[source] io::Error),
}

pub type Result<T> = core::result::Result<T, VuartError>;

/// Byte-wide access to the VUART register file.
///
/// Accesses have side effects on the device (reading RBR pops the Rx FIFO,
/// reading LSR clears latched errors), so both methods take `&mut self` and
/// implementations must not cache, merge or reorder them.
pub trait RegisterIo {
    /// Load one register.
    fn read(&mut self, reg: Register) -> u8;

    /// Store one register.
    fn write(&mut self, reg: Register, value: u8);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read(&mut self, reg: Register) -> u8 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u8) {
        (**self).write(reg, value)
    }
}

/// Drill configuration, fixed before the poll loop starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VuartConfig {
    /// MCR[DTR] and MCR[RTS] are already asserted
    pub assume_dtr: bool,

    /// The VUART is already enabled and corked
    pub assume_enabled: bool,

    /// The FIFOs are configured and need no reset
    pub assume_fifos: bool,

    /// Ignore LSR[DR] and never read RBR
    pub ignore_rx: bool,

    /// Ignore LSR[THRE] and never write THR
    pub ignore_tx: bool,
}
