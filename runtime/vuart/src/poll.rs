//! Poll loop - the stall/resume engine
//!
//! Each iteration samples LSR once. DR or THRE set means the VUART is
//! flowing; neither set means it has stalled. Every change of state is
//! reported with a boot-relative timestamp, and in the same iteration one
//! byte is pushed to THR and/or pulled from RBR as the status allows.
//!
//! ```text
//!            LSR & (DR|THRE) != 0
//!   ┌──────────┐ ◄──────────────── ┌─────────┐
//!   │ Flowing  │                   │ Stalled │
//!   └──────────┘ ────────────────► └─────────┘
//!            LSR & (DR|THRE) == 0
//! ```

use std::fmt;
use std::io::Write;

use crate::clock::{Clock, Timestamp};
use crate::regs::{Lsr, Register};
use crate::{RegisterIo, Result, VuartConfig, VuartError};

/// Byte written to THR whenever it is empty
pub const TX_BYTE: u8 = b'y';

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Flowing,
    Stalled,
}

impl FlowState {
    /// State implied by one LSR sample
    pub const fn from_lsr(lsr: Lsr) -> Self {
        if lsr.is_flowing() {
            FlowState::Flowing
        } else {
            FlowState::Stalled
        }
    }
}

/// A change of [`FlowState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub at: Timestamp,
    pub iteration: u64,
    pub to: FlowState,
    pub lsr: Lsr,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.to {
            FlowState::Flowing => "resumed",
            FlowState::Stalled => "stalled",
        };
        write!(
            f,
            "{} VUART {} at {}, LSR: {:#04x}",
            self.at,
            what,
            self.iteration,
            self.lsr.bits()
        )
    }
}

/// How long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    Bounded(u64),
    Forever,
}

impl From<i64> for Iterations {
    /// Negative counts run forever
    fn from(count: i64) -> Self {
        u64::try_from(count).map_or(Iterations::Forever, Iterations::Bounded)
    }
}

impl fmt::Display for Iterations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iterations::Bounded(n) => write!(f, "{n}"),
            Iterations::Forever => f.write_str("unbounded"),
        }
    }
}

/// Mutable state of the drill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollState {
    pub flow: FlowState,
    pub transmitted: u64,
    pub received: u64,
    pub stalls: u64,
}

impl PollState {
    pub fn is_stalled(&self) -> bool {
        self.flow == FlowState::Stalled
    }
}

/// Final counters of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub iterations: u64,
    /// `None` when Tx was ignored
    pub transmitted: Option<u64>,
    /// `None` when Rx was ignored
    pub received: Option<u64>,
    pub stalls: u64,
}

impl PollReport {
    pub fn log(&self) {
        if let Some(txd) = self.transmitted {
            log::info!("Transmitted:\t{txd}");
        }
        if let Some(rxd) = self.received {
            log::info!("Received:\t{rxd}");
        }
        log::debug!("Iterations:\t{}, stalls:\t{}", self.iterations, self.stalls);
    }
}

/// The poll loop context: device, clock, Rx sink and counters.
///
/// Received bytes go to `rx_sink` verbatim and nowhere else; diagnostics go
/// through `log`.
pub struct PollLoop<R, C, W> {
    regs: R,
    clock: C,
    rx_sink: W,
    config: VuartConfig,
    state: PollState,
    iteration: u64,
}

impl<R, C, W> PollLoop<R, C, W>
where
    R: RegisterIo,
    C: Clock,
    W: Write,
{
    pub fn new(regs: R, config: VuartConfig, clock: C, rx_sink: W) -> Self {
        Self {
            regs,
            clock,
            rx_sink,
            config,
            state: PollState::default(),
            iteration: 0,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Index of the next iteration
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Run one iteration. Returns the transition it caused, if any.
    ///
    /// # Errors
    /// Fails if the clock cannot be read on a transition, or if a received
    /// byte cannot be written to the sink.
    pub fn step(&mut self) -> Result<Option<Transition>> {
        let lsr = Lsr::from_bits_retain(self.regs.read(Register::Lsr));
        let target = FlowState::from_lsr(lsr);

        let transition = if target != self.state.flow {
            let transition = Transition {
                at: self.clock.now()?,
                iteration: self.iteration,
                to: target,
                lsr,
            };
            log::info!("{transition}");
            if target == FlowState::Stalled {
                self.state.stalls += 1;
                if lsr.intersects(Lsr::ERRORS) {
                    log::debug!("  latched errors: {:?}", lsr & Lsr::ERRORS);
                }
            }
            Some(transition)
        } else {
            None
        };
        self.state.flow = target;

        if !self.config.ignore_tx && lsr.contains(Lsr::THRE) {
            self.regs.write(Register::Thr, TX_BYTE);
            self.state.transmitted += 1;
        }

        if !self.config.ignore_rx && lsr.contains(Lsr::DR) {
            let byte = self.regs.read(Register::Rbr);
            self.rx_sink.write_all(&[byte]).map_err(VuartError::Output)?;
            self.state.received += 1;
        }

        self.iteration += 1;
        Ok(transition)
    }

    /// Poll for `iterations`, then flush the Rx sink and report.
    ///
    /// [`Iterations::Forever`] only returns on error.
    pub fn run(&mut self, iterations: Iterations) -> Result<PollReport> {
        match iterations {
            Iterations::Bounded(count) => {
                for _ in 0..count {
                    self.step()?;
                }
            }
            Iterations::Forever => loop {
                self.step()?;
            },
        }

        self.rx_sink.flush().map_err(VuartError::Output)?;
        Ok(self.report())
    }

    pub fn report(&self) -> PollReport {
        PollReport {
            iterations: self.iteration,
            transmitted: (!self.config.ignore_tx).then_some(self.state.transmitted),
            received: (!self.config.ignore_rx).then_some(self.state.received),
            stalls: self.state.stalls,
        }
    }

    /// Give back the register handle and the Rx sink
    pub fn into_parts(self) -> (R, W) {
        (self.regs, self.rx_sink)
    }
}
