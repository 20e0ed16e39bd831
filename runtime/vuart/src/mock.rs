//! In-memory VUART for exercising the drill without hardware
//!
//! [`MockVuart`] is a register file that records every access. LSR reads are
//! served from a script so tests can drive the stall detector through any
//! sequence of line states; RBR reads are served from a receive queue and THR
//! writes are collected separately.

use std::collections::VecDeque;
use std::time::Duration;

use crate::clock::{Clock, Timestamp};
use crate::regs::{Register, WINDOW_SPAN};
use crate::{RegisterIo, Result};

/// One register access, in the order it was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(Register),
    Write(Register, u8),
}

/// Mock register file
#[derive(Debug, Clone)]
pub struct MockVuart {
    regs: [u8; WINDOW_SPAN],
    lsr_script: VecDeque<u8>,
    rx_queue: VecDeque<u8>,
    tx_log: Vec<u8>,
    accesses: Vec<Access>,
}

impl Default for MockVuart {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVuart {
    /// All registers zero, nothing scripted
    pub fn new() -> Self {
        Self {
            regs: [0; WINDOW_SPAN],
            lsr_script: VecDeque::new(),
            rx_queue: VecDeque::new(),
            tx_log: Vec::new(),
            accesses: Vec::new(),
        }
    }

    /// Preset a register value
    pub fn with_register(mut self, reg: Register, value: u8) -> Self {
        self.regs[reg.offset()] = value;
        self
    }

    /// Queue LSR samples. Once the script runs out, LSR reads return the
    /// last scripted value (or the preset register value if none).
    pub fn script_lsr(mut self, samples: impl IntoIterator<Item = u8>) -> Self {
        self.lsr_script.extend(samples);
        self
    }

    /// Queue bytes to be returned by RBR reads; an empty queue reads as 0
    pub fn queue_rx(mut self, bytes: impl IntoIterator<Item = u8>) -> Self {
        self.rx_queue.extend(bytes);
        self
    }

    /// Current value at the register's offset
    pub fn value(&self, reg: Register) -> u8 {
        self.regs[reg.offset()]
    }

    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    /// Every write, in order
    pub fn writes(&self) -> Vec<(Register, u8)> {
        self.accesses
            .iter()
            .filter_map(|a| match *a {
                Access::Write(reg, value) => Some((reg, value)),
                Access::Read(_) => None,
            })
            .collect()
    }

    /// Number of reads issued to `reg`
    pub fn reads_of(&self, reg: Register) -> usize {
        self.accesses
            .iter()
            .filter(|a| **a == Access::Read(reg))
            .count()
    }

    /// Bytes written to THR
    pub fn transmitted(&self) -> &[u8] {
        &self.tx_log
    }
}

impl RegisterIo for MockVuart {
    fn read(&mut self, reg: Register) -> u8 {
        self.accesses.push(Access::Read(reg));

        match reg {
            Register::Lsr => {
                if let Some(lsr) = self.lsr_script.pop_front() {
                    self.regs[reg.offset()] = lsr;
                }
                self.regs[reg.offset()]
            }
            Register::Rbr => self.rx_queue.pop_front().unwrap_or(0),
            _ => self.regs[reg.offset()],
        }
    }

    fn write(&mut self, reg: Register, value: u8) {
        self.accesses.push(Access::Write(reg, value));

        match reg {
            Register::Thr => self.tx_log.push(value),
            _ => self.regs[reg.offset()] = value,
        }
    }
}

/// Deterministic clock advancing by a fixed step on every read
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: Duration,
    step: Duration,
    reads: u64,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::starting_at(Duration::from_secs(1), Duration::from_millis(1))
    }
}

impl FixedClock {
    pub fn starting_at(now: Duration, step: Duration) -> Self {
        Self {
            now,
            step,
            reads: 0,
        }
    }

    /// Number of times the clock was read
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl Clock for FixedClock {
    fn now(&mut self) -> Result<Timestamp> {
        let ts = Timestamp::new(self.now);
        self.now += self.step;
        self.reads += 1;
        Ok(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsr_script_holds_last_value() {
        let mut mock = MockVuart::new().script_lsr([0x60, 0x01]);
        assert_eq!(mock.read(Register::Lsr), 0x60);
        assert_eq!(mock.read(Register::Lsr), 0x01);
        assert_eq!(mock.read(Register::Lsr), 0x01);
        assert_eq!(mock.reads_of(Register::Lsr), 3);
    }

    #[test]
    fn test_thr_and_rbr_are_separate() {
        let mut mock = MockVuart::new().queue_rx(*b"ok");
        mock.write(Register::Thr, b'y');
        assert_eq!(mock.read(Register::Rbr), b'o');
        assert_eq!(mock.read(Register::Rbr), b'k');
        assert_eq!(mock.read(Register::Rbr), 0);
        assert_eq!(mock.transmitted(), b"y");
    }
}
