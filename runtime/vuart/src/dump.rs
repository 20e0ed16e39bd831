//! Register dumps at the drill checkpoints
//!
//! The register order is fixed so that dumps from different runs and boards
//! can be diffed line by line.

use std::fmt;

use crate::regs::Register;
use crate::RegisterIo;

/// Registers read by [`dump`], in output order
pub const DUMP_ORDER: [Register; 14] = [
    Register::Ier,
    Register::Iir,
    Register::Lcr,
    Register::Mcr,
    Register::Lsr,
    Register::Msr,
    Register::Gcra,
    Register::Gcrb,
    Register::Varl,
    Register::Varh,
    Register::Gcre,
    Register::Gcrf,
    Register::Gcrg,
    Register::Gcrh,
];

/// Point in the drill at which a dump is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Right after mapping, before any configuration
    Startup,
    /// After the initialisation sequence
    Initialised,
    /// Before exit
    Terminating,
}

impl Checkpoint {
    pub const fn heading(self) -> &'static str {
        match self {
            Checkpoint::Startup => "Startup configuration",
            Checkpoint::Initialised => "Initialised configuration",
            Checkpoint::Terminating => "Terminating configuration",
        }
    }
}

/// Values read during one dump, in [`DUMP_ORDER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub values: [u8; DUMP_ORDER.len()],
}

impl RegisterSnapshot {
    pub fn get(&self, reg: Register) -> Option<u8> {
        DUMP_ORDER
            .iter()
            .position(|&r| r == reg)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u8)> + '_ {
        DUMP_ORDER.iter().copied().zip(self.values.iter().copied())
    }
}

impl fmt::Display for RegisterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (reg, value) in self.iter() {
            writeln!(f, "\t{}:\t{:#04x}", reg.name(), value)?;
        }
        Ok(())
    }
}

/// Read and log the diagnostic register set.
///
/// Note that reading LSR clears its latched error bits and reading IIR may
/// acknowledge a pending THRE interrupt, exactly as any other reader would.
pub fn dump<R: RegisterIo + ?Sized>(regs: &mut R, checkpoint: Checkpoint) -> RegisterSnapshot {
    let mut values = [0u8; DUMP_ORDER.len()];
    for (value, &reg) in values.iter_mut().zip(DUMP_ORDER.iter()) {
        *value = regs.read(reg);
    }

    let snapshot = RegisterSnapshot { values };

    log::info!("{}", checkpoint.heading());
    for line in snapshot.to_string().lines() {
        log::info!("{line}");
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Access, MockVuart};

    #[test]
    fn test_dump_reads_canonical_order() {
        let mut mock = MockVuart::new();
        dump(&mut mock, Checkpoint::Startup);

        let reads: Vec<Register> = mock
            .accesses()
            .iter()
            .map(|a| match a {
                Access::Read(reg) => *reg,
                Access::Write(reg, _) => panic!("dump wrote {reg:?}"),
            })
            .collect();
        assert_eq!(reads, DUMP_ORDER.to_vec());
    }

    #[test]
    fn test_snapshot_values() {
        let mut mock = MockVuart::new()
            .with_register(Register::Ier, 0x03)
            .with_register(Register::Gcra, 0x21)
            .with_register(Register::Gcrh, 0xa5);

        let snapshot = dump(&mut mock, Checkpoint::Initialised);
        assert_eq!(snapshot.get(Register::Ier), Some(0x03));
        assert_eq!(snapshot.get(Register::Gcra), Some(0x21));
        assert_eq!(snapshot.get(Register::Gcrh), Some(0xa5));
        assert_eq!(snapshot.get(Register::Scr), None);
    }

    #[test]
    fn test_snapshot_rendering() {
        let mut mock = MockVuart::new().with_register(Register::Mcr, 0x0b);
        let text = dump(&mut mock, Checkpoint::Terminating).to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 14);
        assert_eq!(lines[0], "\tIER:\t0x00");
        assert_eq!(lines[3], "\tMCR:\t0x0b");
        assert_eq!(lines[13], "\tGCRH:\t0x00");
    }

    #[test]
    fn test_checkpoint_headings() {
        assert_eq!(Checkpoint::Startup.heading(), "Startup configuration");
        assert_eq!(Checkpoint::Initialised.heading(), "Initialised configuration");
        assert_eq!(Checkpoint::Terminating.heading(), "Terminating configuration");
    }
}
