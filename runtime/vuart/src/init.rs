//! Initialisation sequence
//!
//! Brings the VUART into a state where the drill can move bytes:
//! 1. enable the device with host Tx corked (unless `assume_enabled`)
//! 2. mask the Tx/Rx interrupts for every channel the drill polls
//! 3. reset and enable the FIFOs (unless `assume_fifos`)
//! 4. assert DTR/RTS/OUT2 (unless `assume_dtr`)

use crate::regs::{Fcr, Gcra, Ier, Mcr, Register};
use crate::{RegisterIo, VuartConfig};

/// Compute the IER value to program for `config`, starting from `current`.
///
/// The drill polls instead of taking interrupts, so the enable bit of every
/// channel it services is cleared. If neither ETBEI nor ERBFI is left the
/// whole register is cleared, line and modem status enables included.
pub fn configure_ier(current: Ier, config: &VuartConfig) -> Ier {
    let mut ier = current;

    if !config.ignore_tx {
        ier.remove(Ier::ETBEI);
    }

    if !config.ignore_rx {
        ier.remove(Ier::ERBFI);
    }

    if !ier.intersects(Ier::ETBEI | Ier::ERBFI) {
        ier = Ier::empty();
    }

    ier
}

/// Apply the initialisation sequence. Returns the IER value written.
pub fn initialize<R: RegisterIo + ?Sized>(regs: &mut R, config: &VuartConfig) -> Ier {
    if !config.assume_enabled {
        let gcra = Gcra::VUART_EN | Gcra::H_TX_CORK;
        log::debug!("GCRA <- {:#04x}", gcra.bits());
        regs.write(Register::Gcra, gcra.bits());
    }

    let current = Ier::from_bits_retain(regs.read(Register::Ier));
    let ier = configure_ier(current, config);
    log::debug!("IER <- {:#04x} (was {:#04x})", ier.bits(), current.bits());
    regs.write(Register::Ier, ier.bits());

    if !config.assume_fifos {
        log::debug!("FCR <- {:#04x}", Fcr::RESET_AND_ENABLE.bits());
        regs.write(Register::Fcr, Fcr::RESET_AND_ENABLE.bits());
    }

    if !config.assume_dtr {
        log::debug!("MCR <- {:#04x}", Mcr::READY.bits());
        regs.write(Register::Mcr, Mcr::READY.bits());
    }

    ier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockVuart;

    fn all_configs() -> impl Iterator<Item = VuartConfig> {
        (0u8..32).map(|bits| VuartConfig {
            assume_dtr: bits & 1 != 0,
            assume_enabled: bits & 2 != 0,
            assume_fifos: bits & 4 != 0,
            ignore_rx: bits & 8 != 0,
            ignore_tx: bits & 16 != 0,
        })
    }

    #[test]
    fn test_serviced_channels_never_enabled() {
        for config in all_configs() {
            for raw in 0..=u8::MAX {
                let ier = configure_ier(Ier::from_bits_retain(raw), &config);
                if !config.ignore_tx {
                    assert!(!ier.contains(Ier::ETBEI), "{config:?} {raw:#04x}");
                }
                if !config.ignore_rx {
                    assert!(!ier.contains(Ier::ERBFI), "{config:?} {raw:#04x}");
                }
            }
        }
    }

    #[test]
    fn test_ier_forced_to_zero() {
        for config in all_configs() {
            for raw in 0..=u8::MAX {
                let ier = configure_ier(Ier::from_bits_retain(raw), &config);
                if !ier.intersects(Ier::ETBEI | Ier::ERBFI) {
                    assert_eq!(ier.bits(), 0, "{config:?} {raw:#04x}");
                }
            }
        }
    }

    #[test]
    fn test_ignored_channel_keeps_other_bits() {
        let config = VuartConfig {
            ignore_tx: true,
            ..Default::default()
        };
        let current = Ier::ETBEI | Ier::ERBFI | Ier::ELSI;
        assert_eq!(configure_ier(current, &config), Ier::ETBEI | Ier::ELSI);
    }

    #[test]
    fn test_ier_only_status_enables_cleared() {
        let config = VuartConfig::default();
        let current = Ier::ELSI | Ier::EDSSI;
        assert_eq!(configure_ier(current, &config), Ier::empty());
    }

    #[test]
    fn test_full_sequence_order() {
        let mut mock = MockVuart::new().with_register(Register::Ier, 0x0f);
        let ier = initialize(&mut mock, &VuartConfig::default());

        assert_eq!(ier, Ier::empty());
        assert_eq!(
            mock.writes(),
            vec![
                (Register::Gcra, 0x21),
                (Register::Ier, 0x00),
                (Register::Fcr, 0x07),
                (Register::Mcr, 0x0b),
            ]
        );
        assert_eq!(mock.value(Register::Gcra), 0x21);
        assert_eq!(mock.value(Register::Ier), 0x00);
        assert_eq!(mock.value(Register::Mcr), 0x0b);
    }

    #[test]
    fn test_all_assumptions_skip_gated_writes() {
        let config = VuartConfig {
            assume_dtr: true,
            assume_enabled: true,
            assume_fifos: true,
            ..Default::default()
        };
        let mut mock = MockVuart::new().with_register(Register::Ier, 0x02);
        initialize(&mut mock, &config);

        // Only the unconditional IER update remains
        assert_eq!(mock.writes(), vec![(Register::Ier, 0x00)]);
    }
}
