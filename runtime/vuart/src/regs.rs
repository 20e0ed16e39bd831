//! VUART register map
//!
//! The Aspeed VUART is a 16550-style register file with every register on a
//! 4-byte stride, followed by the device-specific general control registers.
//! All accesses are one byte wide.

use bitflags::bitflags;
use static_assertions::const_assert;

use crate::mmio::PAGE_SIZE;

/// VUART instance selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Instance {
    Vuart1,
    #[default]
    Vuart2,
}

impl Instance {
    /// Physical base address of this instance's register page
    pub const fn base(self) -> usize {
        match self {
            Instance::Vuart1 => 0x1e78_7000,
            Instance::Vuart2 => 0x1e78_8000,
        }
    }
}

/// A register in the VUART window.
///
/// Several names alias the same offset (RBR/THR/DLL, IER/DLM, IIR/FCR); the
/// name records the intent of the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Receive buffer (read)
    Rbr,
    /// Transmit holding (write)
    Thr,
    /// Divisor latch low
    Dll,
    /// Interrupt enable
    Ier,
    /// Divisor latch high
    Dlm,
    /// Interrupt identification (read)
    Iir,
    /// FIFO control (write)
    Fcr,
    /// Line control
    Lcr,
    /// Modem control
    Mcr,
    /// Line status
    Lsr,
    /// Modem status
    Msr,
    /// Scratch
    Scr,
    /// General control A
    Gcra,
    /// General control B
    Gcrb,
    /// Variant low
    Varl,
    /// Variant high
    Varh,
    /// General control E
    Gcre,
    /// General control F
    Gcrf,
    /// General control G
    Gcrg,
    /// General control H
    Gcrh,
}

impl Register {
    /// Byte offset of the register from the window base
    pub const fn offset(self) -> usize {
        match self {
            Register::Rbr | Register::Thr | Register::Dll => 0x00,
            Register::Ier | Register::Dlm => 0x04,
            Register::Iir | Register::Fcr => 0x08,
            Register::Lcr => 0x0c,
            Register::Mcr => 0x10,
            Register::Lsr => 0x14,
            Register::Msr => 0x18,
            Register::Scr => 0x1c,
            Register::Gcra => 0x20,
            Register::Gcrb => 0x24,
            Register::Varl => 0x28,
            Register::Varh => 0x2c,
            Register::Gcre => 0x30,
            Register::Gcrf => 0x34,
            Register::Gcrg => 0x38,
            Register::Gcrh => 0x3c,
        }
    }

    /// Mnemonic used in register dumps
    pub const fn name(self) -> &'static str {
        match self {
            Register::Rbr => "RBR",
            Register::Thr => "THR",
            Register::Dll => "DLL",
            Register::Ier => "IER",
            Register::Dlm => "DLM",
            Register::Iir => "IIR",
            Register::Fcr => "FCR",
            Register::Lcr => "LCR",
            Register::Mcr => "MCR",
            Register::Lsr => "LSR",
            Register::Msr => "MSR",
            Register::Scr => "SCR",
            Register::Gcra => "GCRA",
            Register::Gcrb => "GCRB",
            Register::Varl => "VARL",
            Register::Varh => "VARH",
            Register::Gcre => "GCRE",
            Register::Gcrf => "GCRF",
            Register::Gcrg => "GCRG",
            Register::Gcrh => "GCRH",
        }
    }
}

/// Size of the register file; every offset lies below this.
pub const WINDOW_SPAN: usize = Register::Gcrh.offset() + 1;

const_assert!(WINDOW_SPAN <= PAGE_SIZE);

bitflags! {
    /// Interrupt Enable Register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ier: u8 {
        /// Received data available
        const ERBFI = 1 << 0;
        /// Transmit holding register empty
        const ETBEI = 1 << 1;
        /// Receiver line status
        const ELSI  = 1 << 2;
        /// Modem status
        const EDSSI = 1 << 3;
    }
}

bitflags! {
    /// Line Status Register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lsr: u8 {
        /// Data ready
        const DR   = 1 << 0;
        /// Overrun error
        const OE   = 1 << 1;
        /// Parity error
        const PE   = 1 << 2;
        /// Framing error
        const FE   = 1 << 3;
        /// Break interrupt
        const BI   = 1 << 4;
        /// Transmit holding register empty
        const THRE = 1 << 5;
        /// Transmitter empty
        const TEMT = 1 << 6;
        /// Error in Rx FIFO
        const RFE  = 1 << 7;

        /// Latched error conditions, cleared by reading LSR
        const ERRORS = Self::OE.bits()
                     | Self::PE.bits()
                     | Self::FE.bits()
                     | Self::BI.bits()
                     | Self::RFE.bits();
    }
}

impl Lsr {
    /// Either direction can make progress
    pub const fn is_flowing(self) -> bool {
        self.intersects(Lsr::DR.union(Lsr::THRE))
    }
}

bitflags! {
    /// FIFO Control Register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fcr: u8 {
        const ENABLE   = 1 << 0;
        const CLEAR_RX = 1 << 1;
        const CLEAR_TX = 1 << 2;

        const RESET_AND_ENABLE = Self::ENABLE.bits()
                               | Self::CLEAR_RX.bits()
                               | Self::CLEAR_TX.bits();
    }
}

bitflags! {
    /// Modem Control Register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mcr: u8 {
        const DTR  = 1 << 0;
        const RTS  = 1 << 1;
        const OUT1 = 1 << 2;
        const OUT2 = 1 << 3;
        const LOOP = 1 << 4;

        /// Handshake lines asserted, host interrupt routed
        const READY = Self::DTR.bits() | Self::RTS.bits() | Self::OUT2.bits();
    }
}

bitflags! {
    /// General Control Register A
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Gcra: u8 {
        /// VUART enable
        const VUART_EN  = 1 << 0;
        /// SIRQ polarity
        const SIRQ_POL  = 1 << 1;
        /// Host-side timeout (2 bits)
        const S_TIMEOUT = (1 << 3) | (1 << 2);
        /// Host loopback
        const H_LOOP    = 1 << 4;
        /// Hold host Tx data in the FIFO
        const H_TX_CORK = 1 << 5;
        /// Host Rx FIFO trigger level (2 bits)
        const H_RFT     = (1 << 7) | (1 << 6);
    }
}

const_assert!(Fcr::RESET_AND_ENABLE.bits() == 0x07);
const_assert!(Mcr::READY.bits() == 0x0b);
