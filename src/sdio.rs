//! SDIO / SDMMC host controller registers
//!
//! Every instance uses the same offset layout: the F4 `SDIO` as well as the
//! H7 `SDMMC1` and `SDMMC2`. The field definitions below follow the F4 `SDIO`.
//! On SDMMC parts use the raw accessors.

use crate::memory_map::{SDIO_BASE, SDMMC1_BASE, SDMMC2_BASE};
use crate::mmio::Mmio;
use num_enum::IntoPrimitive;
use paste::paste;

/// Register offsets
pub mod regs {
    pub const POWER: usize = 0x00;
    pub const CLKCR: usize = 0x04;
    pub const ARG: usize = 0x08;
    pub const CMD: usize = 0x0C;
    pub const RESPCMD: usize = 0x10;
    pub const RESP1: usize = 0x14;
    pub const RESP2: usize = 0x18;
    pub const RESP3: usize = 0x1C;
    pub const RESP4: usize = 0x20;
    pub const DTIMER: usize = 0x24;
    pub const DLEN: usize = 0x28;
    pub const DCTRL: usize = 0x2C;
    /// Read only
    pub const DCOUNT: usize = 0x30;
    pub const STA: usize = 0x34;
    pub const ICR: usize = 0x38;
    pub const MASK: usize = 0x3C;
    pub const FIFOCNT: usize = 0x48;
    /// First of [`super::FIFO_WORDS`] consecutive FIFO words
    pub const FIFO: usize = 0x80;
}

/// Depth of the data FIFO in 32 bit words
pub const FIFO_WORDS: usize = 32;

/// `POWER.PWRCTRL`
pub mod power {
    pub const PWRCTRL_MASK: u32 = 0b11;
    pub const OFF: u32 = 0b00;
    pub const ON: u32 = 0b11;
}

/// `CLKCR` fields
pub mod clkcr {
    pub const CLKDIV_MASK: u32 = 0xFF;
    pub const CLKEN: u32 = 1 << 8;
    pub const PWRSAV: u32 = 1 << 9;
    pub const BYPASS: u32 = 1 << 10;
    pub const WIDBUS_SHIFT: u32 = 11;
    pub const WIDBUS_MASK: u32 = 0b11;
    pub const NEGEDGE: u32 = 1 << 13;
    pub const HWFC_EN: u32 = 1 << 14;
}

/// `DCTRL` bits
pub mod dctrl {
    pub const DTEN: u32 = 1 << 0;
    /// Card to controller
    pub const DTDIR: u32 = 1 << 1;
    pub const DTMODE: u32 = 1 << 2;
    pub const DMAEN: u32 = 1 << 3;
    pub const DBLOCKSIZE_SHIFT: u32 = 4;
    pub const DBLOCKSIZE_MASK: u32 = 0xF;
}

/// `STA` flags cleared through `ICR`
pub const STATIC_FLAGS: u32 = 0x00C0_07FF;

macro_rules! instances {
    ($($name:ident => $base:ident),* $(,)?) => {
        paste! {
            $(
                #[doc = "Absolute register addresses of the `" $name "` instance"]
                pub mod [<$name:lower>] {
                    use super::{regs, $base};

                    pub const POWER: usize = $base + regs::POWER;
                    pub const CLKCR: usize = $base + regs::CLKCR;
                    pub const ARG: usize = $base + regs::ARG;
                    pub const CMD: usize = $base + regs::CMD;
                    pub const RESPCMD: usize = $base + regs::RESPCMD;
                    pub const RESP1: usize = $base + regs::RESP1;
                    pub const RESP2: usize = $base + regs::RESP2;
                    pub const RESP3: usize = $base + regs::RESP3;
                    pub const RESP4: usize = $base + regs::RESP4;
                    pub const DTIMER: usize = $base + regs::DTIMER;
                    pub const DLEN: usize = $base + regs::DLEN;
                    pub const DCTRL: usize = $base + regs::DCTRL;
                    pub const DCOUNT: usize = $base + regs::DCOUNT;
                    pub const STA: usize = $base + regs::STA;
                    pub const ICR: usize = $base + regs::ICR;
                    pub const MASK: usize = $base + regs::MASK;
                    pub const FIFOCNT: usize = $base + regs::FIFOCNT;
                    pub const FIFO: usize = $base + regs::FIFO;
                }
            )*

            impl<B: Mmio> Sdio<B> {
                $(
                    #[doc = "Handle on the `" $name "` instance"]
                    pub fn [<$name:lower>](bus: B) -> Self {
                        Self::with_base(bus, $base)
                    }
                )*
            }
        }
    };
}

instances! {
    SDIO => SDIO_BASE,
    SDMMC1 => SDMMC1_BASE,
    SDMMC2 => SDMMC2_BASE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WaitResponse {
    None = 0b00,
    Short = 0b01,
    Long = 0b11,
}

pub struct Sdio<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Sdio<B> {
    pub fn with_base(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }

    pub fn power_on(&self) {
        self.set_power(power::ON);
    }

    pub fn power_off(&self) {
        self.set_power(power::OFF);
    }

    fn set_power(&self, ctrl: u32) {
        self.bus.modify32(self.reg(regs::POWER), |mut r| {
            set_u32!(r, ctrl, power::PWRCTRL_MASK, 0);
            r
        });
    }

    pub fn is_powered(&self) -> bool {
        self.bus.read32(self.reg(regs::POWER)) & power::PWRCTRL_MASK == power::ON
    }

    pub fn set_clock_control(&self, clkcr: u32) {
        self.bus.write32(self.reg(regs::CLKCR), clkcr);
    }

    pub fn clock_control(&self) -> u32 {
        self.bus.read32(self.reg(regs::CLKCR))
    }

    /// Writes the argument, then the command register that starts the
    /// command path
    pub fn send_command(&self, arg: u32, cmd: CmdW) {
        self.bus.write32(self.reg(regs::ARG), arg);
        self.bus.write32(self.reg(regs::CMD), cmd.bits());
    }

    /// Index of the command the last response belongs to
    pub fn response_command(&self) -> u8 {
        (self.bus.read32(self.reg(regs::RESPCMD)) & 0x3F) as u8
    }

    /// The four response words, `RESP1` first
    pub fn response(&self) -> [u32; 4] {
        [
            self.bus.read32(self.reg(regs::RESP1)),
            self.bus.read32(self.reg(regs::RESP2)),
            self.bus.read32(self.reg(regs::RESP3)),
            self.bus.read32(self.reg(regs::RESP4)),
        ]
    }

    /// Data timeout in card bus clock periods
    pub fn set_data_timer(&self, cycles: u32) {
        self.bus.write32(self.reg(regs::DTIMER), cycles);
    }

    pub fn set_data_length(&self, bytes: u32) {
        self.bus.write32(self.reg(regs::DLEN), bytes & 0x01FF_FFFF);
    }

    pub fn set_data_control(&self, dctrl: u32) {
        self.bus.write32(self.reg(regs::DCTRL), dctrl);
    }

    /// Bytes still to be transferred
    pub fn data_count(&self) -> u32 {
        self.bus.read32(self.reg(regs::DCOUNT))
    }

    pub fn status(&self) -> StaR {
        StaR::read_from(&self.bus, self.base)
    }

    pub fn clear<F>(&self, op: F)
    where
        F: for<'w> FnOnce(&'w mut SdioClear) -> &'w mut SdioClear,
    {
        let mut c = SdioClear::new();
        op(&mut c);

        self.bus.write32(self.reg(regs::ICR), c.bits());
    }

    pub fn clear_static_flags(&self) {
        self.bus.write32(self.reg(regs::ICR), STATIC_FLAGS);
    }

    /// Interrupt mask, same bit positions as `STA`
    pub fn set_mask(&self, mask: u32) {
        self.bus.write32(self.reg(regs::MASK), mask);
    }

    /// Words still to be written to or read from the FIFO
    pub fn fifo_count(&self) -> u32 {
        self.bus.read32(self.reg(regs::FIFOCNT)) & 0x00FF_FFFF
    }

    pub fn read_fifo(&self) -> u32 {
        self.bus.read32(self.reg(regs::FIFO))
    }

    pub fn write_fifo(&self, word: u32) {
        self.bus.write32(self.reg(regs::FIFO), word);
    }

    /// Reads up to [`FIFO_WORDS`] words from the FIFO window, returns how many
    pub fn read_fifo_words(&self, buf: &mut [u32]) -> usize {
        let n = buf.len().min(FIFO_WORDS);

        for (i, word) in buf[..n].iter_mut().enumerate() {
            *word = self.bus.read32(self.reg(regs::FIFO + 4 * i));
        }

        n
    }

    /// Writes up to [`FIFO_WORDS`] words into the FIFO window, returns how
    /// many
    pub fn write_fifo_words(&self, words: &[u32]) -> usize {
        let n = words.len().min(FIFO_WORDS);

        for (i, word) in words[..n].iter().enumerate() {
            self.bus.write32(self.reg(regs::FIFO + 4 * i), *word);
        }

        n
    }
}

config_reg_u32! {
    W, CmdW, [
        cmdindex => (u8, u8, [5:0], "Command index"),
        waitresp => (WaitResponse, u8, [7:6], "Wait for response"),
        waitint => (bool, bool, [8:8], "Wait for interrupt request"),
        waitpend => (bool, bool, [9:9], "Wait for end of data transfer"),
        cpsmen => (bool, bool, [10:10], "Command path state machine enable"),
        sdiosuspend => (bool, bool, [11:11], "SD I/O suspend command"),
    ]
}

config_reg_u32! {
    R, StaR, regs::STA, [
        ccrcfail => (bool, bool, [0:0], "Command response CRC check failed"),
        dcrcfail => (bool, bool, [1:1], "Data block CRC check failed"),
        ctimeout => (bool, bool, [2:2], "Command response timeout"),
        dtimeout => (bool, bool, [3:3], "Data timeout"),
        txunderr => (bool, bool, [4:4], "Transmit FIFO underrun"),
        rxoverr => (bool, bool, [5:5], "Receive FIFO overrun"),
        cmdrend => (bool, bool, [6:6], "Command response received, CRC passed"),
        cmdsent => (bool, bool, [7:7], "Command sent, no response required"),
        dataend => (bool, bool, [8:8], "Data counter reached zero"),
        stbiterr => (bool, bool, [9:9], "Start bit missing on a data signal"),
        dbckend => (bool, bool, [10:10], "Data block sent or received, CRC passed"),
        cmdact => (bool, bool, [11:11], "Command transfer in progress"),
        txact => (bool, bool, [12:12], "Data transmit in progress"),
        rxact => (bool, bool, [13:13], "Data receive in progress"),
        txfifohe => (bool, bool, [14:14], "Transmit FIFO half empty"),
        rxfifohf => (bool, bool, [15:15], "Receive FIFO half full"),
        txfifof => (bool, bool, [16:16], "Transmit FIFO full"),
        rxfifof => (bool, bool, [17:17], "Receive FIFO full"),
        txfifoe => (bool, bool, [18:18], "Transmit FIFO empty"),
        rxfifoe => (bool, bool, [19:19], "Receive FIFO empty"),
        txdavl => (bool, bool, [20:20], "Data available in transmit FIFO"),
        rxdavl => (bool, bool, [21:21], "Data available in receive FIFO"),
        sdioit => (bool, bool, [22:22], "SDIO interrupt received"),
        ceataend => (bool, bool, [23:23], "CE-ATA command completion signal received"),
    ]
}

impl StaR {
    /// Any CRC, timeout, FIFO or start bit error
    pub fn has_error(&self) -> bool {
        self.ccrcfail()
            || self.dcrcfail()
            || self.ctimeout()
            || self.dtimeout()
            || self.txunderr()
            || self.rxoverr()
            || self.stbiterr()
    }
}

clear_status_reg_u32! {
    SdioClear, [
        ccrcfailc => (0, "Clear CCRCFAIL"),
        dcrcfailc => (1, "Clear DCRCFAIL"),
        ctimeoutc => (2, "Clear CTIMEOUT"),
        dtimeoutc => (3, "Clear DTIMEOUT"),
        txunderrc => (4, "Clear TXUNDERR"),
        rxoverrc => (5, "Clear RXOVERR"),
        cmdrendc => (6, "Clear CMDREND"),
        cmdsentc => (7, "Clear CMDSENT"),
        dataendc => (8, "Clear DATAEND"),
        stbiterrc => (9, "Clear STBITERR"),
        dbckendc => (10, "Clear DBCKEND"),
        sdioitc => (22, "Clear SDIOIT"),
        ceataendc => (23, "Clear CEATAEND"),
    ]
}
