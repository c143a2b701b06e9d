//! Embedded flash memory interface
//!
//! Programming and erasing need the interface unlocked. [`Flash::unlocked`]
//! hands out an [`UnlockedFlash`] which locks the interface again when it is
//! dropped.
//!
//! Errors are reported in the status register only. Nothing here checks them
//! on its own, use [`Flash::status`] and [`Status::error`] after an operation
//! and [`Flash::clear`] to acknowledge them.

use crate::memory_map::FLASH_MEM_INTERFACE_BASE;
use crate::mmio::Mmio;
use crate::ValueError;
use num_enum::{FromPrimitive, IntoPrimitive};

/// Flash key register unlock sequence
pub const KEY1: u32 = 0x4567_0123;
pub const KEY2: u32 = 0xCDEF_89AB;

/// Option key register unlock sequence
pub const OPT_KEY1: u32 = 0x0819_2A3B;
pub const OPT_KEY2: u32 = 0x4C5D_6E7F;

/// Register offsets
pub mod regs {
    pub const ACR: usize = 0x00;
    pub const KEYR: usize = 0x04;
    pub const OPTKEYR: usize = 0x08;
    pub const CR: usize = 0x0C;
    pub const SR: usize = 0x10;
    pub const CCR: usize = 0x14;
    pub const OPTCR: usize = 0x18;
    pub const OPTSR_CUR: usize = 0x1C;
}

/// `FLASH_ACR` fields
pub mod acr {
    pub const LATENCY_SHIFT: u32 = 0;
    pub const LATENCY_MASK: u32 = 0xF;
    pub const PRFTEN: u32 = 1 << 8;
    pub const ICEN: u32 = 1 << 9;
    pub const DCEN: u32 = 1 << 10;
    pub const ICRST: u32 = 1 << 11;
    pub const DCRST: u32 = 1 << 12;

    /// Latency field value for `ws` wait states
    pub const fn latency(ws: u32) -> u32 {
        (ws & LATENCY_MASK) << LATENCY_SHIFT
    }
}

/// `FLASH_CR` fields
pub mod cr {
    pub const LOCK: u32 = 1 << 0;
    pub const PG: u32 = 1 << 1;
    pub const SER: u32 = 1 << 2;
    pub const BER: u32 = 1 << 3;
    pub const PSIZE_SHIFT: u32 = 4;
    pub const PSIZE_MASK: u32 = 0b11;
    pub const FW: u32 = 1 << 6;
    pub const START: u32 = 1 << 7;
    pub const SNB_SHIFT: u32 = 8;
    /// Wide enough for the remapped sector numbers 16 and up
    pub const SNB_MASK: u32 = 0x1F;
}

/// `FLASH_SR` bits, `FLASH_CCR` uses the same positions
pub mod sr {
    pub const BSY: u32 = 1 << 0;
    pub const WBNE: u32 = 1 << 1;
    pub const QW: u32 = 1 << 2;
    pub const CRC_BUSY: u32 = 1 << 3;
    pub const EOP: u32 = 1 << 16;
    pub const WRPERR: u32 = 1 << 17;
    pub const PGSERR: u32 = 1 << 18;
    pub const STRBERR: u32 = 1 << 19;
    pub const INCERR: u32 = 1 << 21;
    pub const OPERR: u32 = 1 << 22;
    pub const RDPERR: u32 = 1 << 23;
    pub const RDSERR: u32 = 1 << 24;
    pub const SNECCERR: u32 = 1 << 25;
    pub const DBECCERR: u32 = 1 << 26;
    pub const CRCEND: u32 = 1 << 27;
    pub const CRCRDERR: u32 = 1 << 28;
}

/// `FLASH_OPTCR` bits
pub mod optcr {
    pub const OPTLOCK: u32 = 1 << 0;
    pub const OPTSTRT: u32 = 1 << 1;
}

/// Logical sectors from 12 on are numbered 16 and up by the hardware
const SECTOR_GAP_START: u8 = 12;
const SECTOR_GAP: u8 = 4;
/// Logical sectors per bank
pub const SECTOR_COUNT: u8 = 24;

/// Error flags of the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Write to a write protected sector (WRPERR)
    WriteProtection,
    /// Programming sequence error (PGSERR)
    ProgrammingSequence,
    /// Strobe error (STRBERR)
    Strobe,
    /// Inconsistency error (INCERR)
    Inconsistency,
    /// Write/erase operation error (OPERR)
    Operation,
    /// Read protection error (RDPERR)
    ReadProtection,
    /// Read secure error (RDSERR)
    ReadSecure,
    /// ECC single correction (SNECCERR)
    EccSingleCorrection,
    /// ECC double detection (DBECCERR)
    EccDoubleDetection,
    /// CRC read error (CRCRDERR)
    CrcRead,
}

/// Operand width of program and erase operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProgramSize {
    X8 = 0b00,
    X16 = 0b01,
    #[default]
    X32 = 0b10,
    X64 = 0b11,
}

pub struct Flash<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Flash<B> {
    pub fn new(bus: B) -> Self {
        Self::with_base(bus, FLASH_MEM_INTERFACE_BASE)
    }

    pub fn with_base(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// Sets the number of read wait states, leaving the rest of `ACR` alone
    pub fn set_ws(&self, ws: u32) {
        self.bus.modify32(self.reg(regs::ACR), |mut r| {
            set_u32!(r, ws, acr::LATENCY_MASK, acr::LATENCY_SHIFT);
            r
        });
    }

    /// Applies a clock scale's `flash_config`: caches on or off as its
    /// `DCEN`/`ICEN` bits say, then its latency
    pub fn apply_access_config(&self, flash_config: u32) {
        if flash_config & acr::DCEN != 0 {
            self.dcache_enable();
        } else {
            self.dcache_disable();
        }

        if flash_config & acr::ICEN != 0 {
            self.icache_enable();
        } else {
            self.icache_disable();
        }

        self.set_ws(flash_config);
    }

    pub fn dcache_enable(&self) {
        self.bus.set_bits32(self.reg(regs::ACR), acr::DCEN);
    }

    pub fn dcache_disable(&self) {
        self.bus.clear_bits32(self.reg(regs::ACR), acr::DCEN);
    }

    pub fn icache_enable(&self) {
        self.bus.set_bits32(self.reg(regs::ACR), acr::ICEN);
    }

    pub fn icache_disable(&self) {
        self.bus.clear_bits32(self.reg(regs::ACR), acr::ICEN);
    }

    pub fn prefetch_enable(&self) {
        self.bus.set_bits32(self.reg(regs::ACR), acr::PRFTEN);
    }

    pub fn prefetch_disable(&self) {
        self.bus.clear_bits32(self.reg(regs::ACR), acr::PRFTEN);
    }

    /// Flushes the data cache. It must be disabled.
    pub fn dcache_reset(&self) {
        self.bus.set_bits32(self.reg(regs::ACR), acr::DCRST);
        self.bus.clear_bits32(self.reg(regs::ACR), acr::DCRST);
    }

    /// Flushes the instruction cache. It must be disabled.
    pub fn icache_reset(&self) {
        self.bus.set_bits32(self.reg(regs::ACR), acr::ICRST);
        self.bus.clear_bits32(self.reg(regs::ACR), acr::ICRST);
    }

    pub fn acr_read(&self) -> AcrR {
        AcrR::read_from(&self.bus, self.base)
    }

    /// Blocks until no operation is in progress or queued
    pub fn wait_for_last_operation(&self) {
        self.bus.barrier();
        self.bus
            .poll(|| self.bus.read32(self.reg(regs::SR)) & (sr::BSY | sr::QW) == 0);
    }

    pub fn status(&self) -> Status {
        Status::read_from(&self.bus, self.base)
    }

    /// Clears the status flags selected by `op`
    ///
    /// ```ignore
    /// flash.clear(|c| c.wrperr().pgserr());
    /// ```
    pub fn clear<F>(&self, op: F)
    where
        F: for<'w> FnOnce(&'w mut FlashClear) -> &'w mut FlashClear,
    {
        let mut c = FlashClear::new();
        op(&mut c);

        self.bus.write32(self.reg(regs::CCR), c.bits());
    }

    /// Clears every error flag as well as EOP and CRCEND
    pub fn clear_status_flags(&self) {
        self.clear(|c| {
            c.wrperr()
                .pgserr()
                .strberr()
                .incerr()
                .operr()
                .rdperr()
                .rdserr()
                .sneccerr()
                .dbeccerr()
                .crcend()
                .crcrderr()
                .eop()
        });
    }

    pub fn is_locked(&self) -> bool {
        self.bus.is_set32(self.reg(regs::CR), cr::LOCK)
    }

    pub fn unlocked(&mut self) -> UnlockedFlash<'_, B> {
        self.unlock();

        UnlockedFlash { flash: self }
    }

    /// A second key sequence while unlocked would be treated as a bad key, so
    /// the keys are only written when the interface is locked
    fn unlock(&self) {
        if !self.is_locked() {
            return;
        }

        self.bus.write32(self.reg(regs::KEYR), KEY1);
        self.bus.write32(self.reg(regs::KEYR), KEY2);
    }

    fn lock(&self) {
        self.bus.set_bits32(self.reg(regs::CR), cr::LOCK);
    }

    pub fn is_option_bytes_locked(&self) -> bool {
        self.bus.is_set32(self.reg(regs::OPTCR), optcr::OPTLOCK)
    }

    pub fn unlock_option_bytes(&self) {
        self.bus.write32(self.reg(regs::OPTKEYR), OPT_KEY1);
        self.bus.write32(self.reg(regs::OPTKEYR), OPT_KEY2);
    }

    pub fn lock_option_bytes(&self) {
        self.bus.set_bits32(self.reg(regs::OPTCR), optcr::OPTLOCK);
    }

    /// Writes `data` to the option control register and starts the option
    /// byte programming. Only the option key sequence is needed, it is written
    /// if the option registers are locked. The lowest two bits (lock and
    /// start) of `data` are ignored.
    pub fn program_option_bytes(&self, data: u32) {
        let optcr_addr = self.reg(regs::OPTCR);

        self.wait_for_last_operation();

        if self.is_option_bytes_locked() {
            self.unlock_option_bytes();
        }

        self.bus.write32(optcr_addr, data & !0x3);
        self.bus.set_bits32(optcr_addr, optcr::OPTSTRT);

        self.wait_for_last_operation();
    }

    /// Currently active option byte values
    pub fn option_status(&self) -> u32 {
        self.bus.read32(self.reg(regs::OPTSR_CUR))
    }

    fn set_program_size(&self, size: ProgramSize) {
        let x = u8::from(size) as u32;

        self.bus.modify32(self.reg(regs::CR), |mut r| {
            set_u32!(r, x, cr::PSIZE_MASK, cr::PSIZE_SHIFT);
            r
        });
    }
}

/// Flash interface with the key sequence written, locked again on drop
pub struct UnlockedFlash<'a, B: Mmio> {
    flash: &'a mut Flash<B>,
}

impl<B: Mmio> Drop for UnlockedFlash<'_, B> {
    fn drop(&mut self) {
        self.flash.lock();
    }
}

impl<B: Mmio> UnlockedFlash<'_, B> {
    pub fn program_double_word(&mut self, address: usize, data: u64) {
        self.program_with(ProgramSize::X64, || self.flash.bus.write64(address, data));
    }

    pub fn program_word(&mut self, address: usize, data: u32) {
        self.program_with(ProgramSize::X32, || self.flash.bus.write32(address, data));
    }

    pub fn program_half_word(&mut self, address: usize, data: u16) {
        self.program_with(ProgramSize::X16, || self.flash.bus.write16(address, data));
    }

    pub fn program_byte(&mut self, address: usize, data: u8) {
        self.program_with(ProgramSize::X8, || self.flash.bus.write8(address, data));
    }

    /// Programs `data` byte by byte from `address` on
    pub fn program(&mut self, address: usize, data: &[u8]) {
        #[cfg(feature = "defmt")]
        defmt::debug!("flash program {=usize:#x} ({} bytes)", address, data.len());

        for (i, byte) in data.iter().enumerate() {
            self.program_byte(address + i, *byte);
        }
    }

    fn program_with<F: FnOnce()>(&self, size: ProgramSize, write: F) {
        let flash = &self.flash;
        let cr_addr = flash.reg(regs::CR);

        flash.wait_for_last_operation();
        flash.set_program_size(size);

        flash.bus.set_bits32(cr_addr, cr::PG);
        write();
        flash.wait_for_last_operation();
        flash.bus.clear_bits32(cr_addr, cr::PG);
    }

    /// Erases one sector
    ///
    /// `sector` is the logical sector number. `size` is the parallelism the
    /// supply voltage allows.
    ///
    /// Fails without touching the interface if `sector` doesn't exist.
    ///
    /// # Safety
    ///
    /// Nothing stops this from erasing the running program
    pub unsafe fn erase_sector(
        &mut self,
        sector: u8,
        size: ProgramSize,
    ) -> Result<(), ValueError> {
        let snb = sector_number(sector)? as u32;

        #[cfg(feature = "defmt")]
        defmt::debug!("flash erase sector {}", sector);

        let flash = &self.flash;
        let cr_addr = flash.reg(regs::CR);

        flash.wait_for_last_operation();
        flash.set_program_size(size);

        flash.bus.modify32(cr_addr, |mut r| {
            set_u32!(r, snb, cr::SNB_MASK, cr::SNB_SHIFT);
            r
        });
        flash.bus.set_bits32(cr_addr, cr::SER);
        flash.bus.set_bits32(cr_addr, cr::START);

        flash.wait_for_last_operation();

        flash.bus.clear_bits32(cr_addr, cr::SER);
        flash.bus.clear_bits32(cr_addr, cr::SNB_MASK << cr::SNB_SHIFT);

        Ok(())
    }

    /// Erases the whole bank
    ///
    /// # Safety
    ///
    /// This includes the running program, unless it executes from RAM
    pub unsafe fn erase_all_sectors(&mut self, size: ProgramSize) {
        #[cfg(feature = "defmt")]
        defmt::debug!("flash mass erase");

        let flash = &self.flash;
        let cr_addr = flash.reg(regs::CR);

        flash.wait_for_last_operation();
        flash.set_program_size(size);

        flash.bus.set_bits32(cr_addr, cr::BER);
        flash.bus.set_bits32(cr_addr, cr::START);

        flash.wait_for_last_operation();

        flash.bus.clear_bits32(cr_addr, cr::BER);
    }

    /// Locks the interface, same as dropping
    pub fn lock(self) {}
}

/// `SNB` value for logical sector `sector`
pub fn sector_number(sector: u8) -> Result<u8, ValueError> {
    if sector >= SECTOR_COUNT {
        value_error!("Flash sector must be in range of [0, 23]")
    } else if sector >= SECTOR_GAP_START {
        Ok(sector + SECTOR_GAP)
    } else {
        Ok(sector)
    }
}

config_reg_u32! {
    R, AcrR, regs::ACR, [
        latency => (u8, u8, [3:0], "Read latency in wait states"),
        prften => (bool, bool, [8:8], "Prefetch enable"),
        icen => (bool, bool, [9:9], "Instruction cache enable"),
        dcen => (bool, bool, [10:10], "Data cache enable"),
    ]
}

config_reg_u32! {
    R, Status, regs::SR, [
        bsy => (bool, bool, [0:0], "Busy"),
        wbne => (bool, bool, [1:1], "Write buffer not empty"),
        qw => (bool, bool, [2:2], "Wait queue flag"),
        crc_busy => (bool, bool, [3:3], "CRC busy"),
        eop => (bool, bool, [16:16], "End of program"),
        wrperr => (bool, bool, [17:17], "Write protection error"),
        pgserr => (bool, bool, [18:18], "Programming sequence error"),
        strberr => (bool, bool, [19:19], "Strobe error"),
        incerr => (bool, bool, [21:21], "Inconsistency error"),
        operr => (bool, bool, [22:22], "Write/erase error"),
        rdperr => (bool, bool, [23:23], "Read protection error"),
        rdserr => (bool, bool, [24:24], "Secure error"),
        sneccerr => (bool, bool, [25:25], "ECC single correction error"),
        dbeccerr => (bool, bool, [26:26], "ECC double detection error"),
        crcend => (bool, bool, [27:27], "CRC end of calculation"),
        crcrderr => (bool, bool, [28:28], "CRC read error"),
    ]
}

impl Status {
    /// An operation is running or queued
    pub fn is_busy(&self) -> bool {
        self.bsy() || self.qw()
    }

    /// First error flag set, in register order
    pub fn error(&self) -> Option<Error> {
        let errors = [
            (self.wrperr(), Error::WriteProtection),
            (self.pgserr(), Error::ProgrammingSequence),
            (self.strberr(), Error::Strobe),
            (self.incerr(), Error::Inconsistency),
            (self.operr(), Error::Operation),
            (self.rdperr(), Error::ReadProtection),
            (self.rdserr(), Error::ReadSecure),
            (self.sneccerr(), Error::EccSingleCorrection),
            (self.dbeccerr(), Error::EccDoubleDetection),
            (self.crcrderr(), Error::CrcRead),
        ];

        errors.into_iter().find(|(set, _)| *set).map(|(_, e)| e)
    }
}

clear_status_reg_u32! {
    FlashClear, [
        eop => (16, "Clear end of program"),
        wrperr => (17, "Clear write protection error"),
        pgserr => (18, "Clear programming sequence error"),
        strberr => (19, "Clear strobe error"),
        incerr => (21, "Clear inconsistency error"),
        operr => (22, "Clear write/erase error"),
        rdperr => (23, "Clear read protection error"),
        rdserr => (24, "Clear secure error"),
        sneccerr => (25, "Clear ECC single correction error"),
        dbeccerr => (26, "Clear ECC double detection error"),
        crcend => (27, "Clear CRC end of calculation"),
        crcrderr => (28, "Clear CRC read error"),
    ]
}
