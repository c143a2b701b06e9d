//! Flexible memory controller
//!
//! Covers the NOR/PSRAM/SRAM banks 1 to 4 and the SDRAM controller. The
//! controller clock has to be enabled first (`rcc::rec::FMC`).

use crate::memory_map::FMC_BASE;
use crate::mmio::Mmio;
use crate::ValueError;
use embedded_hal::delay::DelayNs;
use num_enum::IntoPrimitive;

/// Register offsets
pub mod regs {
    /// Chip-select control of NOR/SRAM bank `n` (0 based)
    pub const fn bcr(n: usize) -> usize {
        8 * n
    }

    /// Chip-select timing of NOR/SRAM bank `n` (0 based)
    pub const fn btr(n: usize) -> usize {
        0x004 + 8 * n
    }

    /// Write timing of NOR/SRAM bank `n` (0 based), used in extended mode
    pub const fn bwtr(n: usize) -> usize {
        0x104 + 8 * n
    }

    pub const SDCR1: usize = 0x140;
    pub const SDCR2: usize = 0x144;
    pub const SDTR1: usize = 0x148;
    pub const SDTR2: usize = 0x14C;
    pub const SDCMR: usize = 0x150;
    pub const SDRTR: usize = 0x154;
    pub const SDSR: usize = 0x158;
}

/// `FMC_BCRx` bits
pub mod bcr {
    pub const MBKEN: u32 = 1 << 0;
    pub const MUXEN: u32 = 1 << 1;
    pub const MTYP_SHIFT: u32 = 2;
    pub const MTYP_MASK: u32 = 0b11;
    pub const MWID_SHIFT: u32 = 4;
    pub const MWID_MASK: u32 = 0b11;
    pub const FACCEN: u32 = 1 << 6;
    pub const BURSTEN: u32 = 1 << 8;
    pub const WAITPOL: u32 = 1 << 9;
    pub const WRAPMOD: u32 = 1 << 10;
    pub const WAITCFG: u32 = 1 << 11;
    pub const WREN: u32 = 1 << 12;
    pub const WAITEN: u32 = 1 << 13;
    pub const EXTMOD: u32 = 1 << 14;
    pub const ASYNCWAIT: u32 = 1 << 15;
    pub const CBURSTRW: u32 = 1 << 19;
}

/// `FMC_SDCMR` fields
pub mod sdcmr {
    pub const MODE_MASK: u32 = 0b111;
    pub const CTB2: u32 = 1 << 3;
    pub const CTB1: u32 = 1 << 4;
    pub const NRFS_SHIFT: u32 = 5;
    pub const NRFS_MASK: u32 = 0xF;
    pub const MRD_SHIFT: u32 = 9;
    pub const MRD_MASK: u32 = 0x1FFF;
}

/// `FMC_SDRTR` fields
pub mod sdrtr {
    pub const CRE: u32 = 1 << 0;
    pub const COUNT_SHIFT: u32 = 1;
    pub const COUNT_MASK: u32 = 0x1FFF;
    pub const REIE: u32 = 1 << 14;
}

/// `FMC_SDSR` bits
pub mod sdsr {
    pub const RE: u32 = 1 << 0;
    pub const BUSY: u32 = 1 << 5;
}

/// `BWTR` value with extended mode off
pub const BWTR_RESET: u32 = 0x0FFF_FFFF;

/// SDCR1 fields that also apply to SDRAM bank 2: SDCLK, RBURST and RPIPE
const SDCR_SHARED: u32 = 0x7C00;

/// SDTR1 fields that also apply to SDRAM bank 2: TRC and TRP
const SDTR_SHARED: u32 = 0x00F0_F000;

/// NRFS value sent during [`Fmc::sdram_init`]
const INIT_AUTO_REFRESH: u8 = 4;

/// Power-up delay between clock enable and the first precharge
const INIT_CLOCK_DELAY_US: u32 = 100;

/// NOR/PSRAM/SRAM chip-select bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SramBank {
    Bank1,
    Bank2,
    Bank3,
    Bank4,
}

impl SramBank {
    const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for SramBank {
    type Error = ValueError;

    /// Banks are numbered 1 to 4
    fn try_from(bank: u8) -> Result<Self, Self::Error> {
        match bank {
            1 => Ok(Self::Bank1),
            2 => Ok(Self::Bank2),
            3 => Ok(Self::Bank3),
            4 => Ok(Self::Bank4),
            _ => value_error!("FMC bank must be in range of [1, 4]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MemoryType {
    Sram = 0b00,
    Psram = 0b01,
    Nor = 0b10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BusWidth {
    Bits8 = 0b00,
    Bits16 = 0b01,
    Bits32 = 0b10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitPolarity {
    ActiveLow,
    ActiveHigh,
}

/// When NWAIT is asserted relative to the wait state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitTiming {
    BeforeWaitState,
    DuringWaitState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccessMode {
    A = 0b00,
    B = 0b01,
    C = 0b10,
    D = 0b11,
}

/// Chip-select timings in HCLK cycles, register encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NorSramTiming {
    pub address_setup: u8,
    pub address_hold: u8,
    pub data_setup: u8,
    /// Ignored for the write timings
    pub bus_turnaround: u8,
    pub clock_division: u8,
    pub data_latency: u8,
    pub access_mode: AccessMode,
}

/// SDRAM timings in SDCLK cycles
///
/// The register stores each value minus one. Every field must be in
/// `1..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdramTiming {
    /// Row to column delay
    pub trcd: u8,
    /// Row precharge delay
    pub trp: u8,
    /// Recovery delay
    pub twr: u8,
    /// Row cycle delay
    pub trc: u8,
    /// Self refresh time
    pub tras: u8,
    /// Exit self-refresh delay
    pub txsr: u8,
    /// Load mode register to active
    pub tmrd: u8,
}

impl SdramTiming {
    /// `FMC_SDTRx` value
    pub const fn bits(&self) -> u32 {
        const fn field(cycles: u8, shift: u32) -> u32 {
            ((cycles.wrapping_sub(1) as u32) & 0xF) << shift
        }

        field(self.trcd, 24)
            | field(self.trp, 20)
            | field(self.twr, 16)
            | field(self.trc, 12)
            | field(self.tras, 8)
            | field(self.txsr, 4)
            | field(self.tmrd, 0)
    }
}

/// Command target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdramBank {
    Bank1,
    Bank2,
    Both,
}

impl SdramBank {
    const fn ctb(self) -> u32 {
        match self {
            Self::Bank1 => sdcmr::CTB1,
            Self::Bank2 => sdcmr::CTB2,
            Self::Both => sdcmr::CTB1 | sdcmr::CTB2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SdramCommand {
    Normal = 0b000,
    ClockConfigEnable = 0b001,
    PrechargeAll = 0b010,
    AutoRefresh = 0b011,
    LoadModeRegister = 0b100,
    SelfRefresh = 0b101,
    PowerDown = 0b110,
}

pub struct Fmc<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Fmc<B> {
    pub fn new(bus: B) -> Self {
        Self::with_base(bus, FMC_BASE)
    }

    pub fn with_base(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }

    fn bcr_bit(&self, bank: SramBank, bit: u32, set: bool) {
        let addr = self.reg(regs::bcr(bank.index()));

        if set {
            self.bus.set_bits32(addr, bit);
        } else {
            self.bus.clear_bits32(addr, bit);
        }
    }

    pub fn enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::MBKEN, enable);
    }

    pub fn data_address_mux_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::MUXEN, enable);
    }

    pub fn asynchronous_wait_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::ASYNCWAIT, enable);
    }

    pub fn set_wait_signal_polarity(&self, bank: SramBank, polarity: WaitPolarity) {
        self.bcr_bit(bank, bcr::WAITPOL, polarity == WaitPolarity::ActiveHigh);
    }

    pub fn wait_signal_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::WAITEN, enable);
    }

    pub fn set_wait_signal_timing(&self, bank: SramBank, timing: WaitTiming) {
        self.bcr_bit(bank, bcr::WAITCFG, timing == WaitTiming::DuringWaitState);
    }

    pub fn set_data_bus_width(&self, bank: SramBank, width: BusWidth) {
        let x = u8::from(width) as u32;

        self.bus.modify32(self.reg(regs::bcr(bank.index())), |mut r| {
            set_u32!(r, x, bcr::MWID_MASK, bcr::MWID_SHIFT);
            r
        });
    }

    pub fn wrap_mode_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::WRAPMOD, enable);
    }

    pub fn burst_access_mode_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::BURSTEN, enable);
    }

    pub fn write_operation_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::WREN, enable);
    }

    pub fn write_burst_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::CBURSTRW, enable);
    }

    /// Separate read and write timings. Disabling also resets the write
    /// timings to their reset value.
    pub fn extended_mode_enable(&self, bank: SramBank, enable: bool) {
        self.bcr_bit(bank, bcr::EXTMOD, enable);

        if !enable {
            self.bus
                .write32(self.reg(regs::bwtr(bank.index())), BWTR_RESET);
        }
    }

    /// NOR flash also gets flash access enabled, the others get it disabled
    pub fn set_memory_type(&self, bank: SramBank, mem: MemoryType) {
        let x = u8::from(mem) as u32;

        self.bus.modify32(self.reg(regs::bcr(bank.index())), |mut r| {
            set_u32!(r, x, bcr::MTYP_MASK, bcr::MTYP_SHIFT);
            r
        });

        self.bcr_bit(bank, bcr::FACCEN, mem == MemoryType::Nor);
    }

    /// Read/write timings, or read timings only in extended mode
    pub fn rw_timing_config(&self, bank: SramBank, timing: &NorSramTiming) {
        let mut w = BtrW::reset();
        w.addset(timing.address_setup)
            .addhld(timing.address_hold)
            .datast(timing.data_setup)
            .busturn(timing.bus_turnaround)
            .clkdiv(timing.clock_division)
            .datlat(timing.data_latency)
            .accmod(timing.access_mode);

        self.bus.write32(self.reg(regs::btr(bank.index())), w.bits());
    }

    /// Write timings, only used in extended mode. The bus turnaround field is
    /// left as it is.
    pub fn write_timing_config(&self, bank: SramBank, timing: &NorSramTiming) {
        let addr = self.reg(regs::bwtr(bank.index()));

        let mut w = BtrW::from_bits(self.bus.read32(addr));
        w.addset(timing.address_setup)
            .addhld(timing.address_hold)
            .datast(timing.data_setup)
            .clkdiv(timing.clock_division)
            .datlat(timing.data_latency)
            .accmod(timing.access_mode);

        self.bus.write32(addr, w.bits());
    }

    pub fn bcr_read(&self, bank: SramBank) -> u32 {
        self.bus.read32(self.reg(regs::bcr(bank.index())))
    }

    pub fn is_sdram_busy(&self) -> bool {
        self.bus.is_set32(self.reg(regs::SDSR), sdsr::BUSY)
    }

    /// Sends a command once the controller is free
    ///
    /// `auto_refresh` is the raw NRFS field: consecutive auto-refresh cycles
    /// minus one. `mode_register` is only used by
    /// [`SdramCommand::LoadModeRegister`].
    pub fn sdram_command(
        &self,
        bank: SdramBank,
        cmd: SdramCommand,
        auto_refresh: u8,
        mode_register: u16,
    ) {
        let val = bank.ctb()
            | ((auto_refresh as u32 & sdcmr::NRFS_MASK) << sdcmr::NRFS_SHIFT)
            | ((mode_register as u32 & sdcmr::MRD_MASK) << sdcmr::MRD_SHIFT)
            | (u8::from(cmd) as u32 & sdcmr::MODE_MASK);

        #[cfg(feature = "defmt")]
        defmt::trace!("sdram command {} -> {}", cmd, bank);

        self.bus.poll(|| !self.is_sdram_busy());
        self.bus.write32(self.reg(regs::SDCMR), val);
    }

    /// Programs the control and timing registers of `bank`
    ///
    /// Bank 2 takes its clock, burst and pipe settings as well as TRC and TRP
    /// from the bank 1 registers, so those fields are written there too.
    pub fn sdram_config(&self, bank: SdramBank, control: SdcrW, timing: &SdramTiming) {
        let sdtr = timing.bits();

        if bank != SdramBank::Bank2 {
            self.bus.write32(self.reg(regs::SDCR1), control.bits());
            self.bus.write32(self.reg(regs::SDTR1), sdtr);
        }

        if bank != SdramBank::Bank1 {
            if bank == SdramBank::Bank2 {
                self.bus.modify32(self.reg(regs::SDCR1), |r| {
                    (r & !SDCR_SHARED) | (control.bits() & SDCR_SHARED)
                });
                self.bus.modify32(self.reg(regs::SDTR1), |r| {
                    (r & !SDTR_SHARED) | (sdtr & SDTR_SHARED)
                });
            }

            self.bus.write32(self.reg(regs::SDCR2), control.bits());
            self.bus.write32(self.reg(regs::SDTR2), sdtr);
        }
    }

    /// Sets the refresh timer count, in SDCLK cycles
    pub fn set_refresh_count(&self, count: u16) {
        let x = count as u32;

        self.bus.modify32(self.reg(regs::SDRTR), |mut r| {
            set_u32!(r, x, sdrtr::COUNT_MASK, sdrtr::COUNT_SHIFT);
            r
        });
    }

    /// Full power-up sequence of an SDRAM device
    ///
    /// Configures the bank, enables the clock, waits 100 µs, precharges all
    /// rows, runs the auto-refresh cycles, loads `mode_register` and starts
    /// the refresh timer with `refresh_count`.
    pub fn sdram_init<D: DelayNs>(
        &self,
        bank: SdramBank,
        control: SdcrW,
        timing: &SdramTiming,
        mode_register: u16,
        refresh_count: u16,
        delay: &mut D,
    ) {
        #[cfg(feature = "defmt")]
        defmt::debug!("sdram init {}", bank);

        self.sdram_config(bank, control, timing);

        self.sdram_command(bank, SdramCommand::ClockConfigEnable, 0, 0);
        delay.delay_us(INIT_CLOCK_DELAY_US);

        self.sdram_command(bank, SdramCommand::PrechargeAll, 0, 0);
        self.sdram_command(bank, SdramCommand::AutoRefresh, INIT_AUTO_REFRESH, 0);
        self.sdram_command(bank, SdramCommand::LoadModeRegister, 0, mode_register);

        self.set_refresh_count(refresh_count);
    }
}

config_reg_u32! {
    W, BtrW, [
        addset => (u8, u8, [3:0], "Address setup phase duration"),
        addhld => (u8, u8, [7:4], "Address hold phase duration"),
        datast => (u8, u8, [15:8], "Data phase duration"),
        busturn => (u8, u8, [19:16], "Bus turnaround phase duration"),
        clkdiv => (u8, u8, [23:20], "Clock divide ratio"),
        datlat => (u8, u8, [27:24], "Data latency"),
        accmod => (AccessMode, u8, [29:28], "Access mode"),
    ]
}

config_reg_u32! {
    W, SdcrW, [
        nc => (u8, u8, [1:0], "Column address bits minus 8"),
        nr => (u8, u8, [3:2], "Row address bits minus 11"),
        mwid => (u8, u8, [5:4], "Memory data bus width: 8, 16 or 32 bits"),
        nb => (bool, bool, [6:6], "Four internal banks"),
        cas => (u8, u8, [8:7], "CAS latency in SDCLK cycles"),
        wp => (bool, bool, [9:9], "Write protection"),
        sdclk => (u8, u8, [11:10], "SDCLK period in HCLK cycles, 0 disables"),
        rburst => (bool, bool, [12:12], "Burst read"),
        rpipe => (u8, u8, [14:13], "Read pipe delay in HCLK cycles"),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimBus;

    const SDCMR: usize = FMC_BASE + regs::SDCMR;

    struct RecordingDelay {
        us: heapless::Vec<u32, 8>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            let _ = self.us.push(ns / 1_000);
        }

        fn delay_us(&mut self, us: u32) {
            let _ = self.us.push(us);
        }
    }

    fn timing() -> SdramTiming {
        SdramTiming {
            trcd: 2,
            trp: 2,
            twr: 2,
            trc: 7,
            tras: 4,
            txsr: 7,
            tmrd: 2,
        }
    }

    #[test]
    /// Every field is stored minus one
    fn sdram_timing_encoding() {
        assert_eq!(timing().bits(), 0x0111_6361);

        let ones = SdramTiming {
            trcd: 1,
            trp: 1,
            twr: 1,
            trc: 1,
            tras: 1,
            txsr: 1,
            tmrd: 1,
        };
        assert_eq!(ones.bits(), 0);

        let max = SdramTiming {
            trcd: 16,
            trp: 16,
            twr: 16,
            trc: 16,
            tras: 16,
            txsr: 16,
            tmrd: 16,
        };
        assert_eq!(max.bits(), 0x0FFF_FFFF);
    }

    #[test]
    fn command_encoding() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);

        fmc.sdram_command(SdramBank::Bank2, SdramCommand::AutoRefresh, 4, 0);
        fmc.sdram_command(SdramBank::Both, SdramCommand::LoadModeRegister, 0, 0x231);
        fmc.sdram_command(SdramBank::Bank1, SdramCommand::Normal, 0, 0);

        let writes = sim.writes_to(SDCMR);
        assert_eq!(writes[0].value, (1 << 3) | (4 << 5) | 0b011);
        assert_eq!(writes[1].value, (1 << 4) | (1 << 3) | (0x231 << 9) | 0b100);
        assert_eq!(writes[2].value, 1 << 4);
    }

    #[test]
    #[should_panic(expected = "never asserted")]
    fn command_waits_while_busy() {
        let sim = SimBus::new();
        sim.preload32(FMC_BASE + regs::SDSR, sdsr::BUSY);
        let fmc = Fmc::new(&sim);

        fmc.sdram_command(SdramBank::Bank1, SdramCommand::PrechargeAll, 0, 0);
    }

    #[test]
    /// Clock enable, 100 µs, precharge, auto-refresh, mode register, refresh
    /// timer
    fn sdram_init_sequence() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);
        let mut delay = RecordingDelay {
            us: heapless::Vec::new(),
        };

        let mut control = SdcrW::reset();
        control.nc(0).nr(1).mwid(1).nb(true).cas(3).sdclk(2).rburst(true);

        fmc.sdram_init(SdramBank::Bank1, control, &timing(), 0x0231, 1386, &mut delay);

        assert_eq!(sim.peek32(FMC_BASE + regs::SDCR1), control.bits());
        assert_eq!(sim.peek32(FMC_BASE + regs::SDTR1), timing().bits());
        assert_eq!(delay.us.as_slice(), &[100]);

        let modes: heapless::Vec<u32, 8> = sim
            .writes_to(SDCMR)
            .iter()
            .map(|a| a.value as u32 & sdcmr::MODE_MASK)
            .collect();
        assert_eq!(modes.as_slice(), &[1, 2, 3, 4]);

        let load = sim.writes_to(SDCMR)[3].value as u32;
        assert_eq!((load >> sdcmr::MRD_SHIFT) & sdcmr::MRD_MASK, 0x231);

        assert_eq!(sim.peek32(FMC_BASE + regs::SDRTR), 1386 << 1);
    }

    #[test]
    /// Bank 2 shares clock and row timings with bank 1
    fn sdram_bank2_shared_fields() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);
        sim.preload32(FMC_BASE + regs::SDCR1, 0b01_0110);

        let mut control = SdcrW::reset();
        control.nr(2).sdclk(3).rpipe(1);

        fmc.sdram_config(SdramBank::Bank2, control, &timing());

        assert_eq!(sim.peek32(FMC_BASE + regs::SDCR2), control.bits());
        assert_eq!(
            sim.peek32(FMC_BASE + regs::SDCR1),
            0b01_0110 | (3 << 10) | (1 << 13)
        );
        assert_eq!(
            sim.peek32(FMC_BASE + regs::SDTR1),
            timing().bits() & 0x00F0_F000
        );
        assert_eq!(sim.peek32(FMC_BASE + regs::SDTR2), timing().bits());
    }

    #[test]
    fn bank_numbers() {
        assert_eq!(SramBank::try_from(1u8), Ok(SramBank::Bank1));
        assert_eq!(SramBank::try_from(4u8), Ok(SramBank::Bank4));
        assert_eq!(
            SramBank::try_from(0u8),
            Err(ValueError("FMC bank must be in range of [1, 4]"))
        );
        assert!(SramBank::try_from(5u8).is_err());
    }

    #[test]
    fn bank_control_bits() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);
        let bcr3 = FMC_BASE + 0x10;

        fmc.enable(SramBank::Bank3, true);
        fmc.data_address_mux_enable(SramBank::Bank3, true);
        fmc.write_operation_enable(SramBank::Bank3, true);
        fmc.set_data_bus_width(SramBank::Bank3, BusWidth::Bits16);
        fmc.set_wait_signal_polarity(SramBank::Bank3, WaitPolarity::ActiveHigh);
        fmc.set_wait_signal_timing(SramBank::Bank3, WaitTiming::DuringWaitState);
        assert_eq!(
            sim.peek32(bcr3),
            bcr::MBKEN | bcr::MUXEN | bcr::WREN | (1 << 4) | bcr::WAITPOL | bcr::WAITCFG
        );

        fmc.data_address_mux_enable(SramBank::Bank3, false);
        fmc.set_wait_signal_polarity(SramBank::Bank3, WaitPolarity::ActiveLow);
        assert_eq!(fmc.bcr_read(SramBank::Bank3) & (bcr::MUXEN | bcr::WAITPOL), 0);

        // Other banks untouched
        assert_eq!(fmc.bcr_read(SramBank::Bank1), 0);
        assert_eq!(fmc.bcr_read(SramBank::Bank4), 0);
    }

    #[test]
    /// NOR sets FACCEN, anything else clears it
    fn memory_type() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);

        fmc.set_memory_type(SramBank::Bank1, MemoryType::Nor);
        assert_eq!(fmc.bcr_read(SramBank::Bank1), (0b10 << 2) | bcr::FACCEN);

        fmc.set_memory_type(SramBank::Bank1, MemoryType::Psram);
        assert_eq!(fmc.bcr_read(SramBank::Bank1), 0b01 << 2);
    }

    #[test]
    fn extended_mode() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);
        let bwtr2 = FMC_BASE + 0x10C;

        fmc.extended_mode_enable(SramBank::Bank2, true);
        assert_ne!(fmc.bcr_read(SramBank::Bank2) & bcr::EXTMOD, 0);
        assert!(sim.writes_to(bwtr2).is_empty());

        fmc.extended_mode_enable(SramBank::Bank2, false);
        assert_eq!(fmc.bcr_read(SramBank::Bank2) & bcr::EXTMOD, 0);
        assert_eq!(sim.peek32(bwtr2), 0x0FFF_FFFF);
    }

    #[test]
    fn timings() {
        let sim = SimBus::new();
        let fmc = Fmc::new(&sim);
        let timing = NorSramTiming {
            address_setup: 2,
            address_hold: 1,
            data_setup: 0x20,
            bus_turnaround: 3,
            clock_division: 4,
            data_latency: 5,
            access_mode: AccessMode::B,
        };

        fmc.rw_timing_config(SramBank::Bank1, &timing);
        assert_eq!(sim.peek32(FMC_BASE + 0x04), 0x1543_2012);

        // Bus turnaround of BWTR is kept
        let bwtr1 = FMC_BASE + 0x104;
        sim.preload32(bwtr1, 0x0FFF_FFFF);
        fmc.write_timing_config(SramBank::Bank1, &timing);
        assert_eq!(sim.peek32(bwtr1), 0x154F_2012);
    }
}
