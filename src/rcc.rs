//! Reset and clock control
//!
//! [`Rcc::clock_setup_pll`] brings the core up to one of the operating points
//! of [`scale`]. The remaining methods are the individual steps it is built
//! from, usable on their own when the tables don't fit.

use crate::flash::Flash;
use crate::memory_map::RCC_BASE;
use crate::mmio::Mmio;
use crate::pwr::Pwr;
use crate::time::Hertz;
use num_enum::{FromPrimitive, IntoPrimitive};

mod clocks;
mod osc;
pub mod rec;
pub mod scale;

pub use clocks::{Clocks, CoreClocks};
pub use osc::{OscBits, Oscillator};
pub use rec::{Bus, Enable, LPEnable, RccBus, Reset, Timer};
pub use scale::{Clock3v3, ClockScale, HseCrystal};

/// Register offsets
pub mod regs {
    pub const CR: usize = 0x00;
    pub const PLLCFGR: usize = 0x04;
    pub const CFGR: usize = 0x08;
    pub const CIR: usize = 0x0C;
    pub const BDCR: usize = 0x70;
    pub const CSR: usize = 0x74;
    pub const SSCGR: usize = 0x80;
    pub const PLLI2SCFGR: usize = 0x84;
    pub const PLLSAICFGR: usize = 0x88;
    pub const DCKCFGR: usize = 0x8C;
}

/// `RCC_CR` bits
pub mod cr {
    pub const HSION: u32 = 1 << 0;
    pub const HSIRDY: u32 = 1 << 1;
    pub const HSEON: u32 = 1 << 16;
    pub const HSERDY: u32 = 1 << 17;
    pub const HSEBYP: u32 = 1 << 18;
    pub const CSSON: u32 = 1 << 19;
    pub const PLLON: u32 = 1 << 24;
    pub const PLLRDY: u32 = 1 << 25;
    pub const PLLI2SON: u32 = 1 << 26;
    pub const PLLI2SRDY: u32 = 1 << 27;
    pub const PLLSAION: u32 = 1 << 28;
    pub const PLLSAIRDY: u32 = 1 << 29;
}

/// `RCC_PLLCFGR` fields
pub mod pllcfgr {
    pub const PLLM_SHIFT: u32 = 0;
    pub const PLLM_MASK: u32 = 0x3F;
    pub const PLLN_SHIFT: u32 = 6;
    pub const PLLN_MASK: u32 = 0x1FF;
    pub const PLLP_SHIFT: u32 = 16;
    pub const PLLP_MASK: u32 = 0x3;
    pub const PLLSRC: u32 = 1 << 22;
    pub const PLLQ_SHIFT: u32 = 24;
    pub const PLLQ_MASK: u32 = 0xF;
    pub const PLLR_SHIFT: u32 = 28;
    pub const PLLR_MASK: u32 = 0x7;
}

/// `RCC_CFGR` fields
pub mod cfgr {
    pub const SW_SHIFT: u32 = 0;
    pub const SW_MASK: u32 = 0b11;
    pub const SWS_SHIFT: u32 = 2;
    pub const HPRE_SHIFT: u32 = 4;
    pub const HPRE_MASK: u32 = 0xF;
    pub const PPRE1_SHIFT: u32 = 10;
    pub const PPRE2_SHIFT: u32 = 13;
    pub const PPRE_MASK: u32 = 0b111;
    pub const RTCPRE_SHIFT: u32 = 16;
    pub const RTCPRE_MASK: u32 = 0x1F;
}

/// `RCC_CIR` bits
pub mod cir {
    pub const LSIRDYF: u32 = 1 << 0;
    pub const LSERDYF: u32 = 1 << 1;
    pub const HSIRDYF: u32 = 1 << 2;
    pub const HSERDYF: u32 = 1 << 3;
    pub const PLLRDYF: u32 = 1 << 4;
    pub const PLLI2SRDYF: u32 = 1 << 5;
    pub const PLLSAIRDYF: u32 = 1 << 6;
    pub const CSSF: u32 = 1 << 7;
    pub const LSIRDYIE: u32 = 1 << 8;
    pub const LSERDYIE: u32 = 1 << 9;
    pub const HSIRDYIE: u32 = 1 << 10;
    pub const HSERDYIE: u32 = 1 << 11;
    pub const PLLRDYIE: u32 = 1 << 12;
    pub const PLLI2SRDYIE: u32 = 1 << 13;
    pub const PLLSAIRDYIE: u32 = 1 << 14;
    pub const LSIRDYC: u32 = 1 << 16;
    pub const LSERDYC: u32 = 1 << 17;
    pub const HSIRDYC: u32 = 1 << 18;
    pub const HSERDYC: u32 = 1 << 19;
    pub const PLLRDYC: u32 = 1 << 20;
    pub const PLLI2SRDYC: u32 = 1 << 21;
    pub const PLLSAIRDYC: u32 = 1 << 22;
    pub const CSSC: u32 = 1 << 23;
}

/// `RCC_BDCR` bits
pub mod bdcr {
    pub const LSEON: u32 = 1 << 0;
    pub const LSERDY: u32 = 1 << 1;
    pub const LSEBYP: u32 = 1 << 2;
    pub const RTCSEL_SHIFT: u32 = 8;
    pub const RTCSEL_MASK: u32 = 0b11;
    pub const RTCEN: u32 = 1 << 15;
    pub const BDRST: u32 = 1 << 16;
}

/// `RCC_CSR` bits
pub mod csr {
    pub const LSION: u32 = 1 << 0;
    pub const LSIRDY: u32 = 1 << 1;
    pub const RMVF: u32 = 1 << 24;
    pub const BORRSTF: u32 = 1 << 25;
    pub const PINRSTF: u32 = 1 << 26;
    pub const PORRSTF: u32 = 1 << 27;
    pub const SFTRSTF: u32 = 1 << 28;
    pub const IWDGRSTF: u32 = 1 << 29;
    pub const WWDGRSTF: u32 = 1 << 30;
    pub const LPWRRSTF: u32 = 1 << 31;
}

/// `RCC_PLLI2SCFGR` and `RCC_PLLSAICFGR` fields
pub mod pllxcfgr {
    pub const N_SHIFT: u32 = 6;
    pub const N_MASK: u32 = 0x1FF;
    pub const P_SHIFT: u32 = 16;
    pub const P_MASK: u32 = 0x3;
    pub const Q_SHIFT: u32 = 24;
    pub const Q_MASK: u32 = 0xF;
    pub const R_SHIFT: u32 = 28;
    pub const R_MASK: u32 = 0x7;
}

/// `RCC_DCKCFGR` fields
pub mod dckcfgr {
    pub const PLLSAIDIVQ_SHIFT: u32 = 8;
    pub const PLLSAIDIVQ_MASK: u32 = 0x1F;
    pub const PLLSAIDIVR_SHIFT: u32 = 16;
    pub const PLLSAIDIVR_MASK: u32 = 0b11;
    pub const TIMPRE: u32 = 1 << 24;
}

/// HSI frequency
pub const HSI_HERTZ: Hertz = Hertz::from_raw(16_000_000);
/// Nominal LSI frequency
pub const LSI_HERTZ: Hertz = Hertz::from_raw(32_000);
/// LSE crystal frequency
pub const LSE_HERTZ: Hertz = Hertz::from_raw(32_768);

pub struct Rcc<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Rcc<B> {
    pub fn new(bus: B) -> Self {
        Self::with_base(bus, RCC_BASE)
    }

    pub fn with_base(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// Sets the enable bit of `osc`
    pub fn osc_on(&self, osc: Oscillator) {
        let bits = osc.bits();
        self.bus.set_bits32(self.reg(bits.reg), bits.on);
    }

    /// Clears the enable bit of `osc`
    pub fn osc_off(&self, osc: Oscillator) {
        let bits = osc.bits();
        self.bus.clear_bits32(self.reg(bits.reg), bits.on);
    }

    pub fn is_osc_ready(&self, osc: Oscillator) -> bool {
        let bits = osc.bits();
        self.bus.is_set32(self.reg(bits.reg), bits.rdy)
    }

    /// Blocks until `osc` reports ready
    ///
    /// Never returns if the oscillator doesn't start, e.g. without a crystal
    pub fn wait_for_osc_ready(&self, osc: Oscillator) {
        self.bus.poll(|| self.is_osc_ready(osc));
    }

    /// Feeds HSE or LSE from an external clock instead of a crystal
    ///
    /// Only valid while the oscillator is off. Has no effect on other
    /// oscillators.
    pub fn osc_bypass_enable(&self, osc: Oscillator) {
        match osc {
            Oscillator::Hse => self.bus.set_bits32(self.reg(regs::CR), cr::HSEBYP),
            Oscillator::Lse => self.bus.set_bits32(self.reg(regs::BDCR), bdcr::LSEBYP),
            _ => {}
        }
    }

    pub fn osc_bypass_disable(&self, osc: Oscillator) {
        match osc {
            Oscillator::Hse => self.bus.clear_bits32(self.reg(regs::CR), cr::HSEBYP),
            Oscillator::Lse => self.bus.clear_bits32(self.reg(regs::BDCR), bdcr::LSEBYP),
            _ => {}
        }
    }

    pub fn osc_ready_int_enable(&self, osc: Oscillator) {
        self.bus.set_bits32(self.reg(regs::CIR), osc.bits().int_enable);
    }

    pub fn osc_ready_int_disable(&self, osc: Oscillator) {
        self.bus.clear_bits32(self.reg(regs::CIR), osc.bits().int_enable);
    }

    pub fn osc_ready_int_clear(&self, osc: Oscillator) {
        self.bus.set_bits32(self.reg(regs::CIR), osc.bits().int_clear);
    }

    pub fn osc_ready_int_flag(&self, osc: Oscillator) -> bool {
        self.bus.is_set32(self.reg(regs::CIR), osc.bits().int_flag)
    }

    /// Clock security system on HSE
    pub fn css_enable(&self) {
        self.bus.set_bits32(self.reg(regs::CR), cr::CSSON);
    }

    pub fn css_disable(&self) {
        self.bus.clear_bits32(self.reg(regs::CR), cr::CSSON);
    }

    pub fn css_int_clear(&self) {
        self.bus.set_bits32(self.reg(regs::CIR), cir::CSSC);
    }

    pub fn css_int_flag(&self) -> bool {
        self.bus.is_set32(self.reg(regs::CIR), cir::CSSF)
    }

    pub fn set_sysclk_source(&self, sw: SysclkSwitch) {
        self.modify_field(regs::CFGR, u8::from(sw) as u32, cfgr::SW_MASK, cfgr::SW_SHIFT);
    }

    /// Blocks until the clock switch reports `sw` as the system clock
    pub fn wait_for_sysclk_status(&self, sw: SysclkSwitch) {
        self.bus.poll(|| self.system_clock_source() == sw);
    }

    /// Clock currently driving SYSCLK
    pub fn system_clock_source(&self) -> SysclkSwitch {
        self.cfg_read().sws()
    }

    /// Only valid while the main PLL is off
    pub fn set_pll_source(&self, src: PllSource) {
        let addr = self.reg(regs::PLLCFGR);

        match src {
            PllSource::Hsi => self.bus.clear_bits32(addr, pllcfgr::PLLSRC),
            PllSource::Hse => self.bus.set_bits32(addr, pllcfgr::PLLSRC),
        }
    }

    /// AHB prescaler
    pub fn set_hpre(&self, hpre: PreScaler) {
        self.modify_field(regs::CFGR, u8::from(hpre) as u32, cfgr::HPRE_MASK, cfgr::HPRE_SHIFT);
    }

    /// APB1 prescaler
    pub fn set_ppre1(&self, ppre: PpreScaler) {
        self.modify_field(regs::CFGR, u8::from(ppre) as u32, cfgr::PPRE_MASK, cfgr::PPRE1_SHIFT);
    }

    /// APB2 prescaler
    pub fn set_ppre2(&self, ppre: PpreScaler) {
        self.modify_field(regs::CFGR, u8::from(ppre) as u32, cfgr::PPRE_MASK, cfgr::PPRE2_SHIFT);
    }

    /// HSE divider for the RTC clock, 2 to 31 (0 and 1 stop the clock)
    pub fn set_rtcpre(&self, rtcpre: u8) {
        self.modify_field(regs::CFGR, rtcpre as u32, cfgr::RTCPRE_MASK, cfgr::RTCPRE_SHIFT);
    }

    /// AHB division factor currently in effect
    pub fn hpre_prescaler(&self) -> u16 {
        self.cfg_read().hpre().div_scale()
    }

    /// Writes the complete main PLL configuration in a single access
    ///
    /// The PLL must be off. `pllp` is the division factor (2, 4, 6 or 8), the
    /// other factors are written as given. A `pllr` below 2 is replaced by 2,
    /// its reset value, for parts without that output.
    pub fn set_main_pll(&self, source: PllSource, pllm: u8, plln: u16, pllp: u8, pllq: u8, pllr: u8) {
        let pllr = pllr.max(2);

        let mut w = PllCfgrW::reset();
        w.pllm(pllm)
            .plln(plln)
            .pllp((pllp >> 1).wrapping_sub(1))
            .pllsrc(source)
            .pllq(pllq)
            .pllr(pllr);

        self.bus.write32(self.reg(regs::PLLCFGR), w.bits());
    }

    /// Writes the I2S PLL multiplier and I2S divider
    pub fn plli2s_config(&self, n: u16, r: u8) {
        let val = ((n as u32 & pllxcfgr::N_MASK) << pllxcfgr::N_SHIFT)
            | ((r as u32 & pllxcfgr::R_MASK) << pllxcfgr::R_SHIFT);

        self.bus.write32(self.reg(regs::PLLI2SCFGR), val);
    }

    /// Writes the SAI PLL factors
    ///
    /// `p` exists on F469/F479 only, pass 0 elsewhere
    pub fn pllsai_config(&self, n: u16, p: u8, q: u8, r: u8) {
        let val = ((n as u32 & pllxcfgr::N_MASK) << pllxcfgr::N_SHIFT)
            | ((p as u32 & pllxcfgr::P_MASK) << pllxcfgr::P_SHIFT)
            | ((q as u32 & pllxcfgr::Q_MASK) << pllxcfgr::Q_SHIFT)
            | ((r as u32 & pllxcfgr::R_MASK) << pllxcfgr::R_SHIFT);

        self.bus.write32(self.reg(regs::PLLSAICFGR), val);
    }

    /// Dedicated dividers behind the SAI PLL: `q` for SAI, `r` for the LCD-TFT
    pub fn pllsai_postscalers(&self, q: u8, r: u8) {
        self.bus.modify32(self.reg(regs::DCKCFGR), |mut val| {
            set_u32!(val, q as u32, dckcfgr::PLLSAIDIVQ_MASK, dckcfgr::PLLSAIDIVQ_SHIFT);
            set_u32!(val, r as u32, dckcfgr::PLLSAIDIVR_MASK, dckcfgr::PLLSAIDIVR_SHIFT);
            val
        });
    }

    /// Switches SYSCLK to the main PLL configured per `scale`
    ///
    /// HSI is used as the system clock while the PLL is reprogrammed and is
    /// turned off at the end if the PLL runs from HSE. Every wait blocks until
    /// the hardware reports the change, there is no timeout.
    ///
    /// The returned [`Clocks`] holds the bus frequencies declared by `scale`
    pub fn clock_setup_pll<FB, PB>(&self, scale: &ClockScale, pwr: &Pwr<PB>, flash: &Flash<FB>) -> Clocks
    where
        FB: Mmio,
        PB: Mmio,
    {
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "clock setup: {} Hz from {}",
            scale.ahb_frequency.raw(),
            scale.pll_source
        );

        self.osc_on(Oscillator::Hsi);
        self.wait_for_osc_ready(Oscillator::Hsi);
        self.set_sysclk_source(SysclkSwitch::Hsi);

        if scale.pll_source == PllSource::Hse {
            self.osc_on(Oscillator::Hse);
            self.wait_for_osc_ready(Oscillator::Hse);
        }

        rec::PWR::enable(self);
        pwr.set_vos_scale(scale.voltage_scale);

        // Bus dividers are in place before the PLL locks
        self.set_hpre(scale.hpre);
        self.set_ppre1(scale.ppre1);
        self.set_ppre2(scale.ppre2);

        self.osc_off(Oscillator::Pll);
        self.set_main_pll(
            scale.pll_source,
            scale.pllm,
            scale.plln,
            scale.pllp,
            scale.pllq,
            scale.pllr,
        );
        self.osc_on(Oscillator::Pll);
        self.wait_for_osc_ready(Oscillator::Pll);

        #[cfg(feature = "defmt")]
        defmt::trace!("PLL locked, flash config {=u32:#x}", scale.flash_config);

        // Wait states must be in place before the core runs faster
        flash.apply_access_config(scale.flash_config);

        self.set_sysclk_source(SysclkSwitch::Pll);
        self.wait_for_sysclk_status(SysclkSwitch::Pll);

        let clocks = Clocks::from_scale(scale);

        if scale.pll_source == PllSource::Hse {
            self.osc_off(Oscillator::Hsi);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("running at {}", clocks);

        clocks
    }

    /// Derives SYSCLK and bus clocks from the live registers
    ///
    /// `hse` is the frequency of the external crystal or clock, if any
    pub fn clocks_freq(&self, hse: Hertz) -> CoreClocks {
        let cfgr = self.cfg_read();
        let sysclk = Hertz::from_raw(Self::sysclk_hertz(&cfgr, &self.pllcfgr_read(), hse));

        CoreClocks::new(sysclk, &cfgr)
    }

    pub fn current_sysclk_hertz(&self, hse: Hertz) -> u32 {
        Self::sysclk_hertz(&self.cfg_read(), &self.pllcfgr_read(), hse)
    }

    fn sysclk_hertz(cfgr: &CfgrR, pllcfgr: &PllCfgrR, hse: Hertz) -> u32 {
        match cfgr.sws() {
            SysclkSwitch::Hse => hse.raw(),
            SysclkSwitch::Pll => {
                let src = match pllcfgr.pllsrc() {
                    PllSource::Hsi => HSI_HERTZ.raw(),
                    PllSource::Hse => hse.raw(),
                } as u64;

                let pllm = (pllcfgr.pllm() as u64).max(1);
                let plln = pllcfgr.plln() as u64;
                let pllp = (pllcfgr.pllp() as u64 + 1) * 2;

                (src / pllm * plln / pllp) as u32
            }
            SysclkSwitch::Hsi | SysclkSwitch::NotApplicable => HSI_HERTZ.raw(),
        }
    }

    /// Backup domain writes need [`Pwr::disable_backup_domain_write_protection`]
    pub fn enable_rtc_clock(&self) {
        self.bus.set_bits32(self.reg(regs::BDCR), bdcr::RTCEN);
    }

    pub fn disable_rtc_clock(&self) {
        self.bus.clear_bits32(self.reg(regs::BDCR), bdcr::RTCEN);
    }

    /// Selects the RTC clock. Can only be changed again after a backup domain
    /// reset.
    pub fn set_rtc_clock_source(&self, src: RtcClockSource) {
        self.modify_field(regs::BDCR, u8::from(src) as u32, bdcr::RTCSEL_MASK, bdcr::RTCSEL_SHIFT);
    }

    /// Resets RTC, LSE and backup registers
    pub fn backup_domain_reset(&self) {
        self.bus.set_bits32(self.reg(regs::BDCR), bdcr::BDRST);
        self.bus.clear_bits32(self.reg(regs::BDCR), bdcr::BDRST);
    }

    pub fn clear_reset_flags(&self) {
        self.bus.set_bits32(self.reg(regs::CSR), csr::RMVF);
    }

    /// Reset cause flags and LSI state
    pub fn reset_flags(&self) -> CsrR {
        CsrR::read_from(&self.bus, self.base)
    }

    pub fn cfg_read(&self) -> CfgrR {
        CfgrR::read_from(&self.bus, self.base)
    }

    pub fn cr_read(&self) -> CrR {
        CrR::read_from(&self.bus, self.base)
    }

    pub fn pllcfgr_read(&self) -> PllCfgrR {
        PllCfgrR::read_from(&self.bus, self.base)
    }

    fn modify_field(&self, offset: usize, x: u32, mask: u32, shift: u32) {
        self.bus.modify32(self.reg(offset), |mut r| {
            set_u32!(r, x, mask, shift);
            r
        });
    }
}

config_reg_u32! {
    R, CfgrR, regs::CFGR, [
        sw => (SysclkSwitch, u8, [1:0], "System clock switch"),
        sws => (SysclkSwitch, u8, [3:2], "System clock switch status"),
        hpre => (PreScaler, u8, [7:4], "AHB prescaler"),
        ppre1 => (PpreScaler, u8, [12:10], "APB1 low-speed prescaler"),
        ppre2 => (PpreScaler, u8, [15:13], "APB2 high-speed prescaler"),
        rtcpre => (u8, u8, [20:16], "HSE division factor for RTC clock"),
        mco1 => (u8, u8, [22:21], "Microcontroller clock output 1"),
        i2ssrc => (bool, bool, [23:23], "I2S clock selection\n\n\
            - `false`: PLLI2S\n\
            - `true`: external I2S_CKIN pin
        "),
        mco1pre => (u8, u8, [26:24], "MCO1 prescaler"),
        mco2pre => (u8, u8, [29:27], "MCO2 prescaler"),
        mco2 => (u8, u8, [31:30], "Microcontroller clock output 2"),
    ]
}

config_reg_u32! {
    R, CrR, regs::CR, [
        hsion => (bool, bool, [0:0], "HSI clock enable"),
        hsirdy => (bool, bool, [1:1], "HSI clock ready flag"),
        hsitrim => (u8, u8, [7:3], "HSI clock trimming"),
        hsical => (u8, u8, [15:8], "HSI clock calibration"),
        hseon => (bool, bool, [16:16], "HSE clock enable"),
        hserdy => (bool, bool, [17:17], "HSE clock ready flag"),
        hsebyp => (bool, bool, [18:18], "HSE clock bypass"),
        csson => (bool, bool, [19:19], "Clock security system enable"),
        pllon => (bool, bool, [24:24], "Main PLL enable"),
        pllrdy => (bool, bool, [25:25], "Main PLL clock ready flag"),
        plli2son => (bool, bool, [26:26], "PLLI2S enable"),
        plli2srdy => (bool, bool, [27:27], "PLLI2S clock ready flag"),
        pllsaion => (bool, bool, [28:28], "PLLSAI enable"),
        pllsairdy => (bool, bool, [29:29], "PLLSAI clock ready flag"),
    ]
}

config_reg_u32! {
    RW, PllCfgrR, PllCfgrW, regs::PLLCFGR, [
        pllm => (u8, u8, [5:0], "Division factor for the main PLL input clock"),
        plln => (u16, u16, [14:6], "Main PLL multiplication factor for VCO"),
        pllp => (u8, u8, [17:16], "Main PLL division factor for main system clock, encoded as `p / 2 - 1`"),
        pllsrc => (PllSource, u8, [22:22], "Main PLL and audio PLL entry clock source"),
        pllq => (u8, u8, [27:24], "Main PLL division factor for USB OTG FS, SDIO and RNG"),
        pllr => (u8, u8, [30:28], "Main PLL division factor for I2S, DFSDM and DSI"),
    ]
}

config_reg_u32! {
    R, CsrR, regs::CSR, [
        lsion => (bool, bool, [0:0], "LSI oscillator enable"),
        lsirdy => (bool, bool, [1:1], "LSI oscillator ready"),
        borrstf => (bool, bool, [25:25], "BOR reset flag"),
        pinrstf => (bool, bool, [26:26], "PIN reset flag"),
        porrstf => (bool, bool, [27:27], "POR/PDR reset flag"),
        sftrstf => (bool, bool, [28:28], "Software reset flag"),
        iwdgrstf => (bool, bool, [29:29], "Independent watchdog reset flag"),
        wwdgrstf => (bool, bool, [30:30], "Window watchdog reset flag"),
        lpwrrstf => (bool, bool, [31:31], "Low-power reset flag"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SysclkSwitch {
    Hsi = 0b00,
    Hse = 0b01,
    Pll = 0b10,
    /// Not a valid selection
    #[default]
    NotApplicable = 0b11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PllSource {
    #[default]
    Hsi = 0,
    Hse = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RtcClockSource {
    #[default]
    NoClock = 0b00,
    Lse = 0b01,
    Lsi = 0b10,
    /// HSE divided by `RTCPRE`
    Hse = 0b11,
}

/// APB prescaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PpreScaler {
    /// Not divided
    #[default]
    D1 = 0b000,
    /// Divided by 2
    D2 = 0b100,
    /// Divided by 4
    D4 = 0b101,
    /// Divided by 8
    D8 = 0b110,
    /// Divided by 16
    D16 = 0b111,
}

impl PpreScaler {
    /// Division scale factor
    pub const fn div_scale(self) -> u8 {
        match self {
            Self::D1 => 1,
            Self::D2 => 2,
            Self::D4 => 4,
            Self::D8 => 8,
            Self::D16 => 16,
        }
    }
}

/// AHB prescaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PreScaler {
    /// Not divided
    #[default]
    D1 = 0b0000,
    /// Divided by 2
    D2 = 0b1000,
    /// Divided by 4
    D4 = 0b1001,
    /// Divided by 8
    D8 = 0b1010,
    /// Divided by 16
    D16 = 0b1011,
    /// Divided by 64
    D64 = 0b1100,
    /// Divided by 128
    D128 = 0b1101,
    /// Divided by 256
    D256 = 0b1110,
    /// Divided by 512
    D512 = 0b1111,
}

impl PreScaler {
    /// Division scale factor
    pub const fn div_scale(self) -> u16 {
        match self {
            Self::D1 => 1,
            Self::D2 => 2,
            Self::D4 => 4,
            Self::D8 => 8,
            Self::D16 => 16,
            Self::D64 => 64,
            Self::D128 => 128,
            Self::D256 => 256,
            Self::D512 => 512,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flash;
    use crate::memory_map::{FLASH_MEM_INTERFACE_BASE, PWR_BASE};
    use crate::sim::SimBus;
    use crate::time::RateExtU32;

    fn cr(sim: &SimBus) -> u32 {
        sim.peek32(RCC_BASE + regs::CR)
    }

    #[test]
    /// Each oscillator only touches its own enable and ready bits
    fn oscillators_are_isolated() {
        for osc in Oscillator::ALL {
            let sim = SimBus::with_device_models();
            let rcc = Rcc::new(&sim);
            let bits = osc.bits();

            rcc.osc_on(osc);
            rcc.wait_for_osc_ready(osc);

            assert!(rcc.is_osc_ready(osc));

            for addr in [regs::CR, regs::BDCR, regs::CSR] {
                let expected = if addr == bits.reg { bits.on | bits.rdy } else { 0 };
                assert_eq!(sim.peek32(RCC_BASE + addr), expected, "{:?}", osc);
            }

            rcc.osc_off(osc);
            assert!(!rcc.is_osc_ready(osc));
            assert_eq!(sim.peek32(RCC_BASE + bits.reg), 0);
        }
    }

    #[test]
    #[should_panic(expected = "never asserted")]
    /// Without a ready flag the wait never finishes
    fn dead_oscillator_blocks() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);

        rcc.osc_on(Oscillator::Hse);
        rcc.wait_for_osc_ready(Oscillator::Hse);
    }

    #[test]
    fn prescalers_keep_other_fields() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);
        sim.preload32(RCC_BASE + regs::CFGR, 0x0007_0002);

        rcc.set_hpre(PreScaler::D4);
        rcc.set_ppre1(PpreScaler::D8);
        rcc.set_ppre2(PpreScaler::D2);

        let cfgr = rcc.cfg_read();
        assert_eq!(cfgr.hpre(), PreScaler::D4);
        assert_eq!(cfgr.ppre1(), PpreScaler::D8);
        assert_eq!(cfgr.ppre2(), PpreScaler::D2);
        assert_eq!(cfgr.rtcpre(), 7);
        assert_eq!(cfgr.sw(), SysclkSwitch::Pll);
        assert_eq!(rcc.hpre_prescaler(), 4);
    }

    #[test]
    fn main_pll_is_one_write() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);
        sim.preload32(RCC_BASE + regs::PLLCFGR, 0xFFFF_FFFF);

        rcc.set_main_pll(PllSource::Hse, 8, 336, 2, 7, 0);

        let writes = sim.writes_to(RCC_BASE + regs::PLLCFGR);
        assert_eq!(writes.len(), 1);

        let pll = rcc.pllcfgr_read();
        assert_eq!(pll.pllm(), 8);
        assert_eq!(pll.plln(), 336);
        assert_eq!(pll.pllp(), 0);
        assert_eq!(pll.pllsrc(), PllSource::Hse);
        assert_eq!(pll.pllq(), 7);
        assert_eq!(pll.pllr(), 2);
        assert_eq!(writes[0].value, 0x2740_5408);
    }

    #[test]
    /// R factors below 2 become 2, 2 and up are kept
    fn main_pll_r_floor() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);

        for (given, written) in [(0, 2), (1, 2), (2, 2), (3, 3), (7, 7)] {
            rcc.set_main_pll(PllSource::Hsi, 16, 336, 4, 7, given);
            assert_eq!(rcc.pllcfgr_read().pllr(), written);
        }
    }

    #[test]
    fn sysclk_switch() {
        let sim = SimBus::with_device_models();
        let rcc = Rcc::new(&sim);

        rcc.set_sysclk_source(SysclkSwitch::Hse);
        rcc.wait_for_sysclk_status(SysclkSwitch::Hse);

        assert_eq!(rcc.system_clock_source(), SysclkSwitch::Hse);
    }

    #[test]
    fn ready_interrupts() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);

        rcc.osc_ready_int_enable(Oscillator::Lse);
        assert_eq!(sim.peek32(RCC_BASE + regs::CIR), cir::LSERDYIE);

        rcc.osc_ready_int_disable(Oscillator::Lse);
        rcc.osc_ready_int_clear(Oscillator::PllSai);
        assert_eq!(sim.peek32(RCC_BASE + regs::CIR), cir::PLLSAIRDYC);

        sim.preload32(RCC_BASE + regs::CIR, cir::HSERDYF | cir::CSSF);
        assert!(rcc.osc_ready_int_flag(Oscillator::Hse));
        assert!(!rcc.osc_ready_int_flag(Oscillator::Hsi));
        assert!(rcc.css_int_flag());
    }

    #[test]
    fn sai_postscalers_keep_timpre() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);
        sim.preload32(RCC_BASE + regs::DCKCFGR, dckcfgr::TIMPRE | 0x1F00);

        rcc.pllsai_postscalers(3, 2);

        assert_eq!(
            sim.peek32(RCC_BASE + regs::DCKCFGR),
            dckcfgr::TIMPRE | (3 << 8) | (2 << 16)
        );
    }

    #[test]
    fn backup_domain() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);

        rcc.set_rtc_clock_source(RtcClockSource::Lse);
        rcc.enable_rtc_clock();
        assert_eq!(
            sim.peek32(RCC_BASE + regs::BDCR),
            bdcr::RTCEN | (1 << bdcr::RTCSEL_SHIFT)
        );

        sim.clear_log();
        rcc.backup_domain_reset();

        let writes = sim.writes_to(RCC_BASE + regs::BDCR);
        assert_eq!(writes.len(), 2);
        assert_ne!(writes[0].value as u32 & bdcr::BDRST, 0);
        assert_eq!(writes[1].value as u32 & bdcr::BDRST, 0);
    }

    #[test]
    fn live_sysclk() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);

        assert_eq!(rcc.current_sysclk_hertz(8.MHz()), 16_000_000);

        rcc.set_main_pll(PllSource::Hse, 8, 336, 2, 7, 0);
        sim.preload32(RCC_BASE + regs::CFGR, (0b10 << cfgr::SWS_SHIFT) | (0b101 << 10) | (0b100 << 13));

        let clocks = rcc.clocks_freq(8.MHz());
        assert_eq!(clocks.sysclk(), 168.MHz::<1, 1>());
        assert_eq!(clocks.hclk(), 168.MHz::<1, 1>());
        assert_eq!(clocks.pclk1(), 42.MHz::<1, 1>());
        assert_eq!(clocks.pclk2(), 84.MHz::<1, 1>());
    }

    #[test]
    /// 168 MHz from an 8 MHz crystal
    fn full_bring_up_from_hse() {
        let sim = SimBus::with_device_models();
        let rcc = Rcc::new(&sim);
        let pwr = Pwr::new(&sim);
        let flash = Flash::new(&sim);

        let scale = Clock3v3::Mhz168.hse(HseCrystal::Mhz8);
        let clocks = rcc.clock_setup_pll(scale, &pwr, &flash);

        assert_eq!(clocks.ahb().raw(), 168_000_000);
        assert_eq!(clocks.apb1().raw(), 42_000_000);
        assert_eq!(clocks.apb2().raw(), 84_000_000);

        let cr = cr(&sim);
        assert_eq!(cr & cr::HSION, 0);
        assert_ne!(cr & cr::HSEON, 0);
        assert_ne!(cr & cr::PLLON, 0);

        assert_eq!(rcc.system_clock_source(), SysclkSwitch::Pll);
        assert_eq!(flash.acr_read().latency(), 5);
        assert_eq!(pwr.vos_scale(), crate::pwr::Vos::Scale1);
        assert_eq!(rcc.current_sysclk_hertz(8.MHz()), 168_000_000);
    }

    #[test]
    /// The steps run in the order the hardware requires
    fn bring_up_ordering() {
        let sim = SimBus::with_device_models();
        let rcc = Rcc::new(&sim);
        let pwr = Pwr::new(&sim);
        let flash = Flash::new(&sim);

        rcc.clock_setup_pll(Clock3v3::Mhz168.hse(HseCrystal::Mhz8), &pwr, &flash);

        let rcc_cr = RCC_BASE + regs::CR;
        let rcc_cfgr = RCC_BASE + regs::CFGR;
        let writes = sim.writes();
        let first = |pred: &dyn Fn(&crate::sim::Access) -> bool| {
            writes.iter().position(|a| pred(a)).unwrap()
        };
        let last = |pred: &dyn Fn(&crate::sim::Access) -> bool| {
            writes.iter().rposition(|a| pred(a)).unwrap()
        };

        let hsi_on = first(&|a| a.addr == rcc_cr && a.value as u32 & cr::HSION != 0);
        let hse_on = first(&|a| a.addr == rcc_cr && a.value as u32 & cr::HSEON != 0);
        let vos = first(&|a| a.addr == PWR_BASE);
        let ppre2 = first(&|a| a.addr == rcc_cfgr && (a.value as u32 >> 13) & 0b111 == 0b100);
        let pll_cfg = first(&|a| a.addr == RCC_BASE + regs::PLLCFGR);
        let pll_on = first(&|a| a.addr == rcc_cr && a.value as u32 & cr::PLLON != 0);
        let ws = first(&|a| a.addr == FLASH_MEM_INTERFACE_BASE + flash::regs::ACR && a.value & 0xF == 5);
        let sw_pll = first(&|a| a.addr == rcc_cfgr && a.value & 0b11 == 0b10);
        let hsi_off = last(&|a| a.addr == rcc_cr && a.value as u32 & cr::HSION == 0);

        assert!(hsi_on < hse_on);
        assert!(hse_on < vos);
        assert!(vos < ppre2);
        assert!(ppre2 < pll_cfg);
        assert!(pll_cfg < pll_on);
        assert!(pll_on < ws);
        assert!(ws < sw_pll);
        assert!(sw_pll < hsi_off);
    }

    #[test]
    /// HSI stays on when it is the PLL reference
    fn bring_up_from_hsi() {
        let sim = SimBus::with_device_models();
        let rcc = Rcc::new(&sim);
        let pwr = Pwr::new(&sim);
        let flash = Flash::new(&sim);

        let clocks = rcc.clock_setup_pll(Clock3v3::Mhz84.hsi(), &pwr, &flash);

        assert_eq!(clocks.ahb(), 84.MHz::<1, 1>());
        assert_ne!(cr(&sim) & cr::HSION, 0);
        assert_eq!(cr(&sim) & cr::HSEON, 0);
        assert_eq!(rcc.pllcfgr_read().pllsrc(), PllSource::Hsi);
        assert_eq!(rcc.current_sysclk_hertz(0.Hz()), 84_000_000);

        let acr = flash.acr_read();
        assert!(acr.dcen());
        assert!(acr.icen());
        assert_eq!(acr.latency(), 2);
    }
}
