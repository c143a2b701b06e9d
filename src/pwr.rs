//! PWR Power Control
//!
//! The main regulator output voltage can be scaled to trade power consumption
//! against the maximum system clock. It must be raised before the core clock
//! is: Scale 1 is needed above 144 MHz (168 MHz with over-drive on the
//! F42x/F43x parts), Scale 2 up to 144 MHz and Scale 3 up to 120 MHz.
//!
//! The backup domain (RTC, `RCC_BDCR`, backup registers) is write protected after
//! reset. [`Pwr::disable_backup_domain_write_protection`] has to be called
//! before any of it can be changed.

use crate::memory_map::PWR_BASE;
use crate::mmio::Mmio;
use num_enum::{FromPrimitive, IntoPrimitive};

/// Register offsets
pub mod regs {
    pub const CR: usize = 0x00;
    pub const CSR: usize = 0x04;
}

/// `PWR_CR` bits
pub mod cr {
    pub const LPDS: u32 = 1 << 0;
    pub const PDDS: u32 = 1 << 1;
    pub const CWUF: u32 = 1 << 2;
    pub const CSBF: u32 = 1 << 3;
    pub const PVDE: u32 = 1 << 4;
    pub const DBP: u32 = 1 << 8;
    pub const FPDS: u32 = 1 << 9;
    pub const VOS_SHIFT: u32 = 14;
    pub const VOS_MASK: u32 = 0b11;
}

/// `PWR_CSR` bits
pub mod csr {
    pub const WUF: u32 = 1 << 0;
    pub const SBF: u32 = 1 << 1;
    pub const PVDO: u32 = 1 << 2;
    pub const BRR: u32 = 1 << 3;
    pub const VOSRDY: u32 = 1 << 14;
}

pub struct Pwr<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Pwr<B> {
    pub fn new(bus: B) -> Self {
        Self::with_base(bus, PWR_BASE)
    }

    pub fn with_base(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    /// Selects the regulator voltage scale
    ///
    /// The PWR peripheral clock must be enabled, see [`crate::rcc::rec::PWR`]
    pub fn set_vos_scale(&self, scale: Vos) {
        let x = u8::from(scale) as u32;

        self.bus.modify32(self.base + regs::CR, |mut r| {
            set_u32!(r, x, cr::VOS_MASK, cr::VOS_SHIFT);
            r
        });
    }

    pub fn vos_scale(&self) -> Vos {
        self.cr_read().vos()
    }

    /// `true` once the regulator has reached the selected scale
    pub fn is_vos_ready(&self) -> bool {
        self.bus.is_set32(self.base + regs::CSR, csr::VOSRDY)
    }

    /// Allows writes to the RTC, backup registers and `RCC_BDCR`
    pub fn disable_backup_domain_write_protection(&self) {
        self.bus.set_bits32(self.base + regs::CR, cr::DBP);
    }

    pub fn enable_backup_domain_write_protection(&self) {
        self.bus.clear_bits32(self.base + regs::CR, cr::DBP);
    }

    pub fn clear_wakeup_flag(&self) {
        self.bus.set_bits32(self.base + regs::CR, cr::CWUF);
    }

    pub fn clear_standby_flag(&self) {
        self.bus.set_bits32(self.base + regs::CR, cr::CSBF);
    }

    pub fn cr_read(&self) -> CrR {
        CrR::read_from(&self.bus, self.base)
    }

    pub fn csr_read(&self) -> CsrR {
        CsrR::read_from(&self.bus, self.base)
    }
}

config_reg_u32! {
    R, CrR, regs::CR, [
        lpds => (bool, bool, [0:0], "Low-power deepsleep"),
        pdds => (bool, bool, [1:1], "Power-down deepsleep"),
        pvde => (bool, bool, [4:4], "Power voltage detector enable"),
        pls => (u8, u8, [7:5], "PVD level selection"),
        dbp => (bool, bool, [8:8], "Disable backup domain write protection"),
        fpds => (bool, bool, [9:9], "Flash power-down in Stop mode"),
        vos => (Vos, u8, [15:14], "Regulator voltage scaling output selection"),
    ]
}

config_reg_u32! {
    R, CsrR, regs::CSR, [
        wuf => (bool, bool, [0:0], "Wakeup flag"),
        sbf => (bool, bool, [1:1], "Standby flag"),
        pvdo => (bool, bool, [2:2], "PVD output"),
        brr => (bool, bool, [3:3], "Backup regulator ready"),
        ewup => (bool, bool, [8:8], "Enable WKUP pin"),
        bre => (bool, bool, [9:9], "Backup regulator enable"),
        vosrdy => (bool, bool, [14:14], "Regulator voltage scaling output selection ready"),
    ]
}

/// Regulator voltage scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Vos {
    /// Highest voltage, highest frequency
    #[default]
    Scale1 = 0b11,
    Scale2 = 0b10,
    /// Lowest voltage, lowest frequency
    Scale3 = 0b01,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimBus;

    #[test]
    fn vos_scale_only_touches_its_field() {
        let sim = SimBus::new();
        let pwr = Pwr::new(&sim);
        sim.preload32(PWR_BASE + regs::CR, cr::DBP | cr::LPDS);

        for scale in [Vos::Scale3, Vos::Scale2, Vos::Scale1] {
            pwr.set_vos_scale(scale);

            assert_eq!(pwr.vos_scale(), scale);
            assert_eq!(
                sim.peek32(PWR_BASE + regs::CR) & !(cr::VOS_MASK << cr::VOS_SHIFT),
                cr::DBP | cr::LPDS
            );
        }
    }

    #[test]
    fn backup_domain_protection() {
        let sim = SimBus::new();
        let pwr = Pwr::new(&sim);

        pwr.disable_backup_domain_write_protection();
        assert!(pwr.cr_read().dbp());

        pwr.enable_backup_domain_write_protection();
        assert!(!pwr.cr_read().dbp());
    }
}
