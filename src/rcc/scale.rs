//! Operating points for 3.3 V supplies
//!
//! One table per PLL reference: HSI, or HSE with an 8, 12, 16 or 25 MHz
//! crystal. Each is indexed by [`Clock3v3`].

use super::{PllSource, PpreScaler, PreScaler};
use crate::flash::acr;
use crate::pwr::Vos;
use crate::time::Hertz;
use crate::ValueError;

/// Everything [`super::Rcc::clock_setup_pll`] needs for one target frequency
///
/// The bus frequencies are declared, not computed. [`ClockScale::validate`]
/// checks them against the dividers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockScale {
    /// Division factor for the PLL input
    pub pllm: u8,
    /// VCO multiplier
    pub plln: u16,
    /// Division factor for SYSCLK: 2, 4, 6 or 8
    pub pllp: u8,
    /// Division factor for USB OTG FS, SDIO and RNG
    pub pllq: u8,
    /// Division factor for I2S/DSI, 0 on parts without it
    pub pllr: u8,
    pub pll_source: PllSource,
    pub hpre: PreScaler,
    pub ppre1: PpreScaler,
    pub ppre2: PpreScaler,
    pub voltage_scale: Vos,
    /// `FLASH_ACR` cache enables and latency
    pub flash_config: u32,
    pub ahb_frequency: Hertz,
    pub apb1_frequency: Hertz,
    pub apb2_frequency: Hertz,
}

impl ClockScale {
    /// Checks the divider ranges and that the dividers produce the declared
    /// bus frequencies from `reference`, the PLL input clock
    pub fn validate(&self, reference: Hertz) -> Result<(), ValueError> {
        if self.pllm < 2 || self.pllm > 63 {
            return value_error!("PLLM must be in range of [2, 63]");
        }

        if self.plln < 50 || self.plln > 432 {
            return value_error!("PLLN must be in range of [50, 432]");
        }

        if !matches!(self.pllp, 2 | 4 | 6 | 8) {
            return value_error!("PLLP must be one of 2, 4, 6, 8");
        }

        if self.pllq < 2 || self.pllq > 15 {
            return value_error!("PLLQ must be in range of [2, 15]");
        }

        let vco_in = reference.raw() / self.pllm as u32;
        if !(950_000..=2_100_000).contains(&vco_in) {
            return value_error!("VCO input must be in range of [0.95, 2.1] MHz");
        }

        let vco = reference.raw() as u64 * self.plln as u64 / self.pllm as u64;
        if !(100_000_000..=432_000_000).contains(&vco) {
            return value_error!("VCO output must be in range of [100, 432] MHz");
        }

        let ahb = vco as u32 / self.pllp as u32 / self.hpre.div_scale() as u32;
        let apb1 = ahb / self.ppre1.div_scale() as u32;
        let apb2 = ahb / self.ppre2.div_scale() as u32;

        if ahb != self.ahb_frequency.raw() {
            return value_error!("Declared AHB frequency doesn't match the dividers");
        }

        if apb1 != self.apb1_frequency.raw() {
            return value_error!("Declared APB1 frequency doesn't match the dividers");
        }

        if apb2 != self.apb2_frequency.raw() {
            return value_error!("Declared APB2 frequency doesn't match the dividers");
        }

        Ok(())
    }
}

/// Target core frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Clock3v3 {
    Mhz84,
    Mhz96,
    Mhz168,
    Mhz180,
}

impl Clock3v3 {
    pub const ALL: [Self; 4] = [Self::Mhz84, Self::Mhz96, Self::Mhz168, Self::Mhz180];

    /// Operating point with the PLL fed by HSI
    pub fn hsi(self) -> &'static ClockScale {
        &HSI_CONFIGS[self as usize]
    }

    /// Operating point with the PLL fed by an external crystal
    pub fn hse(self, crystal: HseCrystal) -> &'static ClockScale {
        &crystal.table()[self as usize]
    }
}

/// Supported external crystals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HseCrystal {
    Mhz8,
    Mhz12,
    Mhz16,
    Mhz25,
}

impl HseCrystal {
    pub const ALL: [Self; 4] = [Self::Mhz8, Self::Mhz12, Self::Mhz16, Self::Mhz25];

    pub const fn hertz(self) -> Hertz {
        Hertz::from_raw(match self {
            Self::Mhz8 => 8_000_000,
            Self::Mhz12 => 12_000_000,
            Self::Mhz16 => 16_000_000,
            Self::Mhz25 => 25_000_000,
        })
    }

    pub fn table(self) -> &'static [ClockScale; 4] {
        match self {
            Self::Mhz8 => &HSE_8MHZ_3V3,
            Self::Mhz12 => &HSE_12MHZ_3V3,
            Self::Mhz16 => &HSE_16MHZ_3V3,
            Self::Mhz25 => &HSE_25MHZ_3V3,
        }
    }
}

const fn mhz84(pll_source: PllSource, pllm: u8) -> ClockScale {
    ClockScale {
        pllm,
        plln: 336,
        pllp: 4,
        pllq: 7,
        pllr: 0,
        pll_source,
        hpre: PreScaler::D1,
        ppre1: PpreScaler::D2,
        ppre2: PpreScaler::D1,
        voltage_scale: Vos::Scale1,
        flash_config: acr::DCEN | acr::ICEN | acr::latency(2),
        ahb_frequency: Hertz::from_raw(84_000_000),
        apb1_frequency: Hertz::from_raw(42_000_000),
        apb2_frequency: Hertz::from_raw(84_000_000),
    }
}

const fn mhz96(pll_source: PllSource, pllm: u8, plln: u16) -> ClockScale {
    ClockScale {
        pllm,
        plln,
        pllp: 2,
        pllq: 4,
        pllr: 0,
        pll_source,
        hpre: PreScaler::D1,
        ppre1: PpreScaler::D2,
        ppre2: PpreScaler::D1,
        voltage_scale: Vos::Scale1,
        flash_config: acr::DCEN | acr::ICEN | acr::latency(3),
        ahb_frequency: Hertz::from_raw(96_000_000),
        apb1_frequency: Hertz::from_raw(48_000_000),
        apb2_frequency: Hertz::from_raw(96_000_000),
    }
}

const fn mhz168(pll_source: PllSource, pllm: u8) -> ClockScale {
    ClockScale {
        pllm,
        plln: 336,
        pllp: 2,
        pllq: 7,
        pllr: 0,
        pll_source,
        hpre: PreScaler::D1,
        ppre1: PpreScaler::D4,
        ppre2: PpreScaler::D2,
        voltage_scale: Vos::Scale1,
        flash_config: acr::DCEN | acr::ICEN | acr::latency(5),
        ahb_frequency: Hertz::from_raw(168_000_000),
        apb1_frequency: Hertz::from_raw(42_000_000),
        apb2_frequency: Hertz::from_raw(84_000_000),
    }
}

const fn mhz180(pll_source: PllSource, pllm: u8) -> ClockScale {
    ClockScale {
        pllm,
        plln: 360,
        pllp: 2,
        pllq: 8,
        pllr: 0,
        pll_source,
        hpre: PreScaler::D1,
        ppre1: PpreScaler::D4,
        ppre2: PpreScaler::D2,
        voltage_scale: Vos::Scale1,
        flash_config: acr::DCEN | acr::ICEN | acr::latency(5),
        ahb_frequency: Hertz::from_raw(180_000_000),
        apb1_frequency: Hertz::from_raw(45_000_000),
        apb2_frequency: Hertz::from_raw(90_000_000),
    }
}

pub static HSI_CONFIGS: [ClockScale; 4] = [
    mhz84(PllSource::Hsi, 16),
    mhz96(PllSource::Hsi, 8, 96),
    mhz168(PllSource::Hsi, 16),
    mhz180(PllSource::Hsi, 16),
];

pub static HSE_8MHZ_3V3: [ClockScale; 4] = [
    mhz84(PllSource::Hse, 8),
    mhz96(PllSource::Hse, 4, 96),
    mhz168(PllSource::Hse, 8),
    mhz180(PllSource::Hse, 8),
];

pub static HSE_12MHZ_3V3: [ClockScale; 4] = [
    mhz84(PllSource::Hse, 12),
    mhz96(PllSource::Hse, 6, 96),
    mhz168(PllSource::Hse, 12),
    mhz180(PllSource::Hse, 12),
];

pub static HSE_16MHZ_3V3: [ClockScale; 4] = [
    mhz84(PllSource::Hse, 16),
    mhz96(PllSource::Hse, 8, 96),
    mhz168(PllSource::Hse, 16),
    mhz180(PllSource::Hse, 16),
];

pub static HSE_25MHZ_3V3: [ClockScale; 4] = [
    mhz84(PllSource::Hse, 25),
    mhz96(PllSource::Hse, 25, 192),
    mhz168(PllSource::Hse, 25),
    mhz180(PllSource::Hse, 25),
];

#[cfg(test)]
mod test {
    use super::*;
    use crate::rcc::HSI_HERTZ;

    fn all() -> impl Iterator<Item = (Hertz, &'static ClockScale)> {
        let hsi = Clock3v3::ALL.into_iter().map(|c| (HSI_HERTZ, c.hsi()));
        let hse = HseCrystal::ALL
            .into_iter()
            .flat_map(|x| Clock3v3::ALL.into_iter().map(move |c| (x.hertz(), c.hse(x))));

        hsi.chain(hse)
    }

    #[test]
    /// apb1 <= apb2 <= ahb for every entry
    fn bus_hierarchy() {
        for (_, scale) in all() {
            assert!(scale.apb1_frequency <= scale.apb2_frequency, "{:?}", scale);
            assert!(scale.apb2_frequency <= scale.ahb_frequency, "{:?}", scale);
        }
    }

    #[test]
    /// The declared frequencies follow from the dividers
    fn tables_validate() {
        for (reference, scale) in all() {
            assert_eq!(scale.validate(reference), Ok(()), "{:?}", scale);
        }
    }

    #[test]
    fn sources_match_tables() {
        for c in Clock3v3::ALL {
            assert_eq!(c.hsi().pll_source, PllSource::Hsi);

            for x in HseCrystal::ALL {
                assert_eq!(c.hse(x).pll_source, PllSource::Hse);
            }
        }
    }

    #[test]
    fn validate_catches_wrong_declaration() {
        let mut scale = *Clock3v3::Mhz168.hse(HseCrystal::Mhz8);
        scale.apb1_frequency = Hertz::from_raw(84_000_000);

        assert_eq!(
            scale.validate(HseCrystal::Mhz8.hertz()),
            Err(ValueError("Declared APB1 frequency doesn't match the dividers"))
        );

        // Right dividers, wrong crystal
        let scale = Clock3v3::Mhz168.hse(HseCrystal::Mhz8);
        assert!(scale.validate(HseCrystal::Mhz12.hertz()).is_err());
    }

    #[test]
    fn validate_ranges() {
        let mut scale = *Clock3v3::Mhz84.hsi();
        scale.pllp = 3;

        assert_eq!(
            scale.validate(HSI_HERTZ),
            Err(ValueError("PLLP must be one of 2, 4, 6, 8"))
        );
    }
}
