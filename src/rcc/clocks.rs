use super::rec::{Bus, RccBus, Timer};
use super::{CfgrR, ClockScale, PpreScaler, Rcc};
use crate::mmio::Mmio;
use crate::time::Hertz;

/// Bus frequencies in effect after a clock setup
///
/// Returned by [`Rcc::clock_setup_pll`] and meant to be handed to every driver
/// that derives baud rates or prescalers from its bus clock. [`Default`] is
/// the reset state: everything at 16 MHz from HSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    ahb: Hertz,
    apb1: Hertz,
    apb2: Hertz,
}

impl Default for Clocks {
    fn default() -> Self {
        Self::RESET
    }
}

impl Clocks {
    pub const RESET: Self = Self {
        ahb: Hertz::from_raw(16_000_000),
        apb1: Hertz::from_raw(16_000_000),
        apb2: Hertz::from_raw(16_000_000),
    };

    pub(crate) fn from_scale(scale: &ClockScale) -> Self {
        Self {
            ahb: scale.ahb_frequency,
            apb1: scale.apb1_frequency,
            apb2: scale.apb2_frequency,
        }
    }

    pub fn ahb(&self) -> Hertz {
        self.ahb
    }

    pub fn apb1(&self) -> Hertz {
        self.apb1
    }

    pub fn apb2(&self) -> Hertz {
        self.apb2
    }

    pub fn bus(&self, bus: Bus) -> Hertz {
        match bus {
            Bus::Ahb1 | Bus::Ahb2 | Bus::Ahb3 => self.ahb,
            Bus::Apb1 => self.apb1,
            Bus::Apb2 => self.apb2,
        }
    }

    /// Kernel clock of a USART/UART: APB2 for USART1 and USART6, APB1 otherwise
    pub fn usart_clk<P: RccBus>(&self) -> Hertz {
        self.bus(P::BUS)
    }

    /// Kernel clock of an SPI: APB1 for SPI2 and SPI3, APB2 otherwise
    pub fn spi_clk<P: RccBus>(&self) -> Hertz {
        self.bus(P::BUS)
    }

    /// All I2C instances sit on APB1
    pub fn i2c_clk(&self) -> Hertz {
        self.apb1
    }

    /// Timer kernel clock
    ///
    /// Timers run at twice their APB frequency whenever that bus is divided.
    /// The prescaler is read live from `rcc`.
    pub fn timer_clk<T: Timer, B: Mmio>(&self, rcc: &Rcc<B>) -> Hertz {
        let cfgr = rcc.cfg_read();

        let (pclk, ppre) = match T::BUS {
            Bus::Apb1 => (self.apb1, cfgr.ppre1()),
            _ => (self.apb2, cfgr.ppre2()),
        };

        if ppre == PpreScaler::D1 {
            pclk
        } else {
            pclk * 2
        }
    }
}

/// Clock tree as read back from the registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoreClocks {
    sysclk: Hertz,
    hclk: Hertz,
    pclk1: Hertz,
    pclk2: Hertz,
}

impl CoreClocks {
    pub(super) fn new(sysclk: Hertz, cfgr: &CfgrR) -> Self {
        let hclk = sysclk / cfgr.hpre().div_scale() as u32;

        Self {
            sysclk,
            hclk,
            pclk1: hclk / cfgr.ppre1().div_scale() as u32,
            pclk2: hclk / cfgr.ppre2().div_scale() as u32,
        }
    }

    pub fn sysclk(&self) -> Hertz {
        self.sysclk
    }

    pub fn hclk(&self) -> Hertz {
        self.hclk
    }

    pub fn pclk1(&self) -> Hertz {
        self.pclk1
    }

    pub fn pclk2(&self) -> Hertz {
        self.pclk2
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory_map::RCC_BASE;
    use crate::rcc::rec::{SPI1, SPI2, TIM1, TIM2, USART1, USART2};
    use crate::rcc::{regs, Clock3v3, HseCrystal};
    use crate::sim::SimBus;
    use crate::time::RateExtU32;

    #[test]
    fn reset_state() {
        let clocks = Clocks::default();

        assert_eq!(clocks.ahb(), 16.MHz::<1, 1>());
        assert_eq!(clocks.apb1(), 16.MHz::<1, 1>());
        assert_eq!(clocks.apb2(), 16.MHz::<1, 1>());
    }

    #[test]
    fn peripheral_buses() {
        let clocks = Clocks::from_scale(Clock3v3::Mhz168.hse(HseCrystal::Mhz8));

        assert_eq!(clocks.usart_clk::<USART1>(), 84.MHz::<1, 1>());
        assert_eq!(clocks.usart_clk::<USART2>(), 42.MHz::<1, 1>());
        assert_eq!(clocks.spi_clk::<SPI1>(), 84.MHz::<1, 1>());
        assert_eq!(clocks.spi_clk::<SPI2>(), 42.MHz::<1, 1>());
        assert_eq!(clocks.i2c_clk(), 42.MHz::<1, 1>());
    }

    #[test]
    /// Divided APB: timers at twice the bus clock, undivided: unchanged
    fn timer_doubling() {
        let sim = SimBus::new();
        let rcc = Rcc::new(&sim);
        let clocks = Clocks::from_scale(Clock3v3::Mhz168.hse(HseCrystal::Mhz8));

        rcc.set_ppre1(PpreScaler::D4);
        rcc.set_ppre2(PpreScaler::D2);
        assert_eq!(clocks.timer_clk::<TIM2, _>(&rcc), 84.MHz::<1, 1>());
        assert_eq!(clocks.timer_clk::<TIM1, _>(&rcc), 168.MHz::<1, 1>());

        sim.preload32(RCC_BASE + regs::CFGR, 0);
        assert_eq!(clocks.timer_clk::<TIM2, _>(&rcc), 42.MHz::<1, 1>());
        assert_eq!(clocks.timer_clk::<TIM1, _>(&rcc), 84.MHz::<1, 1>());
    }
}
