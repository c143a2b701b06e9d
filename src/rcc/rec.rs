//! Reset / Enable Control
//!
//! Every peripheral gets a marker type carrying its bus and bit position, and
//! through that [`Enable`], [`Reset`] and [`LPEnable`].
//!
//! ```ignore
//! rec::PWR::enable(&rcc);
//! rec::SDIO::reset(&rcc);
//! ```

use super::Rcc;
use crate::mmio::Mmio;
use sealed::sealed;

/// Peripheral bus, with the offsets of its RCC enable, reset and low-power
/// enable registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bus {
    Ahb1,
    Ahb2,
    Ahb3,
    Apb1,
    Apb2,
}

impl Bus {
    pub const fn rstr(self) -> usize {
        match self {
            Self::Ahb1 => 0x10,
            Self::Ahb2 => 0x14,
            Self::Ahb3 => 0x18,
            Self::Apb1 => 0x20,
            Self::Apb2 => 0x24,
        }
    }

    pub const fn enr(self) -> usize {
        self.rstr() + 0x20
    }

    pub const fn lpenr(self) -> usize {
        self.rstr() + 0x40
    }
}

#[sealed]
pub trait RccBus {
    const BUS: Bus;
    /// Bit position in the bus' enable, reset and low-power registers
    const BIT: u8;
}

/// Timers, which see a doubled kernel clock on a divided bus
#[sealed]
pub trait Timer: RccBus {}

pub trait Enable: RccBus {
    fn enable<B: Mmio>(rcc: &Rcc<B>) {
        rcc.bus.set_bits32(rcc.base + Self::BUS.enr(), 1 << Self::BIT);
    }

    fn disable<B: Mmio>(rcc: &Rcc<B>) {
        rcc.bus.clear_bits32(rcc.base + Self::BUS.enr(), 1 << Self::BIT);
    }

    fn is_enabled<B: Mmio>(rcc: &Rcc<B>) -> bool {
        rcc.bus.is_set32(rcc.base + Self::BUS.enr(), 1 << Self::BIT)
    }
}

/// Clock gating in Sleep mode
pub trait LPEnable: RccBus {
    fn low_power_enable<B: Mmio>(rcc: &Rcc<B>) {
        rcc.bus.set_bits32(rcc.base + Self::BUS.lpenr(), 1 << Self::BIT);
    }

    fn low_power_disable<B: Mmio>(rcc: &Rcc<B>) {
        rcc.bus.clear_bits32(rcc.base + Self::BUS.lpenr(), 1 << Self::BIT);
    }
}

pub trait Reset: RccBus {
    /// Pulses the reset bit
    fn reset<B: Mmio>(rcc: &Rcc<B>) {
        let addr = rcc.base + Self::BUS.rstr();

        rcc.bus.set_bits32(addr, 1 << Self::BIT);
        rcc.bus.clear_bits32(addr, 1 << Self::BIT);
    }
}

impl<P: RccBus> Enable for P {}
impl<P: RccBus> LPEnable for P {}
impl<P: RccBus> Reset for P {}

macro_rules! rec {
    ($($p:ident => ($bus:ident, $bit:literal)),* $(,)?) => {
        $(
            pub struct $p;

            #[sealed]
            impl RccBus for $p {
                const BUS: Bus = Bus::$bus;
                const BIT: u8 = $bit;
            }
        )*
    };
}

macro_rules! timers {
    ($($t:ident),* $(,)?) => {
        $(
            #[sealed]
            impl Timer for $t {}
        )*
    };
}

rec! {
    GPIOA => (Ahb1, 0),
    GPIOB => (Ahb1, 1),
    GPIOC => (Ahb1, 2),
    GPIOD => (Ahb1, 3),
    GPIOE => (Ahb1, 4),
    GPIOF => (Ahb1, 5),
    GPIOG => (Ahb1, 6),
    GPIOH => (Ahb1, 7),
    GPIOI => (Ahb1, 8),
    GPIOJ => (Ahb1, 9),
    GPIOK => (Ahb1, 10),
    CRC => (Ahb1, 12),
    DMA1 => (Ahb1, 21),
    DMA2 => (Ahb1, 22),
    RNG => (Ahb2, 6),
    OTGFS => (Ahb2, 7),
    FMC => (Ahb3, 0),
    TIM2 => (Apb1, 0),
    TIM3 => (Apb1, 1),
    TIM4 => (Apb1, 2),
    TIM5 => (Apb1, 3),
    TIM6 => (Apb1, 4),
    TIM7 => (Apb1, 5),
    TIM12 => (Apb1, 6),
    TIM13 => (Apb1, 7),
    TIM14 => (Apb1, 8),
    WWDG => (Apb1, 11),
    SPI2 => (Apb1, 14),
    SPI3 => (Apb1, 15),
    USART2 => (Apb1, 17),
    USART3 => (Apb1, 18),
    UART4 => (Apb1, 19),
    UART5 => (Apb1, 20),
    I2C1 => (Apb1, 21),
    I2C2 => (Apb1, 22),
    I2C3 => (Apb1, 23),
    CAN1 => (Apb1, 25),
    CAN2 => (Apb1, 26),
    PWR => (Apb1, 28),
    DAC => (Apb1, 29),
    TIM1 => (Apb2, 0),
    TIM8 => (Apb2, 1),
    USART1 => (Apb2, 4),
    USART6 => (Apb2, 5),
    ADC1 => (Apb2, 8),
    SDIO => (Apb2, 11),
    SPI1 => (Apb2, 12),
    SPI4 => (Apb2, 13),
    SYSCFG => (Apb2, 14),
    TIM9 => (Apb2, 16),
    TIM10 => (Apb2, 17),
    TIM11 => (Apb2, 18),
    SPI5 => (Apb2, 20),
    SPI6 => (Apb2, 21),
}

timers! {
    TIM1, TIM2, TIM3, TIM4, TIM5, TIM6, TIM7, TIM8,
    TIM9, TIM10, TIM11, TIM12, TIM13, TIM14,
}
