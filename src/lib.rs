#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod flash;
pub mod fmc;
pub mod mmio;
pub mod pwr;
pub mod rcc;
pub mod rtc;
pub mod sdio;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod time;

pub use crate::mmio::{Mmio, Volatile};

/// An argument outside the range the hardware accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ValueError(pub &'static str);

impl ValueError {
    pub fn message(&self) -> &'static str {
        self.0
    }
}

/// Peripheral base addresses
pub mod memory_map {
    pub const PERIPH_BASE: usize = 0x4000_0000;
    pub const APB1_BASE: usize = PERIPH_BASE;
    pub const APB2_BASE: usize = PERIPH_BASE + 0x0001_0000;
    pub const AHB1_BASE: usize = PERIPH_BASE + 0x0002_0000;

    pub const RTC_BASE: usize = APB1_BASE + 0x2800;
    pub const PWR_BASE: usize = APB1_BASE + 0x7000;
    pub const SDIO_BASE: usize = APB2_BASE + 0x2C00;
    pub const RCC_BASE: usize = AHB1_BASE + 0x3800;
    pub const FLASH_MEM_INTERFACE_BASE: usize = AHB1_BASE + 0x3C00;
    pub const FMC_BASE: usize = 0xA000_0000;

    /// SDMMC instances of the H7 family
    pub const SDMMC1_BASE: usize = 0x5200_7000;
    pub const SDMMC2_BASE: usize = 0x4802_2400;

    /// Start of the main flash array
    pub const FLASH_BASE: usize = 0x0800_0000;
}
