//! Oscillator lookup table

use super::{bdcr, cir, cr, csr, regs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oscillator {
    Pll,
    Hse,
    Hsi,
    Lse,
    Lsi,
    PllSai,
    PllI2s,
}

/// Where an oscillator's control and status bits live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscBits {
    /// Register offset holding the enable and ready bits
    pub reg: usize,
    pub on: u32,
    pub rdy: u32,
    /// Ready interrupt flag in `CIR`
    pub int_flag: u32,
    /// Ready interrupt enable in `CIR`
    pub int_enable: u32,
    /// Ready interrupt clear in `CIR`
    pub int_clear: u32,
}

static OSC_TABLE: [OscBits; 7] = [
    // Pll
    OscBits {
        reg: regs::CR,
        on: cr::PLLON,
        rdy: cr::PLLRDY,
        int_flag: cir::PLLRDYF,
        int_enable: cir::PLLRDYIE,
        int_clear: cir::PLLRDYC,
    },
    // Hse
    OscBits {
        reg: regs::CR,
        on: cr::HSEON,
        rdy: cr::HSERDY,
        int_flag: cir::HSERDYF,
        int_enable: cir::HSERDYIE,
        int_clear: cir::HSERDYC,
    },
    // Hsi
    OscBits {
        reg: regs::CR,
        on: cr::HSION,
        rdy: cr::HSIRDY,
        int_flag: cir::HSIRDYF,
        int_enable: cir::HSIRDYIE,
        int_clear: cir::HSIRDYC,
    },
    // Lse
    OscBits {
        reg: regs::BDCR,
        on: bdcr::LSEON,
        rdy: bdcr::LSERDY,
        int_flag: cir::LSERDYF,
        int_enable: cir::LSERDYIE,
        int_clear: cir::LSERDYC,
    },
    // Lsi
    OscBits {
        reg: regs::CSR,
        on: csr::LSION,
        rdy: csr::LSIRDY,
        int_flag: cir::LSIRDYF,
        int_enable: cir::LSIRDYIE,
        int_clear: cir::LSIRDYC,
    },
    // PllSai
    OscBits {
        reg: regs::CR,
        on: cr::PLLSAION,
        rdy: cr::PLLSAIRDY,
        int_flag: cir::PLLSAIRDYF,
        int_enable: cir::PLLSAIRDYIE,
        int_clear: cir::PLLSAIRDYC,
    },
    // PllI2s
    OscBits {
        reg: regs::CR,
        on: cr::PLLI2SON,
        rdy: cr::PLLI2SRDY,
        int_flag: cir::PLLI2SRDYF,
        int_enable: cir::PLLI2SRDYIE,
        int_clear: cir::PLLI2SRDYC,
    },
];

impl Oscillator {
    pub const ALL: [Self; 7] = [
        Self::Pll,
        Self::Hse,
        Self::Hsi,
        Self::Lse,
        Self::Lsi,
        Self::PllSai,
        Self::PllI2s,
    ];

    pub fn bits(self) -> &'static OscBits {
        &OSC_TABLE[self as usize]
    }
}
