//! Frequency types

pub use fugit::RateExtU32;

/// Clock frequency in Hz
pub type Hertz = fugit::HertzU32;
pub type KiloHertz = fugit::KilohertzU32;
pub type MegaHertz = fugit::MegahertzU32;
