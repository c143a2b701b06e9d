use core::marker::PhantomData;

macro_rules! value_error {
    ($str:expr) => {
        Err($crate::ValueError($str))
    };
}

macro_rules! mask_u32 {
    ($mask:ident, $offset:ident, [$hi:tt : $lo:tt]) => {
        const $mask: u32 = 0xFFFF_FFFF >> (31 - ($hi - $lo));
        const $offset: u32 = $lo;
    };
}

macro_rules! set_u32 {
    ($reg:expr, $x:expr, $mask:expr, $offset:expr) => {
        $reg &= !($mask << $offset);
        $reg |= ($x & $mask) << $offset
    };
}

macro_rules! get_u32 {
    ($uxx:ty, $reg:expr, $mask:expr, $offset:expr) => {
        crate::macros::R::<$uxx>::r(($reg >> $offset) & $mask)
    };
}

/// Typed views of a 32 bit register
///
/// - `R` decodes fields of a value read from the bus
/// - `W` assembles a value field by field, starting from reset (all zero) or
///   from a previously read value
macro_rules! config_reg_u32 {
    (R, $ident_r:ident, $reg:path, [$($field:ident => ($ty:ty, $ux:ty, [$hi:tt : $lo:tt], $doc:tt)),* $(,)?]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $ident_r(u32);

        impl $ident_r {
            #[allow(unused)]
            pub(crate) fn read_from<B: crate::mmio::Mmio>(bus: &B, base: usize) -> Self {
                Self(bus.read32(base + $reg))
            }

            /// Raw register value
            pub fn bits(&self) -> u32 {
                self.0
            }

            $(
                #[doc=$doc]
                pub fn $field(&self) -> $ty {
                    mask_u32!(MASK, OFFSET, [$hi:$lo]);

                    let val = get_u32!($ux, self.0, MASK, OFFSET);

                    <$ty>::from(val)
                }
            )*
        }
    };
    (W, $ident_w:ident, [$($field:ident => ($ty:ty, $ux:ty, [$hi:tt : $lo:tt], $doc:tt)),* $(,)?]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $ident_w(u32);

        impl $ident_w {
            /// All fields zero
            #[allow(unused)]
            pub const fn reset() -> Self {
                Self(0)
            }

            #[allow(unused)]
            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            /// Raw register value
            pub fn bits(&self) -> u32 {
                self.0
            }

            $(
                #[doc=$doc]
                pub fn $field(&mut self, val: $ty) -> &mut Self {
                    mask_u32!(MASK, OFFSET, [$hi:$lo]);

                    let x = u32::from(<$ux>::from(val));

                    set_u32!(self.0, x, MASK, OFFSET);

                    self
                }
            )*
        }
    };
    (RW, $ident_r:ident, $ident_w:ident, $reg:path, [$($field:ident => ($ty:ty, $ux:ty, [$hi:tt : $lo:tt], $doc:tt)),* $(,)?]) => {
        config_reg_u32!(R, $ident_r, $reg, [$($field => ($ty, $ux, [$hi:$lo], $doc)),*]);
        config_reg_u32!(W, $ident_w, [$($field => ($ty, $ux, [$hi:$lo], $doc)),*]);
    };
}

pub struct R<UXX> {
    _uxx: PhantomData<UXX>,
}

impl R<bool> {
    #[inline(always)]
    #[allow(unused)]
    pub fn r(val: u32) -> bool {
        val != 0
    }
}

impl R<u8> {
    #[inline(always)]
    #[allow(unused)]
    pub fn r(val: u32) -> u8 {
        val as u8
    }
}

impl R<u16> {
    #[inline(always)]
    #[allow(unused)]
    pub fn r(val: u32) -> u16 {
        val as u16
    }
}

impl R<u32> {
    #[inline(always)]
    #[allow(unused)]
    pub fn r(val: u32) -> u32 {
        val
    }
}

/// Write-one-to-clear register builder
macro_rules! clear_status_reg_u32 {
    ($ident:ident, [
        $($field:ident => ($bit:tt, $doc:tt)),* $(,)?
    ]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $ident(u32);

        impl $ident {
            pub fn new() -> Self {
                Self(0)
            }

            /// Raw value to be written
            pub fn bits(&self) -> u32 {
                self.0
            }

            $(
                #[doc=$doc]
                pub fn $field(&mut self) -> &mut Self {
                    mask_u32!(MASK, OFFSET, [$bit:$bit]);

                    set_u32!(self.0, 1, MASK, OFFSET);

                    self
                }
            )*
        }
    };
}
