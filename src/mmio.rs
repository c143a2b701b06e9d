//! Memory-mapped register access
//!
//! Every peripheral handle in this crate talks to its registers through a
//! [`Mmio`] bus. On the device this is [`Volatile`], which turns each access
//! into a single volatile load or store. Tests swap in [`crate::sim::SimBus`].

use core::ptr;

/// Register bus
///
/// # Safety
///
/// Implementors must perform every access as exactly one bus transaction of
/// the requested width. `Volatile` additionally relies on the caller passing
/// addresses that are valid MMIO or flash locations of the running device.
pub unsafe trait Mmio {
    fn read32(&self, addr: usize) -> u32;

    fn write32(&self, addr: usize, val: u32);

    fn read8(&self, addr: usize) -> u8;

    fn write8(&self, addr: usize, val: u8);

    fn write16(&self, addr: usize, val: u16);

    fn write64(&self, addr: usize, val: u64);

    /// Completes all outstanding writes before the next access
    fn barrier(&self) {}

    /// Busy-waits until `done` returns `true`
    ///
    /// There is no timeout. If the hardware never reports the condition, this
    /// never returns.
    fn poll<F>(&self, mut done: F)
    where
        F: FnMut() -> bool,
    {
        while !done() {
            core::hint::spin_loop();
        }
    }

    fn modify32<F>(&self, addr: usize, op: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let val = self.read32(addr);
        self.write32(addr, op(val));
    }

    fn set_bits32(&self, addr: usize, bits: u32) {
        self.modify32(addr, |r| r | bits);
    }

    fn clear_bits32(&self, addr: usize, bits: u32) {
        self.modify32(addr, |r| r & !bits);
    }

    fn is_set32(&self, addr: usize, bits: u32) -> bool {
        self.read32(addr) & bits == bits
    }
}

// SAFETY: Forwards every access unchanged
unsafe impl<T: Mmio + ?Sized> Mmio for &T {
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&self, addr: usize, val: u32) {
        (**self).write32(addr, val)
    }

    fn read8(&self, addr: usize) -> u8 {
        (**self).read8(addr)
    }

    fn write8(&self, addr: usize, val: u8) {
        (**self).write8(addr, val)
    }

    fn write16(&self, addr: usize, val: u16) {
        (**self).write16(addr, val)
    }

    fn write64(&self, addr: usize, val: u64) {
        (**self).write64(addr, val)
    }

    fn barrier(&self) {
        (**self).barrier()
    }

    fn poll<F>(&self, done: F)
    where
        F: FnMut() -> bool,
    {
        (**self).poll(done)
    }
}

/// Device bus: volatile accesses at the physical address
#[derive(Debug, Clone, Copy, Default)]
pub struct Volatile;

// SAFETY: Each method is a single volatile access of the stated width
unsafe impl Mmio for Volatile {
    #[inline(always)]
    fn read32(&self, addr: usize) -> u32 {
        // SAFETY: See trait contract
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write32(&self, addr: usize, val: u32) {
        // SAFETY: See trait contract
        unsafe { ptr::write_volatile(addr as *mut u32, val) }
    }

    #[inline(always)]
    fn read8(&self, addr: usize) -> u8 {
        // SAFETY: See trait contract
        unsafe { ptr::read_volatile(addr as *const u8) }
    }

    #[inline(always)]
    fn write8(&self, addr: usize, val: u8) {
        // SAFETY: See trait contract
        unsafe { ptr::write_volatile(addr as *mut u8, val) }
    }

    #[inline(always)]
    fn write16(&self, addr: usize, val: u16) {
        // SAFETY: See trait contract
        unsafe { ptr::write_volatile(addr as *mut u16, val) }
    }

    #[inline(always)]
    fn write64(&self, addr: usize, val: u64) {
        // SAFETY: See trait contract
        unsafe { ptr::write_volatile(addr as *mut u64, val) }
    }

    #[inline(always)]
    fn barrier(&self) {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::dsb();

        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }
}
