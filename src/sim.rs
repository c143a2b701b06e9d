//! Register-memory simulation
//!
//! [`SimBus`] stands in for the MMIO region: a sparse, byte addressable memory
//! in which every byte reads as zero until written. Writes are logged in order
//! so tests can check register sequencing, and after each write a list of
//! hooks gets to play the part of the hardware (ready flags following enable
//! bits and so on). See [`models`] for the stock hooks.

use crate::mmio::Mmio;
use core::cell::RefCell;
use heapless::{FnvIndexMap, Vec};

/// Simulated bytes that may hold a value at the same time
pub const MEMORY_BYTES: usize = 2048;
/// Length of the write log
pub const LOG_LEN: usize = 512;
/// Iterations after which [`SimBus::poll`] gives up
pub const POLL_LIMIT: usize = 10_000;

const MAX_HOOKS: usize = 8;
const MAX_LATCHES: usize = 16;

/// One write as seen on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub addr: usize,
    /// Width in bytes
    pub width: u8,
    pub value: u64,
}

/// Fake hardware behaviour, called with the address of every write
pub type Hook = fn(&mut SimMemory, usize);

pub struct SimMemory {
    bytes: FnvIndexMap<usize, u8, MEMORY_BYTES>,
    latches: FnvIndexMap<usize, u32, MAX_LATCHES>,
}

impl SimMemory {
    fn new() -> Self {
        Self {
            bytes: FnvIndexMap::new(),
            latches: FnvIndexMap::new(),
        }
    }

    pub fn read8(&self, addr: usize) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    pub fn write8(&mut self, addr: usize, val: u8) {
        if self.bytes.insert(addr, val).is_err() {
            panic!("simulated memory exhausted at {:#010x}", addr);
        }
    }

    /// Little endian read of `width` bytes
    pub fn read(&self, addr: usize, width: u8) -> u64 {
        (0..width as usize).fold(0, |acc, i| acc | (self.read8(addr + i) as u64) << (8 * i))
    }

    /// Little endian write of `width` bytes
    pub fn write(&mut self, addr: usize, width: u8, val: u64) {
        for i in 0..width as usize {
            self.write8(addr + i, (val >> (8 * i)) as u8);
        }
    }

    pub fn read32(&self, addr: usize) -> u32 {
        self.read(addr, 4) as u32
    }

    pub fn write32(&mut self, addr: usize, val: u32) {
        self.write(addr, 4, val as u64);
    }

    pub fn set_bits32(&mut self, addr: usize, bits: u32) {
        let val = self.read32(addr);
        self.write32(addr, val | bits);
    }

    pub fn clear_bits32(&mut self, addr: usize, bits: u32) {
        let val = self.read32(addr);
        self.write32(addr, val & !bits);
    }

    /// Hidden per-register state for hooks that model sequences
    pub fn latch(&mut self, key: usize) -> u32 {
        self.latches.get(&key).copied().unwrap_or(0)
    }

    pub fn set_latch(&mut self, key: usize, val: u32) {
        if self.latches.insert(key, val).is_err() {
            panic!("simulated latches exhausted");
        }
    }
}

pub struct SimBus {
    memory: RefCell<SimMemory>,
    log: RefCell<Vec<Access, LOG_LEN>>,
    overflowed: RefCell<bool>,
    hooks: Vec<Hook, MAX_HOOKS>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// Plain memory, no hardware behaviour
    pub fn new() -> Self {
        Self {
            memory: RefCell::new(SimMemory::new()),
            log: RefCell::new(Vec::new()),
            overflowed: RefCell::new(false),
            hooks: Vec::new(),
        }
    }

    /// Memory with every stock model of [`models`] attached
    pub fn with_device_models() -> Self {
        Self::new()
            .with_hook(models::rcc_oscillators)
            .with_hook(models::rcc_sysclk_switch)
            .with_hook(models::flash_keys)
            .with_hook(models::rtc_init_mode)
    }

    pub fn with_hook(mut self, hook: Hook) -> Self {
        if self.hooks.push(hook).is_err() {
            panic!("too many simulation hooks");
        }
        self
    }

    /// Sets a register without logging or running hooks
    pub fn preload32(&self, addr: usize, val: u32) {
        self.memory.borrow_mut().write32(addr, val);
    }

    /// Reads a register without logging
    pub fn peek32(&self, addr: usize) -> u32 {
        self.memory.borrow().read32(addr)
    }

    pub fn peek8(&self, addr: usize) -> u8 {
        self.memory.borrow().read8(addr)
    }

    /// Every write since creation or the last [`Self::clear_log`]
    pub fn writes(&self) -> Vec<Access, LOG_LEN> {
        self.log.borrow().clone()
    }

    /// Writes that targeted `addr`
    pub fn writes_to(&self, addr: usize) -> Vec<Access, LOG_LEN> {
        self.log
            .borrow()
            .iter()
            .filter(|a| a.addr == addr)
            .copied()
            .collect()
    }

    /// Index of the first logged write matching `pred`
    pub fn position<F>(&self, pred: F) -> Option<usize>
    where
        F: Fn(&Access) -> bool,
    {
        self.log.borrow().iter().position(pred)
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
        *self.overflowed.borrow_mut() = false;
    }

    /// `true` if writes were dropped because the log was full
    pub fn log_overflowed(&self) -> bool {
        *self.overflowed.borrow()
    }

    fn record(&self, addr: usize, width: u8, value: u64) {
        let mut memory = self.memory.borrow_mut();
        memory.write(addr, width, value);

        if self.log.borrow_mut().push(Access { addr, width, value }).is_err() {
            *self.overflowed.borrow_mut() = true;
        }

        for hook in &self.hooks {
            hook(&mut memory, addr);
        }
    }
}

// SAFETY: Every access is one operation on the simulated memory
unsafe impl Mmio for SimBus {
    fn read32(&self, addr: usize) -> u32 {
        self.memory.borrow().read32(addr)
    }

    fn write32(&self, addr: usize, val: u32) {
        self.record(addr, 4, val as u64);
    }

    fn read8(&self, addr: usize) -> u8 {
        self.memory.borrow().read8(addr)
    }

    fn write8(&self, addr: usize, val: u8) {
        self.record(addr, 1, val as u64);
    }

    fn write16(&self, addr: usize, val: u16) {
        self.record(addr, 2, val as u64);
    }

    fn write64(&self, addr: usize, val: u64) {
        self.record(addr, 8, val);
    }

    /// Panics instead of spinning forever when the simulated hardware never
    /// reports the condition
    fn poll<F>(&self, mut done: F)
    where
        F: FnMut() -> bool,
    {
        for _ in 0..POLL_LIMIT {
            if done() {
                return;
            }
        }

        panic!("simulated hardware never asserted the polled condition");
    }
}

/// Stock hardware fakes
pub mod models {
    use super::SimMemory;
    use crate::memory_map::{FLASH_MEM_INTERFACE_BASE, RCC_BASE, RTC_BASE};
    use crate::{flash, rcc, rtc};

    /// Oscillator ready flags follow their enable bits
    pub fn rcc_oscillators(mem: &mut SimMemory, addr: usize) {
        for osc in rcc::Oscillator::ALL {
            let bits = osc.bits();

            if addr != RCC_BASE + bits.reg {
                continue;
            }

            if mem.read32(addr) & bits.on != 0 {
                mem.set_bits32(addr, bits.rdy);
            } else {
                mem.clear_bits32(addr, bits.rdy);
            }
        }
    }

    /// `CFGR.SWS` follows `CFGR.SW`
    pub fn rcc_sysclk_switch(mem: &mut SimMemory, addr: usize) {
        let cfgr = RCC_BASE + rcc::regs::CFGR;
        if addr != cfgr {
            return;
        }

        let val = mem.read32(cfgr);
        let sw = val & rcc::cfgr::SW_MASK;
        mem.write32(
            cfgr,
            (val & !(rcc::cfgr::SW_MASK << rcc::cfgr::SWS_SHIFT)) | (sw << rcc::cfgr::SWS_SHIFT),
        );
    }

    /// Key register sequences drive `CR.LOCK` and `OPTCR.OPTLOCK`
    ///
    /// While locked, `KEY1` followed by `KEY2` unlocks. Any other value resets
    /// the sequence. A key write while unlocked locks again.
    pub fn flash_keys(mem: &mut SimMemory, addr: usize) {
        let keyr = FLASH_MEM_INTERFACE_BASE + flash::regs::KEYR;
        let optkeyr = FLASH_MEM_INTERFACE_BASE + flash::regs::OPTKEYR;

        if addr == keyr {
            key_sequence(
                mem,
                keyr,
                FLASH_MEM_INTERFACE_BASE + flash::regs::CR,
                flash::cr::LOCK,
                flash::KEY1,
                flash::KEY2,
            );
        } else if addr == optkeyr {
            key_sequence(
                mem,
                optkeyr,
                FLASH_MEM_INTERFACE_BASE + flash::regs::OPTCR,
                flash::optcr::OPTLOCK,
                flash::OPT_KEY1,
                flash::OPT_KEY2,
            );
        }
    }

    fn key_sequence(mem: &mut SimMemory, keyr: usize, lock_reg: usize, lock: u32, k1: u32, k2: u32) {
        let key = mem.read32(keyr);

        if mem.read32(lock_reg) & lock == 0 {
            mem.set_bits32(lock_reg, lock);
            mem.set_latch(keyr, 0);
            return;
        }

        match (mem.latch(keyr), key) {
            (0, k) if k == k1 => mem.set_latch(keyr, 1),
            (1, k) if k == k2 => {
                mem.clear_bits32(lock_reg, lock);
                mem.set_latch(keyr, 0);
            }
            _ => mem.set_latch(keyr, 0),
        }
    }

    /// `INITF` follows `INIT`, `RSF` is set again as soon as it is cleared and
    /// `WUTWF` is set while the wakeup timer is disabled
    pub fn rtc_init_mode(mem: &mut SimMemory, addr: usize) {
        let isr = RTC_BASE + rtc::regs::ISR;
        let cr = RTC_BASE + rtc::regs::CR;

        if addr == isr {
            let val = mem.read32(isr);

            if val & rtc::isr::INIT != 0 {
                mem.set_bits32(isr, rtc::isr::INITF);
            } else {
                mem.clear_bits32(isr, rtc::isr::INITF);
            }

            if val & rtc::isr::RSF == 0 {
                mem.set_bits32(isr, rtc::isr::RSF);
            }
        } else if addr == cr {
            if mem.read32(cr) & rtc::cr::WUTE == 0 {
                mem.set_bits32(isr, rtc::isr::WUTWF);
            } else {
                mem.clear_bits32(isr, rtc::isr::WUTWF);
            }
        }
    }
}
