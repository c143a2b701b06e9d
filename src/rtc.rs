//! Real-time clock
//!
//! The RTC lives in the backup domain. Its registers only accept writes after
//! [`crate::pwr::Pwr::disable_backup_domain_write_protection`], and most of
//! them also need the RTC's own write protection lifted with [`Rtc::unlock`].
//! The calendar is kept in BCD. [`Rtc::set_date`] and [`Rtc::set_time`] take
//! binary or BCD input and run the whole init-mode sequence.

use crate::memory_map::RTC_BASE;
use crate::mmio::Mmio;
use crate::ValueError;
use num_enum::{FromPrimitive, IntoPrimitive};

/// Register offsets
pub mod regs {
    pub const TR: usize = 0x00;
    pub const DR: usize = 0x04;
    pub const CR: usize = 0x08;
    pub const ISR: usize = 0x0C;
    pub const PRER: usize = 0x10;
    pub const WUTR: usize = 0x14;
    pub const ALRMAR: usize = 0x1C;
    pub const ALRMBR: usize = 0x20;
    pub const WPR: usize = 0x24;
    pub const SSR: usize = 0x28;
    pub const TAFCR: usize = 0x40;
    pub const BKP0R: usize = 0x50;
}

/// `RTC_ISR` bits
pub mod isr {
    pub const ALRAWF: u32 = 1 << 0;
    pub const ALRBWF: u32 = 1 << 1;
    pub const WUTWF: u32 = 1 << 2;
    pub const SHPF: u32 = 1 << 3;
    pub const INITS: u32 = 1 << 4;
    pub const RSF: u32 = 1 << 5;
    pub const INITF: u32 = 1 << 6;
    pub const INIT: u32 = 1 << 7;
    pub const ALRAF: u32 = 1 << 8;
    pub const ALRBF: u32 = 1 << 9;
    pub const WUTF: u32 = 1 << 10;
    pub const TSF: u32 = 1 << 11;
    pub const TSOVF: u32 = 1 << 12;
    pub const TAMP1F: u32 = 1 << 13;
    pub const TAMP2F: u32 = 1 << 14;
    pub const RECALPF: u32 = 1 << 16;
}

/// `RTC_CR` bits
pub mod cr {
    pub const WUCKSEL_SHIFT: u32 = 0;
    pub const WUCKSEL_MASK: u32 = 0b111;
    pub const BYPSHAD: u32 = 1 << 5;
    pub const FMT: u32 = 1 << 6;
    pub const ALRAE: u32 = 1 << 8;
    pub const ALRBE: u32 = 1 << 9;
    pub const WUTE: u32 = 1 << 10;
    pub const TSE: u32 = 1 << 11;
    pub const ALRAIE: u32 = 1 << 12;
    pub const ALRBIE: u32 = 1 << 13;
    pub const WUTIE: u32 = 1 << 14;
    pub const TSIE: u32 = 1 << 15;
}

/// `RTC_PRER` fields
pub mod prer {
    pub const PREDIV_S_SHIFT: u32 = 0;
    pub const PREDIV_S_MASK: u32 = 0x7FFF;
    pub const PREDIV_A_SHIFT: u32 = 16;
    pub const PREDIV_A_MASK: u32 = 0x7F;
}

/// `RTC_TAFCR` bits
pub mod tafcr {
    pub const TAMPIE: u32 = 1 << 2;
}

/// Write protection keys
pub const WPR_KEY1: u32 = 0xCA;
pub const WPR_KEY2: u32 = 0x53;
pub const WPR_LOCK: u32 = 0xFF;

/// Defined `ISR` bits below the read-only RECALPF. Writing ones leaves the
/// flags alone, reserved bits are written as zero.
const ISR_WRITABLE: u32 = isr::ALRAWF
    | isr::ALRBWF
    | isr::WUTWF
    | isr::SHPF
    | isr::INITS
    | isr::RSF
    | isr::INITF
    | isr::INIT
    | isr::ALRAF
    | isr::ALRBF
    | isr::WUTF
    | isr::TSF
    | isr::TSOVF
    | isr::TAMP1F
    | isr::TAMP2F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Weekday {
    /// 0 is forbidden and reads back as Monday
    #[default]
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

/// Encoding of the values passed to [`Rtc::set_date`] and [`Rtc::set_time`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Format {
    Binary,
    Bcd,
}

/// `CR.FMT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourFormat {
    H24,
    AmPm,
}

/// Wakeup timer clock, `CR.WUCKSEL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WakeupClock {
    RtcDiv16 = 0b000,
    RtcDiv8 = 0b001,
    RtcDiv4 = 0b010,
    RtcDiv2 = 0b011,
    /// ck_spre, usually 1 Hz
    CkSpre = 0b100,
    /// ck_spre with 2^16 added to the counter value
    CkSpreExtended = 0b110,
}

/// Calendar date
///
/// `year` is the year within the century: 21 for 2021.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: Weekday,
}

/// Time of day. `pm` only matters in [`HourFormat::AmPm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub pm: bool,
}

/// RTC interrupt sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    TimeStamp,
    Wakeup,
    AlarmB,
    AlarmA,
    Tamper,
}

struct InterruptBits {
    enable_reg: usize,
    enable: u32,
    pending: u32,
}

impl Interrupt {
    const fn bits(self) -> InterruptBits {
        let (enable_reg, enable, pending) = match self {
            Self::TimeStamp => (regs::CR, cr::TSIE, isr::TSF),
            Self::Wakeup => (regs::CR, cr::WUTIE, isr::WUTF),
            Self::AlarmB => (regs::CR, cr::ALRBIE, isr::ALRBF),
            Self::AlarmA => (regs::CR, cr::ALRAIE, isr::ALRAF),
            Self::Tamper => (regs::TAFCR, tafcr::TAMPIE, isr::TAMP1F),
        };

        InterruptBits {
            enable_reg,
            enable,
            pending,
        }
    }
}

pub struct Rtc<B: Mmio> {
    bus: B,
    base: usize,
}

impl<B: Mmio> Rtc<B> {
    pub fn new(bus: B) -> Self {
        Self::with_base(bus, RTC_BASE)
    }

    pub fn with_base(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// Lifts the register write protection
    pub fn unlock(&self) {
        self.bus.write32(self.reg(regs::WPR), WPR_KEY1);
        self.bus.write32(self.reg(regs::WPR), WPR_KEY2);
    }

    pub fn lock(&self) {
        self.bus.write32(self.reg(regs::WPR), WPR_LOCK);
    }

    pub fn set_init_flag(&self) {
        self.bus.set_bits32(self.reg(regs::ISR), isr::INIT);
    }

    pub fn clear_init_flag(&self) {
        self.bus.clear_bits32(self.reg(regs::ISR), isr::INIT);
    }

    pub fn is_init_ready(&self) -> bool {
        self.bus.is_set32(self.reg(regs::ISR), isr::INITF)
    }

    pub fn wait_for_init_ready(&self) {
        self.bus.poll(|| self.is_init_ready());
    }

    /// Waits until the calendar shadow registers are synchronised again
    pub fn wait_for_synchro(&self) {
        self.unlock();

        self.bus.clear_bits32(self.reg(regs::ISR), isr::RSF);
        self.bus
            .poll(|| self.bus.is_set32(self.reg(regs::ISR), isr::RSF));

        self.lock();
    }

    /// Sets the synchronous and asynchronous prescalers
    ///
    /// The register needs two separate writes, even when only one field
    /// changes. Values are truncated to their field width. Only valid in init
    /// mode.
    pub fn set_prescaler(&self, sync: u32, asynch: u32) {
        let prer = self.reg(regs::PRER);

        self.bus.write32(prer, (sync & prer::PREDIV_S_MASK) << prer::PREDIV_S_SHIFT);
        self.bus.modify32(prer, |r| {
            r | ((asynch & prer::PREDIV_A_MASK) << prer::PREDIV_A_SHIFT)
        });
    }

    /// Reprograms the wakeup timer and starts it
    ///
    /// The timer is stopped first, and the counter is only written once the
    /// hardware allows it (`WUTWF`).
    pub fn set_wakeup_time(&self, wakeup_time: u16, clock: WakeupClock) {
        let cr_addr = self.reg(regs::CR);
        let sel = u8::from(clock) as u32;

        self.bus.clear_bits32(cr_addr, cr::WUTE);
        self.bus
            .poll(|| self.bus.is_set32(self.reg(regs::ISR), isr::WUTWF));

        self.bus.write32(self.reg(regs::WUTR), wakeup_time as u32);
        self.bus.modify32(cr_addr, |mut r| {
            set_u32!(r, sel, cr::WUCKSEL_MASK, cr::WUCKSEL_SHIFT);
            r
        });
        self.bus.set_bits32(cr_addr, cr::WUTE);
    }

    /// Call this first in the wakeup interrupt handler
    pub fn clear_wakeup_flag(&self) {
        self.bus.clear_bits32(self.reg(regs::ISR), isr::WUTF);
    }

    pub fn enable_bypass_shadow_register(&self) {
        self.bus.set_bits32(self.reg(regs::CR), cr::BYPSHAD);
    }

    pub fn disable_bypass_shadow_register(&self) {
        self.bus.clear_bits32(self.reg(regs::CR), cr::BYPSHAD);
    }

    pub fn set_hour_format(&self, format: HourFormat) {
        match format {
            HourFormat::H24 => self.bus.clear_bits32(self.reg(regs::CR), cr::FMT),
            HourFormat::AmPm => self.bus.set_bits32(self.reg(regs::CR), cr::FMT),
        }
    }

    pub fn hour_format(&self) -> HourFormat {
        if self.bus.is_set32(self.reg(regs::CR), cr::FMT) {
            HourFormat::AmPm
        } else {
            HourFormat::H24
        }
    }

    /// Sets the calendar year within the century, `year` in binary
    pub fn set_year(&self, year: u8) {
        let (t, u) = split_bcd(year);
        self.modify_date(|w| w.yt(t).yu(u));
    }

    pub fn set_month(&self, month: u8) {
        let (t, u) = split_bcd(month);
        self.modify_date(|w| w.mt(t).mu(u));
    }

    pub fn set_day(&self, day: u8) {
        let (t, u) = split_bcd(day);
        self.modify_date(|w| w.dt(t).du(u));
    }

    pub fn set_weekday(&self, weekday: Weekday) {
        self.modify_date(|w| w.wdu(weekday));
    }

    /// Writes the calendar fields one by one, `date` in binary
    pub fn set_calendar_date(&self, date: Date) {
        self.set_year(date.year);
        self.set_month(date.month);
        self.set_weekday(date.weekday);
        self.set_day(date.day);
    }

    /// Sets the hour in binary. `pm` selects the afternoon in 12 hour format.
    pub fn set_hour(&self, hour: u8, pm: bool) {
        let (t, u) = split_bcd(hour);
        self.modify_time(|w| w.pm(pm).ht(t).hu(u));
    }

    pub fn set_minute(&self, minute: u8) {
        let (t, u) = split_bcd(minute);
        self.modify_time(|w| w.mnt(t).mnu(u));
    }

    pub fn set_second(&self, second: u8) {
        let (t, u) = split_bcd(second);
        self.modify_time(|w| w.st(t).su(u));
    }

    /// Writes the time fields one by one, `time` in binary
    pub fn set_calendar_time(&self, time: Time) {
        self.set_hour(time.hour, time.pm);
        self.set_minute(time.minute);
        self.set_second(time.second);
    }

    /// Sets the date through init mode and waits for the shadow registers
    ///
    /// In binary format a month of `0x10`, `0x11` or `0x12` is taken as
    /// October to December.
    pub fn set_date(&self, format: Format, date: Date) -> Result<(), ValueError> {
        let bcd = match format {
            Format::Binary => {
                let mut month = date.month;
                if month & 0x10 == 0x10 {
                    month = (month & !0x10) + 0x0A;
                }

                check_date(date.year, month, date.day)?;

                Date {
                    year: dec_to_bcd(date.year),
                    month: dec_to_bcd(month),
                    day: dec_to_bcd(date.day),
                    weekday: date.weekday,
                }
            }
            Format::Bcd => {
                check_date(
                    bcd_to_dec(date.year)?,
                    bcd_to_dec(date.month)?,
                    bcd_to_dec(date.day)?,
                )?;

                date
            }
        };

        let mut w = DateW::reset();
        w.yt(bcd.year >> 4)
            .yu(bcd.year & 0xF)
            .wdu(bcd.weekday)
            .mt(bcd.month >> 4)
            .mu(bcd.month & 0xF)
            .dt(bcd.day >> 4)
            .du(bcd.day & 0xF);

        #[cfg(feature = "defmt")]
        defmt::debug!("rtc set date {=u32:#x}", w.bits());

        self.write_in_init_mode(regs::DR, w.bits());

        Ok(())
    }

    /// Sets the time through init mode and waits for the shadow registers
    pub fn set_time(&self, format: Format, time: Time) -> Result<(), ValueError> {
        let am_pm = self.hour_format() == HourFormat::AmPm;

        let bcd = match format {
            Format::Binary => {
                check_time(time.hour, time.minute, time.second, am_pm)?;

                Time {
                    hour: dec_to_bcd(time.hour),
                    minute: dec_to_bcd(time.minute),
                    second: dec_to_bcd(time.second),
                    pm: time.pm,
                }
            }
            Format::Bcd => {
                check_time(
                    bcd_to_dec(time.hour)?,
                    bcd_to_dec(time.minute)?,
                    bcd_to_dec(time.second)?,
                    am_pm,
                )?;

                time
            }
        };

        let mut w = TimeW::reset();
        w.pm(bcd.pm)
            .ht(bcd.hour >> 4)
            .hu(bcd.hour & 0xF)
            .mnt(bcd.minute >> 4)
            .mnu(bcd.minute & 0xF)
            .st(bcd.second >> 4)
            .su(bcd.second & 0xF);

        #[cfg(feature = "defmt")]
        defmt::debug!("rtc set time {=u32:#x}", w.bits());

        self.write_in_init_mode(regs::TR, w.bits());

        Ok(())
    }

    /// Current date in binary
    pub fn get_date(&self) -> Date {
        let r = DateR::read_from(&self.bus, self.base);

        Date {
            year: r.yt() * 10 + r.yu(),
            month: r.mt() * 10 + r.mu(),
            day: r.dt() * 10 + r.du(),
            weekday: r.wdu(),
        }
    }

    /// Current time in binary
    pub fn get_time(&self) -> Time {
        let r = TimeR::read_from(&self.bus, self.base);

        Time {
            hour: r.ht() * 10 + r.hu(),
            minute: r.mnt() * 10 + r.mnu(),
            second: r.st() * 10 + r.su(),
            pm: r.pm(),
        }
    }

    /// Sets the hour format and the prescalers, then leaves init mode locked
    pub fn init(&self, format: HourFormat, sync: u32, asynch: u32) {
        #[cfg(feature = "defmt")]
        defmt::debug!("rtc init, prescalers {}/{}", sync, asynch);

        self.unlock();
        self.set_init_flag();
        self.wait_for_init_ready();

        self.set_hour_format(format);
        self.set_prescaler(sync, asynch);

        self.clear_init_flag();
        self.lock();
    }

    pub fn isr_read(&self) -> u32 {
        self.bus.read32(self.reg(regs::ISR))
    }

    /// `true` if any of `flags` (`isr` bits) is set
    pub fn flag_status(&self, flags: u32) -> bool {
        self.isr_read() & flags != 0
    }

    /// Clears the flags selected by `op`, leaving init mode as it is
    ///
    /// ```ignore
    /// rtc.clear(|c| c.wutf().alraf());
    /// ```
    pub fn clear<F>(&self, op: F)
    where
        F: for<'w> FnOnce(&'w mut RtcClear) -> &'w mut RtcClear,
    {
        let mut c = RtcClear::new();
        op(&mut c);

        self.clear_isr_bits(c.bits());
    }

    fn clear_isr_bits(&self, bits: u32) {
        let isr_addr = self.reg(regs::ISR);
        let init = self.bus.read32(isr_addr) & isr::INIT;

        self.bus
            .write32(isr_addr, (!(bits | isr::INIT) & ISR_WRITABLE) | init);
    }

    pub fn interrupt_enable(&self, it: Interrupt) {
        let bits = it.bits();

        self.unlock();
        self.bus.set_bits32(self.reg(bits.enable_reg), bits.enable);
        self.lock();
    }

    pub fn interrupt_disable(&self, it: Interrupt) {
        let bits = it.bits();

        self.unlock();
        self.bus.clear_bits32(self.reg(bits.enable_reg), bits.enable);
        self.lock();
    }

    /// Enabled and flagged
    pub fn is_interrupt_pending(&self, it: Interrupt) -> bool {
        let bits = it.bits();

        self.bus.is_set32(self.reg(bits.enable_reg), bits.enable)
            && self.flag_status(bits.pending)
    }

    pub fn clear_interrupt_pending(&self, it: Interrupt) {
        self.clear_isr_bits(it.bits().pending);
    }

    fn write_in_init_mode(&self, offset: usize, val: u32) {
        self.unlock();
        self.set_init_flag();
        self.wait_for_init_ready();

        self.bus.write32(self.reg(offset), val);

        self.clear_init_flag();
        self.lock();

        self.wait_for_synchro();
    }

    fn modify_date<F>(&self, op: F)
    where
        F: for<'w> FnOnce(&'w mut DateW) -> &'w mut DateW,
    {
        let dr = self.reg(regs::DR);
        let mut w = DateW::from_bits(self.bus.read32(dr));
        op(&mut w);

        self.bus.write32(dr, w.bits());
    }

    fn modify_time<F>(&self, op: F)
    where
        F: for<'w> FnOnce(&'w mut TimeW) -> &'w mut TimeW,
    {
        let tr = self.reg(regs::TR);
        let mut w = TimeW::from_bits(self.bus.read32(tr));
        op(&mut w);

        self.bus.write32(tr, w.bits());
    }
}

const fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}

fn bcd_to_dec(bcd: u8) -> Result<u8, ValueError> {
    let (t, u) = (bcd >> 4, bcd & 0xF);

    if t > 9 || u > 9 {
        return value_error!("Not a BCD value");
    }

    Ok(t * 10 + u)
}

/// Tens and units of a binary value
const fn split_bcd(dec: u8) -> (u8, u8) {
    let bcd = dec_to_bcd(dec);
    (bcd >> 4, bcd & 0xF)
}

fn check_date(year: u8, month: u8, day: u8) -> Result<(), ValueError> {
    if year > 99 {
        return value_error!("Year must be in range of [0, 99]");
    }

    if !(1..=12).contains(&month) {
        return value_error!("Month must be in range of [1, 12]");
    }

    if !(1..=31).contains(&day) {
        return value_error!("Day must be in range of [1, 31]");
    }

    Ok(())
}

fn check_time(hour: u8, minute: u8, second: u8, am_pm: bool) -> Result<(), ValueError> {
    if am_pm {
        if !(1..=12).contains(&hour) {
            return value_error!("Hour must be in range of [1, 12]");
        }
    } else if hour > 23 {
        return value_error!("Hour must be in range of [0, 23]");
    }

    if minute > 59 {
        return value_error!("Minute must be in range of [0, 59]");
    }

    if second > 59 {
        return value_error!("Second must be in range of [0, 59]");
    }

    Ok(())
}

config_reg_u32! {
    RW, DateR, DateW, regs::DR, [
        du => (u8, u8, [3:0], "Date units"),
        dt => (u8, u8, [5:4], "Date tens"),
        mu => (u8, u8, [11:8], "Month units"),
        mt => (u8, u8, [12:12], "Month tens"),
        wdu => (Weekday, u8, [15:13], "Week day"),
        yu => (u8, u8, [19:16], "Year units"),
        yt => (u8, u8, [23:20], "Year tens"),
    ]
}

config_reg_u32! {
    RW, TimeR, TimeW, regs::TR, [
        su => (u8, u8, [3:0], "Second units"),
        st => (u8, u8, [6:4], "Second tens"),
        mnu => (u8, u8, [11:8], "Minute units"),
        mnt => (u8, u8, [14:12], "Minute tens"),
        hu => (u8, u8, [19:16], "Hour units"),
        ht => (u8, u8, [21:20], "Hour tens"),
        pm => (bool, bool, [22:22], "PM in 12 hour format"),
    ]
}

clear_status_reg_u32! {
    RtcClear, [
        rsf => (5, "Registers synchronization flag"),
        alraf => (8, "Alarm A flag"),
        alrbf => (9, "Alarm B flag"),
        wutf => (10, "Wakeup timer flag"),
        tsf => (11, "Time-stamp flag"),
        tsovf => (12, "Time-stamp overflow flag"),
        tamp1f => (13, "Tamper 1 flag"),
        tamp2f => (14, "Tamper 2 flag"),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimBus;

    const WPR: usize = RTC_BASE + regs::WPR;
    const ISR: usize = RTC_BASE + regs::ISR;
    const CR: usize = RTC_BASE + regs::CR;
    const DR: usize = RTC_BASE + regs::DR;
    const TR: usize = RTC_BASE + regs::TR;

    #[test]
    fn write_protection_keys() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.unlock();
        rtc.lock();

        let keys: heapless::Vec<u64, 4> = sim.writes_to(WPR).iter().map(|a| a.value).collect();
        assert_eq!(keys.as_slice(), &[0xCA, 0x53, 0xFF]);
    }

    #[test]
    /// Unlock, init mode, format, two prescaler writes, leave init mode, lock
    fn init_sequence() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);

        rtc.init(HourFormat::AmPm, 255, 127);

        let writes = sim.writes();
        assert_eq!(writes[0].addr, WPR);
        assert_eq!(writes[1].addr, WPR);
        assert_eq!(writes[2].addr, ISR);
        assert_ne!(writes[2].value as u32 & isr::INIT, 0);

        let prer: heapless::Vec<u64, 4> = sim
            .writes_to(RTC_BASE + regs::PRER)
            .iter()
            .map(|a| a.value)
            .collect();
        assert_eq!(prer.as_slice(), &[255, 255 | (127 << 16)]);

        let last = writes[writes.len() - 1];
        assert_eq!((last.addr, last.value), (WPR, 0xFF));
        assert_eq!(sim.peek32(ISR) & (isr::INIT | isr::INITF), 0);
        assert_eq!(rtc.hour_format(), HourFormat::AmPm);
    }

    #[test]
    fn prescaler_fields_are_truncated() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.set_prescaler(0xFFFF_FFFF, 0xFF);

        assert_eq!(sim.peek32(RTC_BASE + regs::PRER), 0x007F_7FFF);
    }

    #[test]
    fn set_date_binary() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);
        let date = Date {
            year: 24,
            month: 3,
            day: 15,
            weekday: Weekday::Friday,
        };

        assert_eq!(rtc.set_date(Format::Binary, date), Ok(()));

        let dr = sim.writes_to(DR);
        assert_eq!(dr.len(), 1);
        assert_eq!(dr[0].value, 0x0024_A315);
        assert_eq!(rtc.get_date(), date);

        // INIT was set before and cleared after the write
        let dr_at = sim.position(|a| a.addr == DR).unwrap();
        let init_at = sim
            .position(|a| a.addr == ISR && a.value as u32 & isr::INIT != 0)
            .unwrap();
        assert!(init_at < dr_at);
        assert_eq!(sim.peek32(ISR) & isr::INIT, 0);
    }

    #[test]
    fn set_date_bcd_matches_binary() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);

        rtc.set_date(
            Format::Bcd,
            Date {
                year: 0x99,
                month: 0x12,
                day: 0x31,
                weekday: Weekday::Sunday,
            },
        )
        .unwrap();

        assert_eq!(
            rtc.get_date(),
            Date {
                year: 99,
                month: 12,
                day: 31,
                weekday: Weekday::Sunday,
            }
        );
    }

    #[test]
    /// Months written as 0x10..=0x12 in binary mean October to December
    fn binary_month_hex_alias() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);

        for (given, month) in [(0x10, 10), (0x11, 11), (0x12, 12)] {
            let date = Date {
                year: 1,
                month: given,
                day: 1,
                weekday: Weekday::Monday,
            };
            rtc.set_date(Format::Binary, date).unwrap();

            assert_eq!(rtc.get_date().month, month);
        }
    }

    #[test]
    fn set_date_rejects_invalid() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);
        let date = Date {
            year: 0,
            month: 1,
            day: 1,
            weekday: Weekday::Monday,
        };

        assert!(rtc.set_date(Format::Binary, Date { day: 32, ..date }).is_err());
        assert!(rtc.set_date(Format::Binary, Date { month: 13, ..date }).is_err());
        assert!(rtc.set_date(Format::Binary, Date { year: 100, ..date }).is_err());
        assert_eq!(
            rtc.set_date(Format::Bcd, Date { day: 0x1A, ..date }),
            Err(ValueError("Not a BCD value"))
        );

        assert!(sim.writes().is_empty());
    }

    #[test]
    fn set_time_24h() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);
        let time = Time {
            hour: 23,
            minute: 59,
            second: 7,
            pm: false,
        };

        rtc.set_time(Format::Binary, time).unwrap();

        assert_eq!(sim.writes_to(TR)[0].value, 0x0023_5907);
        assert_eq!(rtc.get_time(), time);

        rtc.set_time(Format::Bcd, Time { hour: 0x08, minute: 0x30, second: 0, pm: false })
            .unwrap();
        assert_eq!(rtc.get_time().hour, 8);
        assert_eq!(rtc.get_time().minute, 30);
    }

    #[test]
    fn set_time_12h() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);
        rtc.set_hour_format(HourFormat::AmPm);

        let time = Time {
            hour: 11,
            minute: 0,
            second: 0,
            pm: true,
        };
        rtc.set_time(Format::Binary, time).unwrap();

        assert_ne!(sim.peek32(TR) & (1 << 22), 0);
        assert_eq!(rtc.get_time(), time);

        assert_eq!(
            rtc.set_time(Format::Binary, Time { hour: 13, ..time }),
            Err(ValueError("Hour must be in range of [1, 12]"))
        );
        assert!(rtc.set_time(Format::Binary, Time { hour: 0, ..time }).is_err());
    }

    #[test]
    fn calendar_setters() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.set_calendar_date(Date {
            year: 21,
            month: 7,
            day: 4,
            weekday: Weekday::Sunday,
        });
        assert_eq!(sim.peek32(DR), 0x0021_E704);

        rtc.set_month(11);
        assert_eq!(sim.peek32(DR), 0x0021_F104);

        rtc.set_calendar_time(Time {
            hour: 9,
            minute: 41,
            second: 0,
            pm: true,
        });
        assert_eq!(sim.peek32(TR), 0x0049_4100);
    }

    #[test]
    /// Counter written only once the timer is stopped and WUTWF is up
    fn wakeup_sequence() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);
        sim.preload32(CR, cr::WUTE | 0b111);

        rtc.set_wakeup_time(0x1234, WakeupClock::CkSpre);

        let writes = sim.writes();
        assert_eq!(writes[0].addr, CR);
        assert_eq!(writes[0].value as u32 & cr::WUTE, 0);
        assert_eq!(writes[1].addr, RTC_BASE + regs::WUTR);
        assert_eq!(writes[1].value, 0x1234);

        let cr_val = sim.peek32(CR);
        assert_eq!(cr_val & cr::WUCKSEL_MASK, 0b100);
        assert_ne!(cr_val & cr::WUTE, 0);
    }

    #[test]
    #[should_panic(expected = "never asserted")]
    fn wakeup_waits_for_write_flag() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.set_wakeup_time(1, WakeupClock::RtcDiv16);
    }

    #[test]
    fn synchro_clears_rsf_unlocked() {
        let sim = SimBus::with_device_models();
        let rtc = Rtc::new(&sim);
        sim.preload32(ISR, isr::RSF);

        rtc.wait_for_synchro();

        let writes = sim.writes();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[2].addr, ISR);
        assert_eq!(writes[2].value as u32 & isr::RSF, 0);
        assert_eq!((writes[3].addr, writes[3].value), (WPR, 0xFF));
        assert!(rtc.flag_status(isr::RSF));
    }

    #[test]
    /// Zeros clear, INIT is kept as it was
    fn clear_flags_keeps_init() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        sim.preload32(ISR, isr::INIT | isr::WUTF | isr::ALRAF);
        rtc.clear(|c| c.wutf());
        assert_eq!(sim.writes_to(ISR)[0].value, 0x7BFF);

        sim.preload32(ISR, isr::WUTF);
        rtc.clear(|c| c.wutf().tsf());
        assert_eq!(sim.writes_to(ISR)[1].value, 0x737F);
    }

    #[test]
    /// Bit 15 and 17 up are reserved, bit 16 is read-only
    fn clear_flags_leave_reserved_zero() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.clear(|c| c.alraf());
        rtc.clear_interrupt_pending(Interrupt::TimeStamp);

        for w in sim.writes_to(ISR) {
            assert_eq!(w.value as u32 & !0x7FFF, 0);
        }
    }

    #[test]
    fn wakeup_flag() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        sim.preload32(ISR, isr::WUTF | isr::RSF);
        assert!(rtc.flag_status(isr::WUTF));

        rtc.clear_wakeup_flag();
        assert!(!rtc.flag_status(isr::WUTF));
        assert!(rtc.flag_status(isr::RSF));
    }

    #[test]
    fn interrupts() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.interrupt_enable(Interrupt::Wakeup);
        rtc.interrupt_enable(Interrupt::Tamper);
        assert_eq!(sim.peek32(CR), cr::WUTIE);
        assert_eq!(sim.peek32(RTC_BASE + regs::TAFCR), tafcr::TAMPIE);

        sim.preload32(ISR, isr::WUTF | isr::ALRAF);
        assert!(rtc.is_interrupt_pending(Interrupt::Wakeup));
        // Flagged but not enabled
        assert!(!rtc.is_interrupt_pending(Interrupt::AlarmA));

        rtc.clear_interrupt_pending(Interrupt::Wakeup);
        assert!(!rtc.is_interrupt_pending(Interrupt::Wakeup));

        rtc.interrupt_disable(Interrupt::Tamper);
        assert_eq!(sim.peek32(RTC_BASE + regs::TAFCR), 0);

        // Every enable is wrapped in unlock and lock
        let keys = sim.writes_to(WPR);
        assert_eq!(keys.len(), 9);
        assert_eq!(keys[8].value, 0xFF);
    }

    #[test]
    fn bypass_shadow() {
        let sim = SimBus::new();
        let rtc = Rtc::new(&sim);

        rtc.enable_bypass_shadow_register();
        assert_eq!(sim.peek32(CR), cr::BYPSHAD);

        rtc.disable_bypass_shadow_register();
        assert_eq!(sim.peek32(CR), 0);
    }
}
