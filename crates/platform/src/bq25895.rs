//! BQ25895 USB-C charger: register map and [`PowerMonitor`] driver.
//!
//! The sleep manager only needs "is VBUS present" (sleep veto) and, when
//! power logging is on, battery millivolts and charge state. Every register
//! read is retried because the charger shares its I²C bus with the touch
//! controller, which can hold the bus briefly after an interrupt.
//!
//! Reference: Texas Instruments BQ25895 datasheet (SLUSCD3B)

use crate::power::{lipo_percentage, PowerMonitor};

/// 7-bit I2C device address (fixed in silicon, SLUSCD3B §7.5.1).
pub const BQ25895_I2C_ADDR: u8 = crate::config::PMIC_I2C_ADDR;
/// REG00: Input source control (IINLIM, VINDPM_OS).
pub const REG00_INPUT_SOURCE: u8 = 0x00;
/// REG01: Power-on configuration (WD_RST, CHG_CONFIG, SYS_MIN, MIN_VBAT_SEL).
pub const REG01_POWER_ON_CONFIG: u8 = 0x01;
/// REG02: Charge current control (BOOST_FREQ, ICO_EN, FORCE_DPDM, AUTO_DPDM_EN, HVDCP_EN, MAXC_EN, FORCE_ICO, ICHG).
pub const REG02_CHARGE_CURRENT: u8 = 0x02;
/// REG03: Pre-charge / termination current control (IPRECHG, ITERM).
pub const REG03_PRECHARGE_TERM: u8 = 0x03;
/// REG04: Charge voltage control (VREG, BATLOWV, VRECHG).
pub const REG04_CHARGE_VOLTAGE: u8 = 0x04;
/// REG05: Charge termination / timer control (EN_TERM, WATCHDOG, EN_TIMER, CHG_TIMER, TREG).
pub const REG05_CHARGE_TIMER: u8 = 0x05;
/// REG06: IR compensation / thermal regulation control (BAT_COMP, VCLAMP, TREG).
pub const REG06_IR_COMP: u8 = 0x06;
/// REG07: Miscellaneous operation control (FORCE_VINDPM, TMR2X_EN, BATFET_DIS, JEITA_VSET, BATFET_DLY, BATFET_RST_EN).
pub const REG07_MISC: u8 = 0x07;
/// REG08: BOOST voltage / limi control (BOOSTV, BOOST_LIM).
pub const REG08_BOOST: u8 = 0x08;
/// REG09: Miscellaneous / BATFET full system reset (BATFET_FULL_SYSTEM_RST, …).
pub const REG09_BATFET: u8 = 0x09;
/// REG0A: BOOST mode current limit.
pub const REG0A_BOOST_CURRENT: u8 = 0x0A;
/// REG0B: Status register (VBUS_STAT, CHRG_STAT, PG_STAT, SDP_STAT, VSYS_STAT).
pub const REG0B_STATUS: u8 = 0x0B;
/// REG0C: Fault register (WATCHDOG_FAULT, BOOST_FAULT, CHRG_FAULT, BAT_FAULT, NTC_FAULT).
pub const REG0C_FAULT: u8 = 0x0C;
/// REG0D: VINDPM threshold / Force VINDPM (FORCE_VINDPM, VINDPM).
pub const REG0D_VINDPM: u8 = 0x0D;
/// REG0E: ADC conversion result: battery voltage (THERM_STAT, BATV).
pub const REG0E_BATTERY_VOLTAGE: u8 = 0x0E;
/// REG0F: ADC conversion result: system voltage (SYSV).
pub const REG0F_SYSTEM_VOLTAGE: u8 = 0x0F;
/// REG10: ADC conversion result: thermistor voltage ratio (TSPCT).
pub const REG10_THERMISTOR_VOLTAGE: u8 = 0x10;
/// REG11: ADC conversion result: VBUS voltage (VBUS_GD, VBUSV).
pub const REG11_VBUS_VOLTAGE: u8 = 0x11;
/// REG12: ADC conversion result: charge current (ICHGR).
pub const REG12_CHARGE_CURRENT_ADC: u8 = 0x12;
/// REG13: INDPM status / IDPM limit (VDPM_STAT, IDPM_STAT, IDPM_LIM).
pub const REG13_INDPM_STATUS: u8 = 0x13;
/// REG14: Device revision / PN (REG_RST, ICO_OPTIMIZED, PN, TS_PROFILE, DEV_REV).
pub const REG14_DEVICE_ID: u8 = 0x14;
/// IINLIM field value: 100 mA input current limit (lowest setting).
pub const IINLIM_100MA: u8 = 0b00_0000;
/// IINLIM field value: 3.25 A input current limit (for 3.0 A USB-C).
pub const IINLIM_3250MA: u8 = 0b11_0010;
/// ICHG field value: ~1472 mA charge current (ICHG × 64 mA/LSB).
pub const ICHG_1500MA: u8 = 0b001_0111;
/// VREG field value (pre-shifted): 4.208 V charge voltage (VREG = 23, formula: 3840 + VREG×16 mV).
pub const VREG_4208MV: u8 = 23 << 2;
/// REG01 value: enable charging with OTG disabled (CHG_CONFIG=01, WD_RST=1).
pub const REG01_ENABLE_CHARGING: u8 = (1 << 6) | (1 << 4);
/// REG0B mask for Power Good status bit.
pub const STATUS_PG_MASK: u8 = 1 << 2;
/// REG0B mask for charge status field (CHRG_STAT[1:0]).
pub const STATUS_CHRG_MASK: u8 = 0b11 << 3;
/// REG0B mask for VBUS status field (VBUS_STAT[2:0]).
pub const STATUS_VBUS_MASK: u8 = 0b111 << 5;
/// VBUS_STAT: no input detected.
pub const VBUS_STAT_NO_INPUT: u8 = 0b000 << 5;
/// VBUS_STAT: USB SDP (Standard Downstream Port, 500 mA).
pub const VBUS_STAT_SDP: u8 = 0b001 << 5;
/// VBUS_STAT: USB CDP (Charging Downstream Port, 1.5 A).
pub const VBUS_STAT_CDP: u8 = 0b010 << 5;
/// VBUS_STAT: USB DCP (Dedicated Charging Port, 1.5 A).
pub const VBUS_STAT_DCP: u8 = 0b011 << 5;
/// VBUS_STAT: HVDCP adapter detected.
pub const VBUS_STAT_HVDCP: u8 = 0b100 << 5;
/// VBUS_STAT: Unknown adapter / non-standard.
pub const VBUS_STAT_ADAPTER: u8 = 0b101 << 5;
/// VBUS_STAT: OTG (On-The-Go) mode active.
pub const VBUS_STAT_OTG: u8 = 0b111 << 5;
/// CHRG_STAT: pre-charge (below BATLOWV).
pub const CHRG_STAT_PRECHARGE: u8 = 0b01 << 3;
/// CHRG_STAT: fast charging (CC or CV).
pub const CHRG_STAT_FAST: u8 = 0b10 << 3;
/// CHRG_STAT: charge termination done.
pub const CHRG_STAT_DONE: u8 = 0b11 << 3;
/// REG02 CONV_RATE bit: ADC continuous conversion (1 s period).
pub const REG02_CONV_RATE_CONTINUOUS: u8 = 1 << 6;

/// Attempts per register read before giving up.
pub const READ_ATTEMPTS: u8 = 3;

/// Decode REG0E raw ADC byte to battery voltage in millivolts.
///
/// Formula from SLUSCD3B: V_BAT = 2304 mV + BATV[6:0] × 20 mV.
/// Bit 7 (THERM_STAT) is masked out.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub const fn decode_battery_voltage_mv(raw_adc: u8) -> u32 {
    2304 + (raw_adc as u32 & 0x7F) * 20
}

/// Decode REG11 raw ADC byte to VBUS voltage in millivolts.
///
/// Formula from SLUSCD3B: V_BUS = 2600 mV + VBUSV[6:0] × 100 mV.
/// Bit 7 (VBUS_GD) is masked out.
#[inline]
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub const fn decode_vbus_voltage_mv(raw_adc: u8) -> u32 {
    2600 + (raw_adc as u32 & 0x7F) * 100
}

/// Initialize the BQ25895 PMIC for a single-cell LiPo.
/// Writes: REG00 (3.25A input limit), REG02 (~1472mA charge, ADC continuous),
/// REG04 (4.208V charge voltage), REG01 (enable charging).
/// # Errors
/// Returns Err if any I2C write fails.
pub fn bq25895_init<I>(i2c: &mut I, addr: u8) -> Result<(), I::Error>
where
    I: embedded_hal::i2c::I2c,
{
    i2c.write(addr, &[REG00_INPUT_SOURCE, IINLIM_3250MA])?;
    i2c.write(addr, &[REG02_CHARGE_CURRENT, ICHG_1500MA | REG02_CONV_RATE_CONTINUOUS])?;
    i2c.write(addr, &[REG04_CHARGE_VOLTAGE, VREG_4208MV])?;
    i2c.write(addr, &[REG01_POWER_ON_CONFIG, REG01_ENABLE_CHARGING])?;
    Ok(())
}

/// True if a REG0B status byte reports an input source (anything but
/// "no input" or OTG).
#[inline]
#[must_use]
pub const fn status_has_vbus(status: u8) -> bool {
    let vbus = status & STATUS_VBUS_MASK;
    vbus != VBUS_STAT_NO_INPUT && vbus != VBUS_STAT_OTG
}

/// True if a REG0B status byte reports pre-charge or fast charge.
#[inline]
#[must_use]
pub const fn status_is_charging(status: u8) -> bool {
    let chrg = status & STATUS_CHRG_MASK;
    chrg == CHRG_STAT_PRECHARGE || chrg == CHRG_STAT_FAST
}

/// [`PowerMonitor`] over a BQ25895 on an I²C bus.
pub struct Bq25895Monitor<I> {
    i2c: I,
    addr: u8,
}

impl<I: embedded_hal::i2c::I2c> Bq25895Monitor<I> {
    /// Monitor at the default address.
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, BQ25895_I2C_ADDR)
    }

    /// Monitor at a non-default address.
    pub fn with_address(i2c: I, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Run [`bq25895_init`] on the owned bus.
    pub fn init(&mut self) -> Result<(), I::Error> {
        bq25895_init(&mut self.i2c, self.addr)
    }

    /// Read one register, retrying up to [`READ_ATTEMPTS`] times.
    pub fn read_register(&mut self, reg: u8) -> Option<u8> {
        for _ in 0..READ_ATTEMPTS {
            let mut buf = [0u8; 1];
            if self.i2c.write_read(self.addr, &[reg], &mut buf).is_ok() {
                let [value] = buf;
                return Some(value);
            }
        }
        None
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: embedded_hal::i2c::I2c> PowerMonitor for Bq25895Monitor<I> {
    fn battery_voltage(&mut self) -> Option<u16> {
        let raw = self.read_register(REG0E_BATTERY_VOLTAGE)?;
        u16::try_from(decode_battery_voltage_mv(raw)).ok()
    }

    fn battery_percentage(&mut self) -> Option<u8> {
        self.battery_voltage().map(lipo_percentage)
    }

    fn is_charging(&mut self) -> bool {
        self.read_register(REG0B_STATUS).is_some_and(status_is_charging)
    }

    fn is_usb_connected(&mut self) -> bool {
        self.read_register(REG0B_STATUS).is_some_and(status_has_vbus)
    }
}
