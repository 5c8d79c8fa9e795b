//! Boot sequence for the wrist-watch board.
//!
//! Initialization order (MUST be respected):
//!   1. RCC: HSI → PLL1 system clock, LSI for the RTC/backup domain
//!   2. Backup domain: enable write access (PWR_CR1.DBP) and the RTC APB clock
//!   3. Retained slot: read-and-clear the previous sleep kind
//!   4. PMIC: BQ25895 init (continuous ADC) over I2C2
//!   5. Sleep manager: apply stored settings, register wake lines
//!   6. Embassy executor: spawn input, UI and monitor tasks
//!
//! The retained word must be consumed before any task can run: the monitor
//! task records a new sleep kind on its first halt.

use platform::RetainedSlot;
use sleep_manager::{take_sleep_kind, SleepKind};

/// Ordered list of boot sequence steps for documentation and testing.
///
/// # Correctness Invariants
///
/// - The backup domain must be writable before the retained slot is read,
///   because reading it also clears it.
/// - The retained slot must be consumed before the executor spawns the
///   monitor task.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. RCC: HSI PLL1 @ 400 MHz, LSI for RTC backup domain",
    "2. Backup domain: PWR_CR1.DBP + RCC_APB4ENR.RTCAPBEN",
    "3. Retained slot: read and clear previous sleep kind (RTC_BKP0R)",
    "4. PMIC: BQ25895 continuous ADC on I2C2",
    "5. Sleep manager: settings overlay, wake-line registration",
    "6. Embassy executor: spawn input, ui and monitor tasks",
];

/// Why the board is running its reset vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootReason {
    /// Power-on, or no sleep recorded since the last boot
    ColdBoot,
    /// Woken from Standby by a wake line
    DeepSleepWake,
    /// Reset (watchdog, brown-out, reset pin) while a light sleep was the
    /// last recorded sleep
    ResetDuringLightSleep,
}

impl BootReason {
    /// Classify the sleep kind left in the retained slot.
    pub const fn from_sleep_kind(kind: Option<SleepKind>) -> Self {
        match kind {
            Some(SleepKind::Deep) => Self::DeepSleepWake,
            Some(SleepKind::Light) => Self::ResetDuringLightSleep,
            Some(SleepKind::None) | None => Self::ColdBoot,
        }
    }

    /// Short name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ColdBoot => "cold boot",
            Self::DeepSleepWake => "deep sleep wake",
            Self::ResetDuringLightSleep => "reset after light sleep",
        }
    }
}

/// Consume the retained sleep kind and classify this boot.
///
/// Returns [`BootReason::ColdBoot`] on every later call.
pub fn boot_reason<R: RetainedSlot>(slot: &mut R) -> BootReason {
    let reason = BootReason::from_sleep_kind(take_sleep_kind(slot));
    #[cfg(feature = "defmt")]
    defmt::info!("boot reason: {=str}", reason.as_str());
    #[cfg(feature = "tracing")]
    tracing::info!("boot reason: {}", reason.as_str());
    reason
}

// ── Backup-domain register map ───────────────────────────────────────────────

/// RTC backup register 0 (RTC base 0x5800_4000 + 0x50, RM0433 §46.6.20).
pub const RTC_BKP0R: usize = 0x5800_4050;
/// PWR control register 1 (RM0433 §6.8.1).
pub const PWR_CR1: usize = 0x5802_4800;
/// PWR_CR1.DBP: disable backup-domain write protection.
pub const PWR_CR1_DBP: u32 = 1 << 8;
/// RCC APB4 peripheral clock enable register (RM0433 §8.7.44).
pub const RCC_APB4ENR: usize = 0x5802_44F4;
/// RCC_APB4ENR.RTCAPBEN: RTC register interface clock.
pub const RCC_APB4ENR_RTCAPBEN: u32 = 1 << 16;

// ── RCC clock configuration ───────────────────────────────────────────────────

/// Build the `embassy_stm32::Config` for the watch.
///
/// # Clock Tree (HSI → 400 MHz core)
///
/// HSI (64 MHz) → PLL1 (prediv=4, mul=50) → PLL1_P = 400 MHz (sys)
/// AHB prescaler: DIV2 → 200 MHz
/// APB1/2/3/4:    DIV2 → 100 MHz
/// LSI (32 kHz) → RTC, so the backup registers keep their clock in Standby.
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    config.rcc.hsi = Some(HSIPrescaler::DIV1);
    config.rcc.csi = true;
    config.rcc.ls = LsConfig::default_lsi();

    // HSI (64 MHz) / prediv(4) = 16 MHz → × mul(50) = 800 MHz VCO
    // PLL1_P = VCO / divp(2) = 400 MHz → system clock
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2),
        divq: None,
        divr: None,
    });

    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb3_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.apb4_pre = APBPrescaler::DIV2; // 100 MHz
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

// ── Hardware-only init ────────────────────────────────────────────────────────
//
// Host tests (cargo test -p firmware) never compile or link this module.

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Backup-domain register access. Only compiled for the target.

    use platform::RetainedSlot;

    use super::{PWR_CR1, PWR_CR1_DBP, RCC_APB4ENR, RCC_APB4ENR_RTCAPBEN, RTC_BKP0R};

    /// RTC backup register 0 as the retained sleep-kind slot.
    ///
    /// Survives Standby and system resets while VBAT or VDD is present.
    pub struct BackupRegister {
        _private: (),
    }

    impl BackupRegister {
        /// Unlock the backup domain and return the slot.
        ///
        /// Must run after `embassy_stm32::init()` (RTC clock source selected)
        /// and before any other code touches PWR_CR1.
        #[allow(unsafe_code)]
        pub fn unlock() -> Self {
            // SAFETY: single-threaded boot context; read-modify-write of two
            // always-mapped control registers that nothing else owns yet.
            unsafe {
                let apb4 = core::ptr::read_volatile(RCC_APB4ENR as *const u32);
                core::ptr::write_volatile(RCC_APB4ENR as *mut u32, apb4 | RCC_APB4ENR_RTCAPBEN);
                let cr1 = core::ptr::read_volatile(PWR_CR1 as *const u32);
                core::ptr::write_volatile(PWR_CR1 as *mut u32, cr1 | PWR_CR1_DBP);
            }
            cortex_m::asm::dsb();
            Self { _private: () }
        }
    }

    impl RetainedSlot for BackupRegister {
        #[allow(unsafe_code)]
        fn load(&self) -> u32 {
            // SAFETY: RTC_BKP0R is a plain 32-bit register; access enabled in unlock().
            unsafe { core::ptr::read_volatile(RTC_BKP0R as *const u32) }
        }

        #[allow(unsafe_code)]
        fn store(&mut self, value: u32) {
            // SAFETY: as above; `&mut self` serialises writers.
            unsafe { core::ptr::write_volatile(RTC_BKP0R as *mut u32, value) }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
