//! Driver errors

use thiserror::Error;

/// Errors reported by the driver.
///
/// Bus failures are always fatal and are never retried here.
/// Configuration errors are raised before any register is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Register transport (SPI / I2C / chip select) failed
    #[error("register bus transfer failed")]
    Bus,

    /// Product ID read back from the part does not match
    #[error("unrecognized product id {0:#06x}")]
    UnknownDevice(u16),

    /// Soft reset did not self-clear within the poll budget
    #[error("device did not come out of reset")]
    ResetTimeout,

    /// A requested rate of zero
    #[error("requested rate must be non-zero")]
    ZeroRate,

    /// Frequency or period of zero where a reciprocal is needed
    #[error("frequency must be non-zero")]
    ZeroFrequency,

    /// Reference R divider outside of [1, 2^30]
    #[error("invalid R divider ratio {0}")]
    InvalidRDivider(u32),

    /// Zero-delay feedback output index out of range
    #[error("invalid zero-delay feedback output {0}")]
    InvalidZeroDelaySource(u8),

    /// Zero-delay feedback output rate at or above the supported maximum
    #[error("invalid zero-delay feedback rate {0} Hz")]
    InvalidZeroDelayRate(u64),

    /// DPLL profile TDC source index out of range, or its block is not used
    #[error("invalid DPLL profile TDC source {0}")]
    InvalidTdcSource(u8),

    /// DPLL profile priority does not fit the 5-bit field
    #[error("invalid DPLL profile priority {0}")]
    InvalidPriority(u8),

    /// Monitor hysteresis not one of the supported scales
    #[error("invalid monitor hysteresis scale {0} bp")]
    InvalidHysteresisScale(u32),

    /// Fast acquisition excess bandwidth / timeout / settle not in the device maps
    #[error("invalid fast acquisition setting {0}")]
    InvalidFastAcquisition(u32),

    /// Output driver current not one of the supported values
    #[error("invalid output source current {0} uA")]
    InvalidSourceCurrent(u32),

    /// AUX DPLL rate change limit not one of the supported values
    #[error("invalid AUX DPLL rate change limit {0}")]
    InvalidRateChangeLimit(u32),

    /// AUX DPLL source index out of range
    #[error("invalid AUX DPLL source")]
    InvalidAuxDpllSource,

    /// AUX TDC Mx pin out of range
    #[error("invalid Mx pin {0}")]
    InvalidMxPin(u8),

    /// N-shot burst longer than the 6-bit pulse counter
    #[error("invalid N-shot burst length {0}")]
    InvalidNShotPulses(u8),

    /// NCO frequency above what center + offset can encode
    #[error("NCO frequency {0} Hz out of range")]
    NcoFrequencyOutOfRange(u64),

    /// Free-run tuning word outside of the usable range
    #[error("free-run tuning word out of range")]
    InvalidTuningWord,

    /// No system clock feedback divider lands in the internal PLL band
    #[error("no feedback divider for the system clock PLL")]
    NoSystemClockDivider,

    /// System clock PLL did not lock after calibration
    #[error("system clock PLL unlocked")]
    SystemPllUnlocked,

    /// Clock index out of range or block not enabled in the configuration
    #[error("clock not configured")]
    NotConfigured,

    /// Operation not provided by this clock kind
    #[error("operation not supported by this clock")]
    Unsupported,
}
