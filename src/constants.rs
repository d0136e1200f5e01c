//! Constants

/// Expected PRODUCT_ID register value
pub const PRODUCT_ID: u16 = 0x0121;

/// Number of reference inputs (A, AA, B, BB)
pub const NUM_REFS: usize = 4;

/// Number of DPLL / APLL channels
pub const NUM_PLLS: usize = 2;

/// Number of output dividers (Q0A .. Q1BB)
pub const NUM_OUTPUTS: usize = 10;

/// Outputs below this index belong to DPLL0, the rest to DPLL1
pub const OUTPUTS_PER_PLL0: usize = 6;

/// Number of output driver pairs
pub const NUM_DRIVERS: usize = NUM_OUTPUTS / 2;

/// Number of auxiliary NCOs
pub const NUM_AUX_NCOS: usize = 2;

/// Number of auxiliary TDCs
pub const NUM_AUX_TDCS: usize = 2;

/// Number of Ref-Mx pins an AUX TDC can be routed from
pub const NUM_MX_PINS: u8 = 3;

/// Profiles per DPLL
pub const MAX_DPLL_PROFILES: usize = 6;

/// Profile priority is a 5-bit field
pub const MAX_PROFILE_PRIORITY: u8 = 31;

/// System clock PLL output band, MHz (exclusive bounds)
pub const SYS_CLK_FREQ_MIN_MHZ: u64 = 2250;
pub const SYS_CLK_FREQ_MAX_MHZ: u64 = 2415;

/// System clock PLL feedback divider search range
pub const SYS_CLK_DIV_RATIO_MIN: u64 = 4;
pub const SYS_CLK_DIV_RATIO_MAX: u64 = 256;

/// Reference R divider ratio maximum (stored as ratio - 1 in 30 bits)
pub const R_DIV_MAX: u32 = 0x4000_0000;

/// Zero-delay feedback output must run below this rate
pub const MAX_ZERO_DELAY_RATE: u64 = 200_000_000;

/// Attoseconds per second, reference and TDC periods are programmed in as
pub const ATTOS_PER_SEC: u64 = 1_000_000_000_000_000_000;

/// Maximum burst length of the N-shot generator
pub const MAX_NSHOT_PULSES: u8 = 63;

/// Frequency plan limits of the DPLL -> APLL cascade.
///
/// Passed by reference into the divider planner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrequencyPlan {
    /// APLL VCO range per channel, Hz
    pub apll_rate_ranges: [(u64, u64); NUM_PLLS],
    /// APLL phase detector input window, Hz
    pub apll_pfd_range: (u64, u64),
    /// APLL M divider
    pub m_min: u64,
    pub m_max: u64,
    /// DPLL integer feedback divider maximum
    pub n_max: u64,
    /// DPLL FRAC / MOD maxima (24 bits each)
    pub frac_max: u64,
    pub mod_max: u64,
    /// Highest TDC input rate, feedback tagging keeps the tag rate below it
    pub max_tdc_freq: u64,
}

/// AD9545 frequency plan
pub const AD9545_PLAN: FrequencyPlan = FrequencyPlan {
    apll_rate_ranges: [
        (2_424_000_000, 3_232_000_000),
        (3_232_000_000, 4_040_000_000),
    ],
    apll_pfd_range: (162_000_000, 350_000_000),
    m_min: 1,
    m_max: 255,
    n_max: 1_073_741_823,
    frac_max: 16_777_215,
    mod_max: 16_777_215,
    max_tdc_freq: 200_000,
};

/// Register value of each profile TDC source (Ref-A, AA, B, BB, NCO0, NCO1)
pub const TDC_SOURCE_MAPPING: [u8; 6] = [0, 1, 2, 3, 8, 9];

/// Fast acquisition excess bandwidth, selected by index
pub const FAST_ACQ_EXCESS_BW_MAP: [u32; 11] = [0, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

/// Fast acquisition timeout / settle time in ms, selected by index
pub const FAST_ACQ_TIMEOUT_MAP: [u32; 8] = [1, 10, 50, 100, 500, 1000, 10000, 50000];

/// Reference monitor hysteresis, basis points
pub const HYST_SCALES_BP: [u32; 8] = [0, 3125, 6250, 12500, 25000, 50000, 75000, 87500];

/// Output driver current, uA
pub const OUT_SOURCE_UA: [u32; 3] = [7500, 12500, 15000];

/// AUX DPLL rate change limit, ppb/s
pub const RATE_CHANGE_LIMIT_MAP: [u32; 7] = [715, 1430, 2860, 5720, 11440, 22880, 45760];

/// Position of `value` in one of the lookup tables above
pub fn table_index(table: &[u32], value: u32) -> Option<u8> {
    table.iter().position(|v| *v == value).map(|i| i as u8)
}
