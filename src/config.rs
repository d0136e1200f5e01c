///! Device configuration

use log::error;

use crate::{
    constants::*,
    errors::*,
    planner::div_ceil,
    register::{CurrentDirection, OutputMode},
    selector::TdcSource,
};


/// System clock reference (XOA/XOB).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SystemClockConfig {
    /// Reference frequency, Hz
    pub ref_freq_hz: u64,
    /// Crystal connected, enables the maintaining amplifier
    pub crystal: bool,
    /// 2x frequency doubler in front of the system clock PLL
    pub doubler: bool,
}

impl Default for SystemClockConfig {
    fn default() -> Self {
        SystemClockConfig { ref_freq_hz: 0, crystal: false, doubler: false }
    }
}

impl SystemClockConfig {
    /// Reference frequency seen by the system clock PLL, MHz (rounded up)
    fn pfd_mhz(self: &Self) -> u64 {
        let f = div_ceil(self.ref_freq_hz, 1_000_000);
        if self.doubler { f.saturating_mul(2) } else { f }
    }

    /// Smallest feedback divider K placing the system clock PLL in its band.
    /// 2250 MHz < K × f REF (× 2) < 2415 MHz
    pub fn feedback_divider(self: &Self) -> Result<u64, Error> {
        let f = self.pfd_mhz();
        (SYS_CLK_DIV_RATIO_MIN..SYS_CLK_DIV_RATIO_MAX)
            .find(|k| {
                let vco = k.saturating_mul(f);
                vco > SYS_CLK_FREQ_MIN_MHZ && vco < SYS_CLK_FREQ_MAX_MHZ
            })
            .ok_or(Error::NoSystemClockDivider)
    }

    /// Internal system clock, Hz
    pub fn sys_freq_hz(self: &Self) -> Result<u64, Error> {
        let k = self.feedback_divider()?;
        let f = self.ref_freq_hz * k;
        Ok(if self.doubler { f * 2 } else { f })
    }
}


/// Single-ended input receiver mode
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SingleEndedConfig {
    AcCoupled = 0,
    DcCoupled1v2,
    DcCoupled1v8,
    PullUp,
}

/// Differential input receiver mode
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DifferentialConfig {
    AcCoupled = 0,
    DcCoupled,
    DcCoupledLvds,
}

/// Reference input pin mode.
/// For a differential pair only the first reference of the pair is looked at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefMode {
    SingleEnded(SingleEndedConfig),
    Differential(DifferentialConfig),
}


/// Reference input (Ref-A, Ref-AA, Ref-B, Ref-BB)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InputReferenceConfig {
    pub used: bool,
    pub mode: RefMode,
    /// R divider ratio, 1 ..= 2^30
    pub r_div_ratio: u32,
    /// Rate of the external source driving the pin, Hz
    pub parent_rate_hz: u64,
    /// Reference monitor offset limit, ppb
    pub d_tol_ppb: u32,
    /// Reference monitor hysteresis, basis points (see `HYST_SCALES_BP`)
    pub monitor_hyst_scale: u32,
    /// Reference validation timer, ms
    pub valid_timer_ms: u32,
    pub freq_thresh_ps: u32,
    pub phase_thresh_ps: u32,
    /// Lock detector rates, left at device defaults when 0
    pub phase_lock_fill_rate: u8,
    pub phase_lock_drain_rate: u8,
    pub freq_lock_fill_rate: u8,
    pub freq_lock_drain_rate: u8,
}

impl Default for InputReferenceConfig {
    fn default() -> Self {
        InputReferenceConfig {
            used: false,
            mode: RefMode::SingleEnded(SingleEndedConfig::AcCoupled),
            r_div_ratio: 1,
            parent_rate_hz: 0,
            d_tol_ppb: 0,
            monitor_hyst_scale: 0,
            valid_timer_ms: 0,
            freq_thresh_ps: 0,
            phase_thresh_ps: 0,
            phase_lock_fill_rate: 0,
            phase_lock_drain_rate: 0,
            freq_lock_fill_rate: 0,
            freq_lock_drain_rate: 0,
        }
    }
}

impl InputReferenceConfig {
    /// Index into the monitor hysteresis table
    pub fn hyst_index(self: &Self) -> Result<u8, Error> {
        table_index(&HYST_SCALES_BP, self.monitor_hyst_scale)
            .ok_or(Error::InvalidHysteresisScale(self.monitor_hyst_scale))
    }

    fn validate(self: &Self) -> Result<(), Error> {
        if !self.used {
            return Ok(());
        }
        if self.r_div_ratio == 0 || self.r_div_ratio > R_DIV_MAX {
            return Err(Error::InvalidRDivider(self.r_div_ratio));
        }
        if self.parent_rate_hz == 0 {
            return Err(Error::ZeroFrequency);
        }
        self.hyst_index().map(|_| ())
    }
}


/// DPLL profile
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DpllProfile {
    pub enabled: bool,
    /// Selection priority, 0 ..= 31, lower wins
    pub priority: u8,
    pub tdc_source: TdcSource,
    /// Loop bandwidth, uHz
    pub loop_bw_uhz: u32,
    /// Fast acquisition excess bandwidth, 0 disables fast acquisition
    pub fast_acq_excess_bw: u32,
    pub fast_acq_timeout_ms: u32,
    pub fast_acq_settle_ms: u32,
}

impl Default for DpllProfile {
    fn default() -> Self {
        DpllProfile {
            enabled: false,
            priority: 0,
            tdc_source: TdcSource::RefA,
            loop_bw_uhz: 0,
            fast_acq_excess_bw: 0,
            fast_acq_timeout_ms: 0,
            fast_acq_settle_ms: 0,
        }
    }
}

/// Fast acquisition register indices
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FastAcquisition {
    pub excess_bw: u8,
    pub timeout: u8,
    pub settle: u8,
}

impl DpllProfile {
    /// Fast acquisition map indices, `None` when fast acquisition is off
    pub fn fast_acquisition(self: &Self) -> Result<Option<FastAcquisition>, Error> {
        if self.fast_acq_excess_bw == 0 {
            return Ok(None);
        }

        let lookup = |table: &[u32], v: u32| {
            table_index(table, v).ok_or(Error::InvalidFastAcquisition(v))
        };

        Ok(Some(FastAcquisition {
            excess_bw: lookup(&FAST_ACQ_EXCESS_BW_MAP, self.fast_acq_excess_bw)?,
            timeout: lookup(&FAST_ACQ_TIMEOUT_MAP, self.fast_acq_timeout_ms)?,
            settle: lookup(&FAST_ACQ_TIMEOUT_MAP, self.fast_acq_settle_ms)?,
        }))
    }

    fn validate(self: &Self) -> Result<(), Error> {
        if !self.enabled {
            return Ok(());
        }
        if self.priority > MAX_PROFILE_PRIORITY {
            return Err(Error::InvalidPriority(self.priority));
        }
        self.fast_acquisition().map(|_| ())
    }
}


/// Zero-delay feedback through one of the outputs
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ZeroDelayConfig {
    /// Output index (Q0A ..= Q1BB) fed back to the DPLL
    pub source: u8,
    /// Rate of the feedback output, Hz
    pub source_rate_hz: u64,
}

impl ZeroDelayConfig {
    fn validate(self: &Self) -> Result<(), Error> {
        if self.source as usize >= NUM_OUTPUTS {
            return Err(Error::InvalidZeroDelaySource(self.source));
        }
        if self.source_rate_hz >= MAX_ZERO_DELAY_RATE {
            return Err(Error::InvalidZeroDelayRate(self.source_rate_hz));
        }
        Ok(())
    }
}


/// DPLL + APLL channel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PllConfig {
    pub used: bool,
    pub profiles: [DpllProfile; MAX_DPLL_PROFILES],
    pub zero_delay: Option<ZeroDelayConfig>,
    /// Phase slew limit, ps/s, 0 leaves the device default
    pub slew_rate_limit_ps: u32,
    /// Fast acquisition trigger mode bits
    pub fast_acq_trigger_mode: u8,
    /// Rate applied during bring-up, 0 for none
    pub rate_hz: u64,
}

impl PllConfig {
    /// Number of enabled profiles
    pub fn num_parents(self: &Self) -> usize {
        self.profiles.iter().filter(|p| p.enabled).count()
    }
}


/// Output driver (Q0A ..= Q1BB)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub used: bool,
    pub current_direction: CurrentDirection,
    /// Driver current, uA (see `OUT_SOURCE_UA`)
    pub source_ua: u32,
    pub mode: OutputMode,
    /// Rate applied during bring-up, 0 for none
    pub rate_hz: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            used: false,
            current_direction: CurrentDirection::Sink,
            source_ua: OUT_SOURCE_UA[0],
            mode: OutputMode::SingleDivDif,
            rate_hz: 0,
        }
    }
}

impl OutputConfig {
    /// Index into the driver current table
    pub fn current_index(self: &Self) -> Result<u8, Error> {
        table_index(&OUT_SOURCE_UA, self.source_ua).ok_or(Error::InvalidSourceCurrent(self.source_ua))
    }
}


#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AuxNcoConfig {
    pub used: bool,
    pub freq_thresh_ps: u32,
    pub phase_thresh_ps: u32,
}


#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AuxTdcConfig {
    pub used: bool,
    /// Ref-Mx pin the TDC is routed from
    pub pin: u8,
    /// Rate of the signal on the pin, Hz
    pub parent_rate_hz: u64,
}


/// AUX DPLL timing source
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuxDpllSource {
    /// Reference input 0 ..= 3
    Ref(u8),
    /// AUX TDC 0 ..= 1
    AuxTdc(u8),
}

impl AuxDpllSource {
    /// AUX_DPLL_SOURCE register value
    pub fn register_value(self: &Self) -> u8 {
        match *self {
            AuxDpllSource::Ref(n) => n,
            AuxDpllSource::AuxTdc(n) => n + 6,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuxDpllConfig {
    pub used: bool,
    pub source: AuxDpllSource,
    /// Loop bandwidth, mHz
    pub loop_bw_mhz: u32,
    /// Rate change limit, ppb/s (see `RATE_CHANGE_LIMIT_MAP`)
    pub rate_change_limit: u32,
}

impl Default for AuxDpllConfig {
    fn default() -> Self {
        AuxDpllConfig {
            used: false,
            source: AuxDpllSource::Ref(0),
            loop_bw_mhz: 0,
            rate_change_limit: RATE_CHANGE_LIMIT_MAP[0],
        }
    }
}

impl AuxDpllConfig {
    pub fn rate_change_index(self: &Self) -> Result<u8, Error> {
        table_index(&RATE_CHANGE_LIMIT_MAP, self.rate_change_limit)
            .ok_or(Error::InvalidRateChangeLimit(self.rate_change_limit))
    }

    fn validate(self: &Self) -> Result<(), Error> {
        if !self.used {
            return Ok(());
        }
        match self.source {
            AuxDpllSource::Ref(n) if (n as usize) < NUM_REFS => {},
            AuxDpllSource::AuxTdc(n) if (n as usize) < NUM_AUX_TDCS => {},
            _ => return Err(Error::InvalidAuxDpllSource),
        }
        self.rate_change_index().map(|_| ())
    }
}


/// Empirical settle times and thresholds from the datasheet
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timings {
    /// System clock stability timer, ms
    pub sys_clk_stability_ms: u32,
    /// Extra wait on top of the stability timer after system clock calibration, ms
    pub sys_calib_settle_ms: u32,
    /// Wait after an APLL calibration, ms
    pub apll_settle_ms: u32,
    /// Zero-delay parents below this rate need feedback tagging, Hz
    pub tagging_threshold_hz: u64,
    /// Soft reset ready poll iterations
    pub reset_poll_budget: u32,
    /// Calibration attempts before giving up
    pub calibration_attempts: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            sys_clk_stability_ms: 50,
            sys_calib_settle_ms: 50,
            apll_settle_ms: 100,
            tagging_threshold_hz: 2000,
            reset_poll_budget: 1000,
            calibration_attempts: 2,
        }
    }
}


/// Complete device configuration
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DeviceConfig {
    pub sys_clk: SystemClockConfig,
    pub refs: [InputReferenceConfig; NUM_REFS],
    pub plls: [PllConfig; NUM_PLLS],
    pub outputs: [OutputConfig; NUM_OUTPUTS],
    pub aux_ncos: [AuxNcoConfig; NUM_AUX_NCOS],
    pub aux_tdcs: [AuxTdcConfig; NUM_AUX_TDCS],
    pub aux_dpll: AuxDpllConfig,
    pub timings: Timings,
}

impl DeviceConfig {
    /// Checks every parameter range. Nothing is written to the device when this fails.
    pub fn validate(self: &Self) -> Result<(), Error> {
        self.check().map_err(|e| {
            error!("invalid configuration: {}", e);
            e
        })
    }

    /// Reference input or AUX NCO behind `source` is enabled
    fn source_used(self: &Self, source: TdcSource) -> bool {
        match (source.reference(), source.aux_nco()) {
            (Some(r), _) => self.refs[r].used,
            (_, Some(nco)) => self.aux_ncos[nco].used,
            _ => false,
        }
    }

    fn check(self: &Self) -> Result<(), Error> {
        self.sys_clk.feedback_divider()?;

        for r in self.refs.iter() {
            r.validate()?;
        }

        for pll in self.plls.iter().filter(|p| p.used) {
            for p in pll.profiles.iter() {
                p.validate()?;
                if p.enabled && !self.source_used(p.tdc_source) {
                    return Err(Error::InvalidTdcSource(p.tdc_source.index() as u8));
                }
            }
            if let Some(zd) = pll.zero_delay {
                zd.validate()?;
            }
        }

        for out in self.outputs.iter().filter(|o| o.used) {
            out.current_index()?;
        }

        for tdc in self.aux_tdcs.iter().filter(|t| t.used) {
            if tdc.pin >= NUM_MX_PINS {
                return Err(Error::InvalidMxPin(tdc.pin));
            }
            if tdc.parent_rate_hz == 0 {
                return Err(Error::ZeroFrequency);
            }
        }

        self.aux_dpll.validate()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn sys_clk(ref_freq_hz: u64, doubler: bool) -> SystemClockConfig {
        SystemClockConfig { ref_freq_hz, crystal: false, doubler }
    }

    #[test]
    fn system_clock_divider_for_10_mhz() {
        let c = sys_clk(10_000_000, false);
        assert_eq!(c.feedback_divider().unwrap(), 226);
        assert_eq!(c.sys_freq_hz().unwrap(), 2_260_000_000);
    }

    #[test]
    fn system_clock_divider_with_doubler() {
        let c = sys_clk(49_152_000, true);
        // ceil(49.152) × 2 = 100 MHz
        assert_eq!(c.feedback_divider().unwrap(), 23);
        assert_eq!(c.sys_freq_hz().unwrap(), 49_152_000 * 23 * 2);
    }

    #[test]
    fn system_clock_without_divider() {
        assert_eq!(sys_clk(1_000, false).feedback_divider(), Err(Error::NoSystemClockDivider));
        assert_eq!(sys_clk(0, false).sys_freq_hz(), Err(Error::NoSystemClockDivider));
    }

    fn valid() -> DeviceConfig {
        let mut c = DeviceConfig::default();
        c.sys_clk = sys_clk(10_000_000, false);
        c
    }

    #[test]
    fn default_config_with_system_clock_is_valid() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn reference_divider_range() {
        let mut c = valid();
        c.refs[1] = InputReferenceConfig {
            used: true,
            parent_rate_hz: 10_000_000,
            r_div_ratio: 0,
            ..Default::default()
        };
        assert_eq!(c.validate(), Err(Error::InvalidRDivider(0)));
        c.refs[1].r_div_ratio = R_DIV_MAX;
        assert_eq!(c.validate(), Ok(()));
        c.refs[1].r_div_ratio = R_DIV_MAX + 1;
        assert_eq!(c.validate(), Err(Error::InvalidRDivider(R_DIV_MAX + 1)));
    }

    #[test]
    fn unknown_hysteresis_scale() {
        let mut c = valid();
        c.refs[0] = InputReferenceConfig {
            used: true,
            parent_rate_hz: 1,
            monitor_hyst_scale: 100,
            ..Default::default()
        };
        assert_eq!(c.validate(), Err(Error::InvalidHysteresisScale(100)));
    }

    #[test]
    fn zero_delay_source_checks() {
        let mut c = valid();
        c.plls[0].used = true;
        c.plls[0].zero_delay = Some(ZeroDelayConfig { source: 10, source_rate_hz: 1 });
        assert_eq!(c.validate(), Err(Error::InvalidZeroDelaySource(10)));
        c.plls[0].zero_delay = Some(ZeroDelayConfig { source: 2, source_rate_hz: MAX_ZERO_DELAY_RATE });
        assert_eq!(c.validate(), Err(Error::InvalidZeroDelayRate(MAX_ZERO_DELAY_RATE)));
    }

    #[test]
    fn profile_checks() {
        let mut c = valid();
        c.plls[1].used = true;
        c.plls[1].profiles[3] = DpllProfile { enabled: true, priority: 32, ..Default::default() };
        assert_eq!(c.validate(), Err(Error::InvalidPriority(32)));

        c.plls[1].profiles[3].priority = 4;
        c.plls[1].profiles[3].fast_acq_excess_bw = 3;
        assert_eq!(c.validate(), Err(Error::InvalidFastAcquisition(3)));

        c.plls[1].profiles[3].fast_acq_excess_bw = 4;
        c.plls[1].profiles[3].fast_acq_timeout_ms = 50;
        c.plls[1].profiles[3].fast_acq_settle_ms = 10;
        assert_eq!(
            c.plls[1].profiles[3].fast_acquisition().unwrap(),
            Some(FastAcquisition { excess_bw: 2, timeout: 2, settle: 1 })
        );
        assert_eq!(c.plls[1].num_parents(), 1);
    }

    #[test]
    fn profiles_need_an_enabled_source() {
        let mut c = valid();
        c.plls[0].used = true;
        c.plls[0].profiles[1] = DpllProfile { enabled: true, tdc_source: TdcSource::RefB, ..Default::default() };
        assert_eq!(c.validate(), Err(Error::InvalidTdcSource(2)));
        c.refs[2] = InputReferenceConfig { used: true, parent_rate_hz: 1_000, ..Default::default() };
        assert_eq!(c.validate(), Ok(()));

        c.plls[0].profiles[2] = DpllProfile { enabled: true, tdc_source: TdcSource::AuxNco0, ..Default::default() };
        assert_eq!(c.validate(), Err(Error::InvalidTdcSource(4)));
        c.aux_ncos[0].used = true;
        assert_eq!(c.validate(), Ok(()));

        // unused PLLs are not checked
        c.plls[1].profiles[0] = DpllProfile { enabled: true, tdc_source: TdcSource::RefBB, ..Default::default() };
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn huge_system_clock_reference_has_no_divider() {
        assert_eq!(sys_clk(u64::MAX, true).feedback_divider(), Err(Error::NoSystemClockDivider));
    }

    #[test]
    fn aux_checks() {
        let mut c = valid();
        c.aux_tdcs[0] = AuxTdcConfig { used: true, pin: 3, parent_rate_hz: 1 };
        assert_eq!(c.validate(), Err(Error::InvalidMxPin(3)));

        c.aux_tdcs[0].pin = 2;
        c.aux_dpll = AuxDpllConfig { used: true, source: AuxDpllSource::AuxTdc(2), ..Default::default() };
        assert_eq!(c.validate(), Err(Error::InvalidAuxDpllSource));

        c.aux_dpll.source = AuxDpllSource::AuxTdc(1);
        assert_eq!(c.aux_dpll.source.register_value(), 7);
        c.aux_dpll.rate_change_limit = 1;
        assert_eq!(c.validate(), Err(Error::InvalidRateChangeLimit(1)));
    }

    #[test]
    fn output_current_table() {
        let mut c = valid();
        c.outputs[4] = OutputConfig { used: true, source_ua: 12500, ..Default::default() };
        assert_eq!(c.outputs[4].current_index().unwrap(), 1);
        c.outputs[4].source_ua = 10000;
        assert_eq!(c.validate(), Err(Error::InvalidSourceCurrent(10000)));
    }
}
