//! Bring-up
//!
//! Soft reset, system clock, references, auxiliary blocks, DPLL profiles and
//! output drivers, in the order the device expects them. Calibrations are
//! blocking and wait on the caller's delay provider.

use embedded_hal::blocking::delay::DelayMs;
use log::{debug, error, info, warn};

use crate::{
    bus::*,
    clock::*,
    config::*,
    constants::*,
    device::Ad9545,
    errors::*,
    frequency::period_attoseconds,
    output::Output,
    pll::Pll,
    refin::RefInput,
    register::*,
};


/// REF_x_CTRL of a reference pair
fn ref_ctrl_value(a: &InputReferenceConfig, aa: &InputReferenceConfig) -> u8 {
    let single_ended = |r: &InputReferenceConfig| match r.mode {
        RefMode::SingleEnded(s) => s as u8,
        RefMode::Differential(_) => 0,
    };

    match a.mode {
        RefMode::Differential(d) => Reg::<RefCtrl>::default()
            .set(RefPairMode::Differential)
            .set(DiffCoupling(d as u8))
            .b,
        RefMode::SingleEnded(s) => Reg::<RefCtrl>::default()
            .set(RefPairMode::SingleEnded)
            .set(RefCoupling(s as u8))
            .set(RefNCoupling(single_ended(aa)))
            .b,
    }
}


impl<B> Ad9545<B>
where B: RegisterBus,
{
    /// Configures the whole device from its `DeviceConfig`.
    /// Blocking call.
    ///
    /// Lock failures of the APLLs, DPLLs and AUX DPLL are logged, only an
    /// unlocked system clock PLL is an error.
    pub fn setup<D>(self: &mut Self, delay: &mut D) -> Result<(), Error>
    where D: DelayMs<u32>,
    {
        self.reset()?;
        self.sys_clk_setup()?;
        self.input_refs_setup()?;
        self.aux_ncos_setup()?;
        self.calib_system_clock(delay)?;
        self.aux_tdcs_setup()?;
        self.aux_dpll_setup()?;
        self.calib_aplls(delay)?;
        self.io_update()?;
        self.plls_setup()?;
        self.outputs_setup()?;
        self.calib_aplls(delay)?;
        self.lock_check()?;

        info!("AD9545 configured");
        Ok(())
    }

    /// Soft reset, the reset bits self-clear once the register map is back
    /// at its defaults.
    pub fn reset(self: &mut Self) -> Result<(), Error> {
        self.bus.write_mask(CONFIG_0, RESET_REGS, RESET_REGS)?;

        for _ in 0..self.config.timings.reset_poll_budget {
            match self.reset_done() {
                Ok(()) => return Ok(()),
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }

        error!("soft reset did not clear");
        Err(Error::ResetTimeout)
    }

    fn reset_done(self: &mut Self) -> nb::Result<(), Error> {
        if self.bus.read(CONFIG_0)? & RESET_REGS != 0 {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    fn sys_clk_setup(self: &mut Self) -> Result<(), Error> {
        let sys = self.config.sys_clk;
        let k = sys.feedback_divider()?;
        self.bus.write(SYS_CLK_FB_DIV, k as u8)?;

        let input = Reg::<SysClkInput>::default()
            .set(if sys.crystal { CrystalAmplifier::Enabled } else { CrystalAmplifier::Disabled })
            .set(if sys.doubler { SysClkDoubler::Enabled } else { SysClkDoubler::Disabled });
        self.bus.write(SYS_CLK_INPUT, input.b)?;

        // reference frequency in mHz
        self.bus.write_be(SYS_CLK_REF_FREQ, sys.ref_freq_hz * 1000, 5)?;

        let stability = self.config.timings.sys_clk_stability_ms as u64 & STABILITY_PERIOD_MASK;
        self.bus.write_be(STABILITY_TIMER, stability, 3)?;

        debug!("system clock: K {}, {} Hz", k, self.sys_freq_hz);
        Ok(())
    }

    fn input_refs_setup(self: &mut Self) -> Result<(), Error> {
        let refs = self.config.refs;

        for pair in 0..NUM_REFS / 2 {
            let reg = ref_ctrl_value(&refs[pair * 2], &refs[pair * 2 + 1]);
            self.bus.write(ref_ctrl(pair), reg)?;
        }

        for (i, r) in refs.iter().enumerate().filter(|(_, r)| r.used) {
            RefInput(i as u8).set_r_div(self, r.r_div_ratio)?;

            self.bus.write_be(ref_offset_limit(i), r.d_tol_ppb as u64, 3)?;
            self.bus.write_be(ref_period(i), period_attoseconds(r.parent_rate_hz)?, 8)?;
            self.bus.write(ref_monitor_hyst(i), r.hyst_index()?)?;
            self.bus.write_be(source_freq_thresh(i), r.freq_thresh_ps as u64, 3)?;
            self.bus.write_be(ref_valid_timer(i), r.valid_timer_ms as u64, 3)?;
            self.bus.write_be(source_phase_thresh(i), r.phase_thresh_ps as u64, 3)?;

            // lock detector rates stay at their defaults unless given
            let rates = [
                (source_freq_lock_fill(i), r.freq_lock_fill_rate),
                (source_freq_lock_drain(i), r.freq_lock_drain_rate),
                (source_phase_lock_fill(i), r.phase_lock_fill_rate),
                (source_phase_lock_drain(i), r.phase_lock_drain_rate),
            ];
            for (addr, rate) in rates.iter().filter(|(_, rate)| *rate != 0) {
                self.bus.write(*addr, *rate)?;
            }

            debug!("{}: {} Hz / R {}", ClockId::RefInput(i as u8).name(), r.parent_rate_hz, r.r_div_ratio);
        }

        let power_down = refs
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.used)
            .fold(0u8, |acc, (i, _)| acc | (1 << i));
        self.bus.write(POWER_DOWN_REF, power_down)
    }

    fn aux_ncos_setup(self: &mut Self) -> Result<(), Error> {
        let ncos = self.config.aux_ncos;
        for (i, nco) in ncos.iter().enumerate().filter(|(_, n)| n.used) {
            self.bus.write_be(nco_freq_thresh(i), nco.freq_thresh_ps as u64, 3)?;
            self.bus.write_be(nco_phase_thresh(i), nco.phase_thresh_ps as u64, 3)?;
        }
        Ok(())
    }

    /// Calibrates the system clock VCO and waits for the PLL to settle.
    fn calib_system_clock<D>(self: &mut Self, delay: &mut D) -> Result<(), Error>
    where D: DelayMs<u32>,
    {
        let t = self.config.timings;

        for attempt in 0..t.calibration_attempts {
            for (addr, data) in VCO_CALIBRATION_OP.iter() {
                self.bus.write(*addr, *data)?;
            }

            delay.delay_ms(t.sys_calib_settle_ms + t.sys_clk_stability_ms);

            let status = self.bus.read(PLL_STATUS)?;
            if status & SYS_PLL_STABLE_MASK == SYS_PLL_STABLE_MASK {
                self.bus.write(CALIB_CLK, 0)?;
                self.io_update()?;
                info!("system clock PLL locked");
                return Ok(());
            }

            debug!("system clock calibration attempt {}: status {:#04x}", attempt, status);
        }

        error!("system clock PLL unlocked");
        Err(Error::SystemPllUnlocked)
    }

    fn aux_tdcs_setup(self: &mut Self) -> Result<(), Error> {
        let tdcs = self.config.aux_tdcs;
        for (i, tdc) in tdcs.iter().enumerate().filter(|(_, t)| t.used) {
            self.bus.write(mx_pin(tdc.pin), mx_to_tdc(i as u8))?;
            debug!("{}: Mx pin {}, {} Hz", ClockId::AuxTdc(i as u8).name(), tdc.pin, tdc.parent_rate_hz);
        }
        Ok(())
    }

    fn aux_dpll_setup(self: &mut Self) -> Result<(), Error> {
        let aux = self.config.aux_dpll;
        if !aux.used {
            return Ok(());
        }

        self.bus.write(AUX_DPLL_SOURCE, aux.source.register_value())?;
        // loop bandwidth in units of 0.1 Hz
        self.bus.write_be(AUX_DPLL_LOOP_BW, (aux.loop_bw_mhz / 100) as u64, 2)?;
        self.bus.write(AUX_DPLL_CHANGE_LIMIT, aux.rate_change_index()?)?;

        // route DPLL, NCO and TDC temperature compensation through the AUX DPLL
        self.bus.write(COMPENSATE_DPLL, COMPENSATE_DPLL_VIA_AUX_DPLL)?;
        self.bus.write(COMPENSATE_NCOS, COMPENSATE_NCOS_VIA_AUX_DPLL)?;
        self.bus.write(COMPENSATE_TDCS, COMPENSATE_TDCS_VIA_AUX_DPLL)
    }

    /// Calibrates the APLL of `pll`, returns true once it reports lock.
    fn calib_apll<D>(self: &mut Self, delay: &mut D, pll: usize) -> Result<bool, Error>
    where D: DelayMs<u32>,
    {
        let t = self.config.timings;

        for _ in 0..t.calibration_attempts {
            self.bus.write_mask(pwr_calib_ch(pll), CALIB_APLL, 0)?;
            self.io_update()?;
            self.bus.write_mask(pwr_calib_ch(pll), CALIB_APLL, CALIB_APLL)?;
            self.io_update()?;

            delay.delay_ms(t.apll_settle_ms);

            if self.bus.read(pllx_status(pll))? & APLL_LOCKED != 0 {
                self.bus.write_mask(pwr_calib_ch(pll), CALIB_APLL, 0)?;
                self.io_update()?;
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn calib_aplls<D>(self: &mut Self, delay: &mut D) -> Result<(), Error>
    where D: DelayMs<u32>,
    {
        for pll in 0..NUM_PLLS {
            if !self.config.plls[pll].used {
                continue;
            }
            if !self.calib_apll(delay, pll)? {
                warn!("APLL{} unlocked", pll);
            }
        }
        Ok(())
    }

    fn fast_acq_setup(self: &mut Self, pll: usize, profile: usize) -> Result<(), Error> {
        let fast = match self.config.plls[pll].profiles[profile].fast_acquisition()? {
            Some(fast) => fast,
            None => return Ok(()),
        };

        self.bus.write(dpll_fast_l1(pll, profile), fast.excess_bw)?;

        let l2 = Reg::<FastL2>::default()
            .set(FastAcqSettle(fast.settle))
            .set(FastAcqTimeout(fast.timeout));
        self.bus.write(dpll_fast_l2(pll, profile), l2.b)?;

        self.bus.write(dpll_fast_mode(pll), self.config.plls[pll].fast_acq_trigger_mode)
    }

    fn plls_setup(self: &mut Self) -> Result<(), Error> {
        for pll in 0..NUM_PLLS {
            let cfg = self.config.plls[pll];
            if !cfg.used {
                continue;
            }

            if cfg.slew_rate_limit_ps != 0 {
                self.bus.write_be(dpll_slew_rate(pll), cfg.slew_rate_limit_ps as u64, 4)?;
            }

            // feedback output numbering restarts at 0 in the DPLL1 page
            let fb_path = match cfg.zero_delay {
                Some(zd) if pll > 0 && zd.source as usize >= OUTPUTS_PER_PLL0 => {
                    zd.source - OUTPUTS_PER_PLL0 as u8
                },
                Some(zd) => zd.source,
                None => 0,
            };
            let hitless = if cfg.zero_delay.is_some() { Hitless::Enabled } else { Hitless::Disabled };

            for (i, p) in cfg.profiles.iter().enumerate().filter(|(_, p)| p.enabled) {
                let en = Reg::<ProfileEn>::default()
                    .set(ProfileEnable::Enabled)
                    .set(SelectionPriority(p.priority));
                self.bus.write(dpll_en(pll, i), en.b)?;
                self.bus.write(dpll_fb_path(pll, i), fb_path)?;
                self.bus.write(dpll_fb_mode(pll, i), Reg::<FbMode>::default().set(hitless).b)?;
                self.bus.write(dpll_source(pll, i), p.tdc_source.register_value())?;
                self.bus.write_be(dpll_loop_bw(pll, i), p.loop_bw_uhz as u64, 4)?;

                self.fast_acq_setup(pll, i)?;
            }

            if cfg.rate_hz != 0 {
                let rate = Pll(pll as u8).set_rate(self, cfg.rate_hz)?;
                info!("PLL{}: {} Hz", pll, rate);
            }
        }
        Ok(())
    }

    fn outputs_setup(self: &mut Self) -> Result<(), Error> {
        let outputs = self.config.outputs;

        // one current setting per driver pair, the A side wins
        for pair in 0..NUM_DRIVERS {
            let out = match outputs[pair * 2..pair * 2 + 2].iter().find(|o| o.used) {
                Some(out) => out,
                None => continue,
            };

            let conf = Reg::<DriverConf>::default()
                .set(out.current_direction)
                .set(DriveCurrent(out.current_index()?))
                .set(out.mode);
            self.bus.write(driver_conf(pair), conf.b)?;
        }

        for (i, out) in outputs.iter().enumerate().filter(|(_, o)| o.used && o.rate_hz != 0) {
            let rate = Output(i as u8).set_rate(self, out.rate_hz)?;
            info!("{}: {} Hz", ClockId::Output(i as u8).name(), rate);
        }

        for pll in 0..NUM_PLLS {
            if !self.config.plls[pll].used {
                continue;
            }

            let mut sync = Reg::<SyncCtrl>::default();

            // hitless outputs wait for the DPLL reference before syncing
            if self.config.plls[pll].zero_delay.is_some() {
                sync = sync.set(SyncDpllRef::Enabled);
                self.bus.write(sync_ctrl(pll), sync.b)?;
                self.io_update()?;
            }

            sync = sync.set(SyncMode(1));
            self.bus.write(sync_ctrl(pll), sync.b)?;
            self.io_update()?;
        }

        Ok(())
    }

    /// Reports lock state after bring-up, never fails on an unlocked loop.
    fn lock_check(self: &mut Self) -> Result<(), Error> {
        let status = self.bus.read(PLL_STATUS)?;
        for pll in 0..NUM_PLLS {
            if self.config.plls[pll].used && !pll_locked(pll, status) {
                warn!("PLL{} unlocked", pll);
            }
        }

        if self.config.aux_dpll.used {
            let misc = self.bus.read(MISC)?;
            if misc & MISC_AUX_DPLL_LOCK == 0 {
                warn!("AUX DPLL unlocked");
            }
            if misc & MISC_AUX_DPLL_REF_FAULT != 0 {
                warn!("AUX DPLL reference fault");
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn single(s: SingleEndedConfig) -> InputReferenceConfig {
        InputReferenceConfig { mode: RefMode::SingleEnded(s), ..Default::default() }
    }

    #[test]
    fn ref_ctrl_single_ended_pair() {
        let a = single(SingleEndedConfig::DcCoupled1v8);
        let aa = single(SingleEndedConfig::PullUp);
        assert_eq!(ref_ctrl_value(&a, &aa), (2 << 4) | (3 << 6));
    }

    #[test]
    fn ref_ctrl_differential_pair_ignores_second_pin() {
        let a = InputReferenceConfig {
            mode: RefMode::Differential(DifferentialConfig::DcCoupledLvds),
            ..Default::default()
        };
        let aa = single(SingleEndedConfig::PullUp);
        assert_eq!(ref_ctrl_value(&a, &aa), 1 | (2 << 2));
    }
}
