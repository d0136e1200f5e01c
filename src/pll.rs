//! DPLL / APLL channels
//!
//! A channel runs off whichever enabled profile the selector picks. With no
//! valid profile the DPLL free-runs at the frequency set by its tuning word:
//! f OUT = f NCO × M / 2

use log::{debug, warn};

use crate::{
    bus::*,
    clock::*,
    constants::*,
    device::Ad9545,
    errors::*,
    frequency::free_run_tuning_word,
    planner::*,
    register::*,
    selector::{select, RateSource},
};


/// DPLL + APLL channel `n`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pll(pub u8);

impl Pll {
    #[inline]
    fn addr(self: &Self) -> usize {
        self.0 as usize
    }

    /// Profile currently driving the DPLL, re-evaluated on every call
    pub fn rate_source<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<RateSource, Error> {
        let profiles = dev.config.plls[self.addr()].profiles;
        select(&mut dev.bus, &profiles)
    }

    /// Rate of the clock feeding `profile`
    fn parent_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, profile: usize) -> Result<u64, Error> {
        match dev.plls[self.addr()].parents[profile] {
            Some(parent) => parent.recalc_rate(dev),
            None => Err(Error::NotConfigured),
        }
    }

    /// NCO frequency and APLL M divider for free-running at `rate`.
    /// Free-run leaves M alone, so the programmed divider is used unless it reads 0.
    fn free_run_plan<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<(u64, u64), Error> {
        let rate2 = rate.saturating_mul(2);
        let m = match dev.bus.read(apll_m_div(self.addr()))? as u64 {
            0 => calc_m_div(rate2, &AD9545_PLAN),
            m => m,
        };
        let freq = rate2 / m;
        free_run_tuning_word(freq, dev.sys_freq_hz)?;
        Ok((freq, m))
    }

    /// Programs the free-run tuning word for an NCO frequency of `freq` Hz.
    pub fn set_free_run_freq<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, freq: u64) -> Result<(), Error> {
        if freq == 0 {
            return Ok(());
        }

        let ftw = free_run_tuning_word(freq, dev.sys_freq_hz)?;
        dev.bus.write_be(dpll_ftw(self.addr()), ftw, 6)?;
        dev.plls[self.addr()].free_run_freq_hz = freq;
        dev.io_update()
    }

    /// Q divider of the zero-delay feedback output, applied right away
    fn set_feedback_q_div<B: RegisterBus>(dev: &mut Ad9545<B>, output: usize, q: u64) -> Result<(), Error> {
        dev.bus.write_be(q_div(output), q, 4)?;
        dev.io_update()
    }

    /// Tags the feedback of `profile`, returns the feedback divider to use.
    fn set_feedback_tagging<B: RegisterBus>(
        self: &Self,
        dev: &mut Ad9545<B>,
        profile: usize,
        rate: u64,
        parent_rate: u64,
        output: usize,
        fb_rate: u64,
    ) -> Result<TaggingPlan, Error> {
        let pll = self.addr();
        let tagging = feedback_tagging(rate, parent_rate, fb_rate, &AD9545_PLAN)?;

        let mode = Reg::<FbMode>::default()
            .set(TagMode::FeedbackPath)
            .set(BaseFilter::Enabled);
        let mask = Reg::<FbMode>::field_mask::<TagMode>() | Reg::<FbMode>::field_mask::<BaseFilter>();
        dev.bus.write_mask(dpll_fb_mode(pll, profile), mask, mode.b)?;

        dev.bus.write_be(dpll_hitless_n(pll, profile), tagging.n - 1, 4)?;

        let regs = OUTPUT_REGS[output];
        dev.bus.write_be(regs.modulation_counter, tagging.modulation_counter, 4)?;
        dev.bus.write_mask(regs.modulator, MODULATOR_EN, MODULATOR_EN)?;

        dev.plls[pll].fb_tagging[profile] = true;
        Ok(tagging)
    }

    /// Writes the divider words of `profile`, returns the APLL M divider used.
    fn program_profile<B: RegisterBus>(
        self: &Self,
        dev: &mut Ad9545<B>,
        profile: usize,
        rate: u64,
    ) -> Result<Option<(u64, u64)>, Error> {
        let pll = self.addr();
        let parent_rate = self.parent_rate(dev, profile)?;
        let zero_delay = dev.config.plls[pll].zero_delay;

        let p = plan(rate, parent_rate, zero_delay.map(|z| z.source_rate_hz), pll, &AD9545_PLAN)?;
        debug!("PLL{} profile {}: {:?}", pll, profile, p);

        dev.plls[pll].fb_tagging[profile] = false;

        let (m, n_div, hitless_n, frac, modulus, out) = match (p, zero_delay) {
            (Plan::Fractional { m, n, frac, modulus, rate }, _) => {
                dev.bus.write(dpll_fb_mode(pll, profile), 0)?;
                (m, n - 1, n - 1, frac, modulus, rate)
            },

            (Plan::ZeroDelay { m, n, q, rate: out }, Some(zd)) => {
                let output = zd.source as usize;
                Self::set_feedback_q_div(dev, output, q)?;

                let n = if parent_rate < dev.config.timings.tagging_threshold_hz {
                    self.set_feedback_tagging(dev, profile, rate, parent_rate, output, zd.source_rate_hz)?.n
                } else {
                    let mode = Reg::<FbMode>::default().set(Hitless::Enabled);
                    dev.bus.write(dpll_fb_mode(pll, profile), mode.b)?;
                    n
                };

                // N BUILDOUT = N HITLESS × 2 × Q / M
                (m, div_ceil(n.saturating_mul(2).saturating_mul(q), m) - 1, n - 1, 0, 1, out)
            },

            _ => {
                warn!("PLL{} profile {}: zero-delay feedback not applicable", pll, profile);
                return Ok(None);
            },
        };

        dev.bus.write_be(dpll_n_div(pll, profile), n_div, 4)?;
        dev.bus.write_be(dpll_hitless_n(pll, profile), hitless_n, 4)?;
        dev.bus.write(apll_m_div(pll), m as u8)?;
        dev.bus.write_be(dpll_frac(pll, profile), frac, 3)?;
        dev.bus.write_be(dpll_mod(pll, profile), modulus, 3)?;

        Ok(Some((m, out)))
    }
}


impl ClockOps for Pll {
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        let pll = self.addr();
        let m = dev.bus.read(apll_m_div(pll))? as u64;

        let profile = match self.rate_source(dev)? {
            RateSource::FreeRun => {
                return Ok(div_ceil(dev.plls[pll].free_run_freq_hz, 2).saturating_mul(m));
            },
            RateSource::Profile(profile) => profile,
        };

        let parent_rate = self.parent_rate(dev, profile)?;
        let n = dev.bus.read_be(dpll_n_div(pll, profile), 4)? + 1;
        let frac = dev.bus.read_be(dpll_frac(pll, profile), 3)?;
        let modulus = dev.bus.read_be(dpll_mod(pll, profile), 3)?;

        if let Some(zd) = dev.config.plls[pll].zero_delay {
            let output = zd.source as usize;
            let q = dev.bus.read_be(q_div(output), 4)?;
            if m == 0 {
                return Ok(0);
            }

            let n = if dev.plls[pll].fb_tagging[profile] {
                dev.bus.read_be(OUTPUT_REGS[output].modulation_counter, 4)?
            } else {
                dev.bus.read_be(dpll_hitless_n(pll, profile), 4)? + 1
            };

            return Ok(q.saturating_mul(parent_rate).saturating_mul(n));
        }

        if modulus == 0 {
            return Ok(0);
        }

        // f OUT = f PARENT × (N + FRAC/MOD) × M / 2
        let p = parent_rate as u128;
        let m = m as u128;
        let out2 = (frac as u128) * p * m / (modulus as u128) + p * (n as u128) * m;
        Ok(((out2 + 1) / 2).min(u64::MAX as u128) as u64)
    }

    fn round_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        if rate == 0 {
            return Err(Error::ZeroRate);
        }

        let pll = self.addr();
        match self.rate_source(dev)? {
            RateSource::FreeRun => {
                let (freq, m) = self.free_run_plan(dev, rate)?;
                Ok(div_ceil(freq, 2).saturating_mul(m))
            },
            RateSource::Profile(profile) => {
                let parent_rate = self.parent_rate(dev, profile)?;
                let zero_delay = dev.config.plls[pll].zero_delay.map(|z| z.source_rate_hz);
                Ok(plan(rate, parent_rate, zero_delay, pll, &AD9545_PLAN)?.rate())
            },
        }
    }

    /// Precomputes the dividers of every enabled profile, then the free-run
    /// tuning word. With no valid profile only the tuning word is written.
    fn set_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        if rate == 0 {
            return Err(Error::ZeroRate);
        }

        let pll = self.addr();
        if !dev.config.plls[pll].used {
            return Err(Error::NotConfigured);
        }

        let selected = match self.rate_source(dev)? {
            RateSource::FreeRun => {
                let (freq, m) = self.free_run_plan(dev, rate)?;
                self.set_free_run_freq(dev, freq)?;
                debug!("PLL{} free-run: NCO {} Hz, M {}", pll, freq, m);
                return Ok(div_ceil(freq, 2).saturating_mul(m));
            },
            RateSource::Profile(profile) => profile,
        };

        let mut last_m = None;
        let mut achieved = rate;
        for profile in 0..MAX_DPLL_PROFILES {
            if !dev.config.plls[pll].profiles[profile].enabled {
                continue;
            }

            if let Some((m, out)) = self.program_profile(dev, profile, rate)? {
                last_m = Some(m);
                if profile == selected {
                    achieved = out;
                }
            }
        }

        if let Some(m) = last_m {
            self.set_free_run_freq(dev, rate.saturating_mul(2) / m)?;
        }

        Ok(achieved)
    }
}
