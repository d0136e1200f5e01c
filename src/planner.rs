//! DPLL / APLL divider planning
//!
//! The DPLL runs at twice the requested PLL rate, the APLL output stage
//! halves it again.
//!
//! Fractional mode:
//! 2 × f OUT = f PARENT × M × (N + FRAC/MOD)
//!
//! Zero-delay mode, feedback through an output running at f FB:
//! N = f FB / f PARENT, Q = f OUT / f FB, FRAC = 0, MOD = 1

use crate::{constants::*, errors::*, rational::*};


/// Divider set realizing a requested PLL rate
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Fractional-N DPLL feeding the APLL
    Fractional {
        m: u64,
        n: u64,
        frac: u64,
        modulus: u64,
        /// Rate the dividers actually produce, Hz
        rate: u64,
    },

    /// Integer-N cascade with the feedback output divider `q`
    ZeroDelay {
        m: u64,
        n: u64,
        q: u64,
        rate: u64,
    },

    /// Zero-delay feedback does not apply to this parent, nothing to program
    ZeroDelayUnavailable {
        rate: u64,
    },
}

impl Plan {
    /// Rate the plan settles on, Hz
    pub fn rate(self: &Self) -> u64 {
        match *self {
            Plan::Fractional { rate, .. } => rate,
            Plan::ZeroDelay { rate, .. } => rate,
            Plan::ZeroDelayUnavailable { rate } => rate,
        }
    }
}


/// Feedback tagging for zero-delay parents too slow for the TDC
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TaggingPlan {
    /// Feedback divider bringing the tag rate below the TDC limit
    pub n: u64,
    /// Feedback output Q divider
    pub q: u64,
    /// Output modulation counter, one tag every `modulation_counter` edges
    pub modulation_counter: u64,
}


#[inline]
pub(crate) fn div_ceil(a: u64, b: u64) -> u64 {
    a / b + if a % b != 0 { 1 } else { 0 }
}

/// Halves round up
#[inline]
pub(crate) fn div_round_closest(a: u64, b: u64) -> u64 {
    let r = a % b;
    a / b + if r >= b - r { 1 } else { 0 }
}

#[inline]
fn div_round_closest_u128(a: u128, b: u128) -> u128 {
    (a + b / 2) / b
}


/// APLL M divider for a doubled rate: centers the PFD input in its window.
pub fn calc_m_div(rate2: u64, limits: &FrequencyPlan) -> u64 {
    let (pfd_min, pfd_max) = limits.apll_pfd_range;
    let pfd_mid = pfd_min / 2 + pfd_max / 2;
    (rate2 / pfd_mid).max(limits.m_min).min(limits.m_max)
}


/// Divider set for `rate` Hz out of PLL `pll` fed by `parent_rate` Hz.
///
/// `zero_delay_rate` is the rate of the feedback output when the PLL runs in
/// zero-delay mode.
pub fn plan(
    rate: u64,
    parent_rate: u64,
    zero_delay_rate: Option<u64>,
    pll: usize,
    limits: &FrequencyPlan,
) -> Result<Plan, Error> {
    if rate == 0 {
        return Err(Error::ZeroRate);
    }

    match zero_delay_rate {
        Some(fb_rate) => Ok(plan_zero_delay(rate, parent_rate, fb_rate, limits)),
        None => plan_fractional(rate, parent_rate, pll, limits),
    }
}


fn plan_fractional(
    rate: u64,
    parent_rate: u64,
    pll: usize,
    limits: &FrequencyPlan,
) -> Result<Plan, Error> {
    if parent_rate == 0 {
        return Err(Error::ZeroFrequency);
    }

    let rate2 = rate.saturating_mul(2);
    let m = calc_m_div(rate2, limits);

    // lowest N still reaching the APLL VCO band, N_DIV holds N - 1
    let apll_min = limits.apll_rate_ranges[pll].0;
    let min_n = (apll_min / limits.m_max.saturating_mul(parent_rate)).max(1);

    let step = m.saturating_mul(parent_rate);
    let mut n = (rate2 / step).max(min_n).min(limits.n_max);

    let num = rate2.saturating_sub(n.saturating_mul(step));
    let (mut frac, mut modulus) =
        best_rational_approximation(num, step, limits.frac_max, limits.mod_max);

    if n < limits.n_max && closer_to_next_integer(num, step, frac, modulus) {
        n += 1;
        frac = 0;
        modulus = 1;
    }

    let p = parent_rate as u128;
    let m128 = m as u128;
    let out2 = (frac as u128) * p * m128 / (modulus as u128) + p * (n as u128) * m128;
    let out = div_round_closest_u128(out2, 2);

    Ok(Plan::Fractional {
        m,
        n,
        frac,
        modulus,
        rate: out.min(u64::MAX as u128) as u64,
    })
}


/// `num / step` (below one unless N was clamped) lies nearer to one than to
/// `frac / modulus`
fn closer_to_next_integer(num: u64, step: u64, frac: u64, modulus: u64) -> bool {
    if num >= step {
        return true;
    }
    let (num, step, frac, modulus) = (num as u128, step as u128, frac as u128, modulus as u128);
    let to_one = (step - num) * modulus;
    let (a, b) = (num * modulus, frac * step);
    let to_frac = if a > b { a - b } else { b - a };
    to_one < to_frac
}


fn plan_zero_delay(
    rate: u64,
    parent_rate: u64,
    fb_rate: u64,
    limits: &FrequencyPlan,
) -> Plan {
    if fb_rate == 0 || parent_rate == 0 {
        return Plan::ZeroDelayUnavailable { rate };
    }

    let n = div_round_closest(fb_rate, parent_rate);
    if n == 0 {
        return Plan::ZeroDelayUnavailable { rate };
    }

    let q = div_ceil(rate, fb_rate);

    let rate2 = rate.saturating_mul(2);
    let (pfd_min, pfd_max) = limits.apll_pfd_range;
    let m = (limits.m_min..=limits.m_max)
        .find(|m| rate2 % m == 0 && (pfd_min..=pfd_max).contains(&div_ceil(rate2, *m)))
        .unwrap_or(limits.m_max);

    Plan::ZeroDelay { m, n, q, rate: q.saturating_mul(fb_rate) }
}


/// Tagged feedback for a zero-delay PLL whose parent runs at `parent_rate`.
pub fn feedback_tagging(
    rate: u64,
    parent_rate: u64,
    fb_rate: u64,
    limits: &FrequencyPlan,
) -> Result<TaggingPlan, Error> {
    if rate == 0 {
        return Err(Error::ZeroRate);
    }
    if parent_rate == 0 || fb_rate == 0 {
        return Err(Error::ZeroFrequency);
    }

    let n = div_ceil(fb_rate, limits.max_tdc_freq);
    let q = div_ceil(rate, fb_rate);
    let modulation_counter = div_round_closest(rate, q.saturating_mul(parent_rate));

    Ok(TaggingPlan { n, q, modulation_counter })
}
