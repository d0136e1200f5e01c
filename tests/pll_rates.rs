mod common;

use ad9545::{
    config::*,
    frequency::NCO_FREQ_INT_MAX,
    register::*,
    Ad9545, ClockId, Error, RateSource, TdcSource,
    pll::Pll,
};
use common::*;


/// Ref-A at `ref_rate` feeding a zero-delay PLL0 with Q0A (10 MHz) as feedback
fn zero_delay_config(ref_rate: u64) -> DeviceConfig {
    let mut c = single_ref_config(ref_rate);
    c.plls[0].zero_delay = Some(ZeroDelayConfig { source: 0, source_rate_hz: 10_000_000 });
    c
}


#[test]
fn no_valid_reference_free_runs_on_tuning_word_only() {
    let mut regs = Regs::new();
    // power-on default of the APLL M divider
    regs.mem[apll_m_div(0) as usize] = 1;

    let mut dev = Ad9545::new(&mut regs, single_ref_config(10_000_000)).unwrap();
    assert_eq!(Pll(0).rate_source(&mut dev), Ok(RateSource::FreeRun));

    assert_eq!(dev.round_rate(ClockId::Pll(0), 122_880_000), Ok(122_880_000));
    assert_eq!(dev.set_rate(ClockId::Pll(0), 122_880_000), Ok(122_880_000));
    assert_eq!(dev.pll_state(0).unwrap().free_run_freq_hz, 245_760_000);
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(122_880_000));

    assert!(regs.was_written(dpll_ftw(0)));
    assert!(!regs.was_written(dpll_n_div(0, 0)));
    assert!(!regs.was_written(dpll_frac(0, 0)));
    assert!(!regs.was_written(apll_m_div(0)));

    // 2.26 GHz / 20 MHz is far outside of the tuning word window
    let mut dev = Ad9545::new(&mut regs, single_ref_config(10_000_000)).unwrap();
    assert_eq!(dev.round_rate(ClockId::Pll(0), 10_000_000), Err(Error::InvalidTuningWord));
    assert_eq!(dev.set_rate(ClockId::Pll(0), 10_000_000), Err(Error::InvalidTuningWord));
}

#[test]
fn free_run_keeps_the_programmed_apll_divider() {
    let mut regs = Regs::new();
    regs.set_ref_valid(0, true);

    // 2 GHz / 256 MHz PFD midpoint: M = 7
    let mut dev = Ad9545::new(&mut regs, single_ref_config(10_000_000)).unwrap();
    assert_eq!(dev.set_rate(ClockId::Pll(0), 1_000_000_000), Ok(1_000_000_000));
    assert_eq!(regs.field(apll_m_div(0), 1), 7);

    regs.set_ref_valid(0, false);
    let mut dev = Ad9545::new(&mut regs, single_ref_config(10_000_000)).unwrap();
    assert_eq!(Pll(0).rate_source(&mut dev), Ok(RateSource::FreeRun));

    // 2 × 840 MHz / 7 = 240 MHz NCO
    assert_eq!(dev.round_rate(ClockId::Pll(0), 840_000_000), Ok(840_000_000));
    assert_eq!(dev.set_rate(ClockId::Pll(0), 840_000_000), Ok(840_000_000));
    assert_eq!(dev.pll_state(0).unwrap().free_run_freq_hz, 240_000_000);
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(840_000_000));

    // 35.1 MHz NCO: 2.26 GHz / f NCO = 64, outside of the tuning word window
    assert_eq!(dev.round_rate(ClockId::Pll(0), 122_880_000), Err(Error::InvalidTuningWord));
    assert_eq!(dev.set_rate(ClockId::Pll(0), 122_880_000), Err(Error::InvalidTuningWord));
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(840_000_000));
    assert_eq!(regs.field(apll_m_div(0), 1), 7);
}

#[test]
fn huge_rates_are_handled_without_overflow() {
    let mut c = single_ref_config(10_000_000);
    c.aux_tdcs[1] = AuxTdcConfig { used: true, pin: 0, parent_rate_hz: 10_000_000 };

    let mut regs = Regs::new();
    regs.mem[apll_m_div(0) as usize] = 1;

    // free-run: the NCO would have to run far above the system clock
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert_eq!(dev.round_rate(ClockId::Pll(0), u64::MAX), Err(Error::InvalidTuningWord));
    assert_eq!(dev.set_rate(ClockId::Pll(0), u64::MAX), Err(Error::InvalidTuningWord));

    // PLL0 never free-ran, its outputs have no rate to divide
    assert_eq!(dev.round_rate(ClockId::Output(0), u64::MAX), Ok(0));
    assert_eq!(dev.set_rate(ClockId::Output(0), u64::MAX), Ok(0));

    assert_eq!(dev.round_rate(ClockId::AuxNco(0), u64::MAX), Ok(NCO_FREQ_INT_MAX + 1));
    assert_eq!(
        dev.set_rate(ClockId::AuxNco(0), u64::MAX),
        Err(Error::NcoFrequencyOutOfRange(u64::MAX))
    );
    assert_eq!(dev.round_rate(ClockId::AuxTdc(0), u64::MAX), Ok(0));
    assert_eq!(dev.round_rate(ClockId::AuxTdc(1), u64::MAX), Ok(10_000_000));
    assert_eq!(dev.set_rate(ClockId::AuxTdc(1), u64::MAX), Ok(10_000_000));
    assert_eq!(dev.set_rate(ClockId::RefInput(0), u64::MAX), Err(Error::Unsupported));

    // with a valid reference the planner clamps N and saturates
    regs.set_ref_valid(0, true);
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert!(dev.round_rate(ClockId::Pll(0), u64::MAX).is_ok());
    assert_eq!(dev.set_rate(ClockId::Pll(0), u64::MAX), Err(Error::InvalidTuningWord));
    assert_eq!(regs.field(apll_m_div(0), 1), 255);
}

#[test]
fn fractional_rate_round_trip() {
    let mut regs = Regs::new();
    regs.set_ref_valid(0, true);

    let mut dev = Ad9545::new(&mut regs, single_ref_config(10_000_000)).unwrap();
    assert_eq!(dev.round_rate(ClockId::Pll(0), 122_880_000), Ok(122_880_000));
    assert_eq!(dev.set_rate(ClockId::Pll(0), 122_880_000), Ok(122_880_000));
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(122_880_000));

    assert_eq!(dev.set_rate(ClockId::Output(1), 40_000_000), Ok(40_960_000));
    assert_eq!(dev.round_rate(ClockId::Output(1), 40_000_000), Ok(40_960_000));
    assert_eq!(dev.recalc_rate(ClockId::Output(1)), Ok(40_960_000));
    assert_eq!(regs.field(q_div(1), 4), 3);
}

#[test]
fn zero_delay_programs_phase_buildout() {
    let mut regs = Regs::new();
    regs.set_ref_valid(0, true);

    let mut dev = Ad9545::new(&mut regs, zero_delay_config(1_000_000)).unwrap();
    assert_eq!(dev.set_rate(ClockId::Pll(0), 100_000_000), Ok(100_000_000));
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(100_000_000));
    assert_eq!(dev.pll_state(0).unwrap().fb_tagging[0], false);

    assert_eq!(regs.field(q_div(0), 4), 10);
    assert_eq!(regs.field(dpll_fb_mode(0, 0), 1), 0x01);
    // N BUILDOUT = 10 × 2 × 10 / 1
    assert_eq!(regs.field(dpll_n_div(0, 0), 4), 199);
    assert_eq!(regs.field(dpll_hitless_n(0, 0), 4), 9);
    assert_eq!(regs.field(dpll_frac(0, 0), 3), 0);
    assert_eq!(regs.field(dpll_mod(0, 0), 3), 1);
    assert_eq!(regs.field(apll_m_div(0), 1), 1);
}

#[test]
fn slow_zero_delay_parent_uses_feedback_tagging() {
    let mut regs = Regs::new();
    regs.set_ref_valid(0, true);

    let mut dev = Ad9545::new(&mut regs, zero_delay_config(1_000)).unwrap();
    assert_eq!(dev.set_rate(ClockId::Pll(0), 100_000_000), Ok(100_000_000));
    assert_eq!(dev.pll_state(0).unwrap().fb_tagging[0], true);
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(100_000_000));

    let tag = OUTPUT_REGS[0];
    assert_eq!(regs.field(dpll_fb_mode(0, 0), 1), 0x88);
    assert_eq!(regs.field(tag.modulation_counter, 4), 10_000);
    assert_eq!(regs.field(tag.modulator, 1) as u8 & MODULATOR_EN, MODULATOR_EN);
    assert_eq!(regs.field(dpll_hitless_n(0, 0), 4), 49);
    assert_eq!(regs.field(dpll_n_div(0, 0), 4), 999);
}

#[test]
fn unavailable_zero_delay_profile_is_skipped() {
    let mut regs = Regs::new();
    regs.set_ref_valid(0, true);

    // 50 MHz parent, 10 MHz feedback: N rounds to 0
    let mut dev = Ad9545::new(&mut regs, zero_delay_config(50_000_000)).unwrap();
    assert_eq!(dev.set_rate(ClockId::Pll(0), 100_000_000), Ok(100_000_000));

    assert!(!regs.was_written(dpll_n_div(0, 0)));
    assert!(!regs.was_written(dpll_ftw(0)));
}

#[test]
fn profile_selection_follows_priority_and_validity() {
    let mut c = single_ref_config(10_000_000);
    c.refs[2] = InputReferenceConfig { used: true, parent_rate_hz: 25_000_000, ..Default::default() };
    c.plls[0].profiles[0].priority = 5;
    c.plls[0].profiles[1] = DpllProfile {
        enabled: true,
        priority: 2,
        tdc_source: TdcSource::RefB,
        ..Default::default()
    };

    let mut regs = Regs::new();
    regs.set_ref_valid(0, true);
    regs.set_ref_valid(2, true);
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert_eq!(dev.pll_state(0).unwrap().num_parents, 2);
    assert_eq!(dev.pll_state(0).unwrap().parents[1], Some(ClockId::RefInput(2)));
    assert_eq!(Pll(0).rate_source(&mut dev), Ok(RateSource::Profile(1)));

    // both profiles are programmed, the selected one reports its rate
    assert_eq!(dev.set_rate(ClockId::Pll(0), 122_880_000), Ok(122_880_000));
    assert_eq!(dev.recalc_rate(ClockId::Pll(0)), Ok(122_880_000));
    assert_eq!(regs.field(dpll_frac(0, 0), 3), 72);
    assert!(regs.was_written(dpll_n_div(0, 1)));

    // selection is re-evaluated on every query
    regs.set_ref_valid(2, false);
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert_eq!(Pll(0).rate_source(&mut dev), Ok(RateSource::Profile(0)));

    c.plls[0].profiles[1].priority = 5;
    regs.set_ref_valid(2, true);
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert_eq!(Pll(0).rate_source(&mut dev), Ok(RateSource::Profile(0)));
}

#[test]
fn aux_nco_profile_validity_comes_from_misc() {
    let mut c = base_config();
    c.aux_ncos[1].used = true;
    c.plls[1].used = true;
    c.plls[1].profiles[2] = DpllProfile {
        enabled: true,
        tdc_source: TdcSource::AuxNco1,
        ..Default::default()
    };

    let mut regs = Regs::new();
    regs.mem[MISC as usize] = MISC_AUX_NCO1_ERR;
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert_eq!(dev.pll_state(1).unwrap().parents[2], Some(ClockId::AuxNco(1)));
    assert_eq!(Pll(1).rate_source(&mut dev), Ok(RateSource::FreeRun));

    regs.mem[MISC as usize] = 0;
    let mut dev = Ad9545::new(&mut regs, c).unwrap();
    assert_eq!(Pll(1).rate_source(&mut dev), Ok(RateSource::Profile(2)));
}

#[test]
fn unused_pll_and_bad_indices() {
    let mut regs = Regs::new();
    let mut dev = Ad9545::new(&mut regs, base_config()).unwrap();
    assert_eq!(dev.set_rate(ClockId::Pll(1), 100_000_000), Err(Error::NotConfigured));
    assert_eq!(dev.set_rate(ClockId::Pll(2), 100_000_000), Err(Error::NotConfigured));
    assert_eq!(dev.set_rate(ClockId::Pll(0), 0), Err(Error::ZeroRate));
    assert_eq!(dev.recalc_rate(ClockId::AuxDpll), Err(Error::NotConfigured));
}
