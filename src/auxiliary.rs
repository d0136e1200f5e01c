///! Auxiliary NCOs, TDCs and DPLL

use crate::{
    bus::*,
    clock::*,
    config::AuxDpllSource,
    device::Ad9545,
    errors::*,
    frequency::*,
    planner::div_ceil,
    register::*,
};


/// Largest divider of the AUX TDC input
pub const TDC_DIV_MAX: u64 = 255;


/// AUX NCO `n`, usable as a DPLL timing source
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuxNco(pub u8);

impl AuxNco {
    /// Center and offset words currently programmed
    pub fn frequency<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<NcoFrequency, Error> {
        let x = self.0 as usize;
        let center = dev.bus.read_be(nco_center_freq(x), 7)?;
        let offset = dev.bus.read_be(nco_offset_freq(x), 4)? as u32;
        NcoFrequency::new(center, offset)
    }
}

impl ClockOps for AuxNco {
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        Ok(self.frequency(dev)?.to_hz())
    }

    fn round_rate<B: RegisterBus>(self: &Self, _dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        Ok(rate.min(NCO_FREQ_INT_MAX + 1))
    }

    fn set_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        let x = self.0 as usize;
        let nco = NcoFrequency::from_hz(rate)?;
        dev.bus.write_be(nco_center_freq(x), nco.center, 7)?;
        dev.bus.write_be(nco_offset_freq(x), nco.offset as u64, 4)?;
        dev.io_update()?;
        Ok(nco.to_hz())
    }
}


/// AUX TDC `n`, measures a signal on one of the Ref-Mx pins
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuxTdc(pub u8);

impl AuxTdc {
    /// Rate of the signal on the Mx pin, Hz
    fn parent_rate<B: RegisterBus>(self: &Self, dev: &Ad9545<B>) -> u64 {
        dev.config.aux_tdcs[self.0 as usize].parent_rate_hz
    }

    fn divider(parent_rate: u64, rate: u64) -> u64 {
        div_ceil(parent_rate, rate).max(1).min(TDC_DIV_MAX)
    }
}

impl ClockOps for AuxTdc {
    /// f TDC = f Mx / DIV
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        let parent_rate = self.parent_rate(dev);
        let div = dev.bus.read(tdc_div(self.0 as usize))? as u64 + 1;
        Ok(div_ceil(parent_rate, div))
    }

    fn round_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        if rate == 0 {
            return Err(Error::ZeroRate);
        }
        let parent_rate = self.parent_rate(dev);
        Ok(div_ceil(parent_rate, Self::divider(parent_rate, rate)))
    }

    fn set_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        if rate == 0 {
            return Err(Error::ZeroRate);
        }

        let x = self.0 as usize;
        let parent_rate = self.parent_rate(dev);
        let period = period_attoseconds(parent_rate)?;
        dev.bus.write_be(tdc_period(x), period, 8)?;

        let div = Self::divider(parent_rate, rate);
        dev.bus.write(tdc_div(x), (div - 1) as u8)?;
        dev.io_update()?;

        Ok(div_ceil(parent_rate, div))
    }
}


/// AUX DPLL, tracks its source for holdover and compensation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuxDpll;

impl AuxDpll {
    pub fn parent<B>(self: &Self, dev: &Ad9545<B>) -> ClockId {
        match dev.config.aux_dpll.source {
            AuxDpllSource::Ref(n) => ClockId::RefInput(n),
            AuxDpllSource::AuxTdc(n) => ClockId::AuxTdc(n),
        }
    }
}

impl ClockOps for AuxDpll {
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        if !dev.config.aux_dpll.used {
            return Err(Error::NotConfigured);
        }
        self.parent(dev).recalc_rate(dev)
    }
}
