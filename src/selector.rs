//! DPLL reference / profile selection

use crate::{
    bus::*,
    config::DpllProfile,
    constants::*,
    errors::*,
    register::*,
};


/// Timing source a DPLL profile's TDC compares against
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TdcSource {
    RefA,
    RefAA,
    RefB,
    RefBB,
    AuxNco0,
    AuxNco1,
}

impl TdcSource {
    pub fn from_index(i: u8) -> Result<Self, Error> {
        match i {
            0 => Ok(TdcSource::RefA),
            1 => Ok(TdcSource::RefAA),
            2 => Ok(TdcSource::RefB),
            3 => Ok(TdcSource::RefBB),
            4 => Ok(TdcSource::AuxNco0),
            5 => Ok(TdcSource::AuxNco1),
            _ => Err(Error::InvalidTdcSource(i)),
        }
    }

    #[inline]
    pub fn index(self: &Self) -> usize {
        *self as usize
    }

    /// DPLLx_SOURCE register value
    #[inline]
    pub fn register_value(self: &Self) -> u8 {
        TDC_SOURCE_MAPPING[self.index()]
    }

    /// Reference input index, `None` for AUX NCOs
    pub fn reference(self: &Self) -> Option<usize> {
        match self {
            TdcSource::AuxNco0 | TdcSource::AuxNco1 => None,
            _ => Some(self.index()),
        }
    }

    /// AUX NCO index, `None` for reference inputs
    pub fn aux_nco(self: &Self) -> Option<usize> {
        match self {
            TdcSource::AuxNco0 => Some(0),
            TdcSource::AuxNco1 => Some(1),
            _ => None,
        }
    }
}


/// What currently drives a DPLL
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateSource {
    /// Enabled profile with this index
    Profile(usize),
    /// No valid profile, the DPLL free-runs off its tuning word
    FreeRun,
}


/// Reads the validity of `source` off the device.
pub fn source_valid<B: RegisterBus>(bus: &mut B, source: TdcSource) -> Result<bool, Error> {
    match source {
        TdcSource::AuxNco0 => Ok(bus.read(MISC)? & MISC_AUX_NCO0_ERR == 0),
        TdcSource::AuxNco1 => Ok(bus.read(MISC)? & MISC_AUX_NCO1_ERR == 0),
        _ => Ok(bus.read(ref_status(source.index()))? & REF_STATUS_VALID != 0),
    }
}


/// Highest priority valid candidate, `(profile index, priority, valid)`.
/// Lower priority value wins, the first of equal priorities is kept.
pub fn best_profile<I>(candidates: I) -> RateSource
where I: IntoIterator<Item = (usize, u8, bool)>
{
    let mut best: Option<(usize, u8)> = None;
    for (i, prio, valid) in candidates {
        if !valid {
            continue;
        }
        if best.map_or(true, |(_, best_prio)| prio < best_prio) {
            best = Some((i, prio));
        }
    }

    match best {
        Some((i, _)) => RateSource::Profile(i),
        None => RateSource::FreeRun,
    }
}


/// Commits pending registers, then picks the profile driving the DPLL.
pub fn select<B: RegisterBus>(bus: &mut B, profiles: &[DpllProfile]) -> Result<RateSource, Error> {
    bus.write(IO_UPDATE, UPDATE_REGS)?;

    let mut candidates = [(0usize, 0u8, false); MAX_DPLL_PROFILES];
    let mut count = 0;
    for (i, p) in profiles.iter().enumerate().filter(|(_, p)| p.enabled) {
        let valid = source_valid(bus, p.tdc_source)?;
        candidates[count] = (i, p.priority, valid);
        count += 1;
    }

    Ok(best_profile(candidates[..count].iter().copied()))
}
