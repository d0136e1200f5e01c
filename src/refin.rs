///! Input references
///! Ref-A / Ref-AA / Ref-B / Ref-BB, each followed by its R divider

use crate::{
    bus::*,
    clock::ClockOps,
    constants::*,
    device::Ad9545,
    errors::*,
    planner::div_round_closest,
    register::*,
    selector::{source_valid, TdcSource},
};


/// Reference input `n`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RefInput(pub u8);

impl RefInput {
    #[inline]
    fn addr(self: &Self) -> usize {
        self.0 as usize
    }

    /// R divider ratio currently programmed
    pub fn r_div<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u32, Error> {
        let reg = dev.bus.read_be(ref_r_div(self.addr()), 4)? & R_DIV_MASK;
        Ok(reg as u32 + 1)
    }

    /// Programs the R divider, `ratio` in 1 ..= 2^30
    pub fn set_r_div<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, ratio: u32) -> Result<(), Error> {
        if ratio == 0 || ratio > R_DIV_MAX {
            return Err(Error::InvalidRDivider(ratio));
        }

        dev.bus.write_be(ref_r_div(self.addr()), (ratio - 1) as u64, 4)?;
        dev.io_update()
    }

    /// Reference monitor reports a valid input
    pub fn is_valid<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<bool, Error> {
        source_valid(&mut dev.bus, TdcSource::from_index(self.0)?)
    }
}

impl ClockOps for RefInput {
    /// f REF DIV = f REF / R
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        let parent_rate = dev.config.refs[self.addr()].parent_rate_hz;
        let r = self.r_div(dev)?;
        Ok(div_round_closest(parent_rate, r as u64))
    }
}

