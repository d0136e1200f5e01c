//! Clock tree
//!
//! Every rate-carrying block of the device implements [`ClockOps`]. Blocks are
//! addressed by [`ClockId`] and operate on the [`Ad9545`] that owns them.

use crate::{
    auxiliary::*,
    bus::RegisterBus,
    constants::*,
    device::Ad9545,
    errors::*,
    output::Output,
    pll::Pll,
    refin::RefInput,
};


/// Rate operations of a clock block.
///
/// `round_rate` has no side effects. `set_rate` returns the rate actually
/// programmed, which may differ from the request.
pub trait ClockOps {
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error>;

    fn round_rate<B: RegisterBus>(self: &Self, _dev: &mut Ad9545<B>, _rate: u64) -> Result<u64, Error> {
        Err(Error::Unsupported)
    }

    fn set_rate<B: RegisterBus>(self: &Self, _dev: &mut Ad9545<B>, _rate: u64) -> Result<u64, Error> {
        Err(Error::Unsupported)
    }

    fn enable<B: RegisterBus>(self: &Self, _dev: &mut Ad9545<B>) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    fn disable<B: RegisterBus>(self: &Self, _dev: &mut Ad9545<B>) -> Result<(), Error> {
        Err(Error::Unsupported)
    }
}


/// Clock block handle
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockId {
    /// Ref-A, Ref-AA, Ref-B, Ref-BB
    RefInput(u8),
    /// DPLL0 / DPLL1 with their APLLs
    Pll(u8),
    /// Q0A ..= Q1BB
    Output(u8),
    AuxNco(u8),
    AuxTdc(u8),
    AuxDpll,
}

impl ClockId {
    /// Checks the block index against the device
    pub fn validate(self: &Self) -> Result<(), Error> {
        let (i, n) = match *self {
            ClockId::RefInput(i) => (i, NUM_REFS),
            ClockId::Pll(i) => (i, NUM_PLLS),
            ClockId::Output(i) => (i, NUM_OUTPUTS),
            ClockId::AuxNco(i) => (i, NUM_AUX_NCOS),
            ClockId::AuxTdc(i) => (i, NUM_AUX_TDCS),
            ClockId::AuxDpll => (0, 1),
        };
        if (i as usize) < n { Ok(()) } else { Err(Error::NotConfigured) }
    }

    /// Human readable block name
    pub fn name(self: &Self) -> &'static str {
        const REFS: [&str; NUM_REFS] = ["Ref-A", "Ref-AA", "Ref-B", "Ref-BB"];
        const PLLS: [&str; NUM_PLLS] = ["PLL0", "PLL1"];
        const OUTS: [&str; NUM_OUTPUTS] = [
            "Q0A", "Q0AA", "Q0B", "Q0BB", "Q0C", "Q0CC", "Q1A", "Q1AA", "Q1B", "Q1BB",
        ];
        const NCOS: [&str; NUM_AUX_NCOS] = ["AUX_NCO0", "AUX_NCO1"];
        const TDCS: [&str; NUM_AUX_TDCS] = ["AUX_TDC0", "AUX_TDC1"];

        let pick = |names: &[&'static str], i: u8| names.get(i as usize).copied().unwrap_or("?");
        match *self {
            ClockId::RefInput(i) => pick(&REFS, i),
            ClockId::Pll(i) => pick(&PLLS, i),
            ClockId::Output(i) => pick(&OUTS, i),
            ClockId::AuxNco(i) => pick(&NCOS, i),
            ClockId::AuxTdc(i) => pick(&TDCS, i),
            ClockId::AuxDpll => "AUX_DPLL",
        }
    }
}

macro_rules! dispatch {
    ($id:expr, $clk:ident => $e:expr) => {
        match $id {
            ClockId::RefInput(i) => { let $clk = RefInput(i); $e }
            ClockId::Pll(i) => { let $clk = Pll(i); $e }
            ClockId::Output(i) => { let $clk = Output(i); $e }
            ClockId::AuxNco(i) => { let $clk = AuxNco(i); $e }
            ClockId::AuxTdc(i) => { let $clk = AuxTdc(i); $e }
            ClockId::AuxDpll => { let $clk = AuxDpll; $e }
        }
    };
}

impl ClockOps for ClockId {
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        self.validate()?;
        dispatch!(*self, c => c.recalc_rate(dev))
    }

    fn round_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        self.validate()?;
        dispatch!(*self, c => c.round_rate(dev, rate))
    }

    fn set_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        self.validate()?;
        dispatch!(*self, c => c.set_rate(dev, rate))
    }

    fn enable<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<(), Error> {
        self.validate()?;
        dispatch!(*self, c => c.enable(dev))
    }

    fn disable<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<(), Error> {
        self.validate()?;
        dispatch!(*self, c => c.disable(dev))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_ranges() {
        assert!(ClockId::Output(9).validate().is_ok());
        assert_eq!(ClockId::Output(10).validate(), Err(Error::NotConfigured));
        assert_eq!(ClockId::Pll(2).validate(), Err(Error::NotConfigured));
        assert!(ClockId::AuxDpll.validate().is_ok());
    }

    #[test]
    fn names() {
        assert_eq!(ClockId::Output(7).name(), "Q1AA");
        assert_eq!(ClockId::RefInput(2).name(), "Ref-B");
        assert_eq!(ClockId::AuxTdc(5).name(), "?");
    }
}
