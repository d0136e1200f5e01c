//! Output dividers
//!
//! f Qx = f PLL / Q. Q0A ..= Q0CC hang off PLL0, Q1A ..= Q1BB off PLL1.

use crate::{
    bus::*,
    clock::*,
    constants::*,
    device::Ad9545,
    errors::*,
    planner::div_round_closest,
    pll::Pll,
    register::*,
};


/// Output `n` (Q0A = 0 ..= Q1BB = 9)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Output(pub u8);

impl Output {
    #[inline]
    fn addr(self: &Self) -> usize {
        self.0 as usize
    }

    /// DPLL channel the output belongs to
    #[inline]
    pub fn channel(self: &Self) -> usize {
        if self.addr() < OUTPUTS_PER_PLL0 { 0 } else { 1 }
    }

    pub fn parent(self: &Self) -> Pll {
        Pll(self.channel() as u8)
    }

    pub fn q_div<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        dev.bus.read_be(q_div(self.addr()), 4)
    }

    fn set_q_div<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, q: u64) -> Result<(), Error> {
        dev.bus.write_be(q_div(self.addr()), q, 4)?;
        dev.io_update()
    }

    /// Mutes or unmutes this half of the driver pair.
    pub fn set_mute<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, mute: bool) -> Result<(), Error> {
        let mask = if self.addr() % 2 == 1 { DIV_OPS_MUTE_AA } else { DIV_OPS_MUTE_A };
        let data = if mute { mask } else { 0 };
        dev.bus.write_mask(div_ops(self.addr()), mask, data)?;
        dev.io_update()
    }

    /// Burst length when N-shot mode is enabled for this output, 0 otherwise
    pub fn nshot<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u8, Error> {
        let regs = OUTPUT_REGS[self.addr()];
        if dev.bus.read(regs.nshot_en)? & regs.nshot_en_mask == 0 {
            return Ok(0);
        }
        Ok(dev.bus.read(nshot_req_ch(self.channel()))? & NSHOT_NR_MASK)
    }

    /// Enables N-shot mode with bursts of `pulses` edges, 0 disables it.
    /// The burst length is shared by all outputs of the channel.
    pub fn set_nshot<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, pulses: u8) -> Result<(), Error> {
        if pulses > MAX_NSHOT_PULSES {
            return Err(Error::InvalidNShotPulses(pulses));
        }

        let regs = OUTPUT_REGS[self.addr()];
        if pulses > 0 {
            dev.bus.write_mask(nshot_req_ch(self.channel()), NSHOT_NR_MASK, pulses)?;
            dev.bus.write_mask(regs.nshot_en, regs.nshot_en_mask, regs.nshot_en_mask)?;
        } else {
            dev.bus.write_mask(regs.nshot_en, regs.nshot_en_mask, 0)?;
        }
        dev.io_update()
    }

    /// Fires one N-shot burst on the channel.
    pub fn trigger_nshot<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<(), Error> {
        let ctrl = ctrl_ch(self.channel());
        dev.bus.write_mask(ctrl, CTRL_CH_NSHOT, CTRL_CH_NSHOT)?;
        dev.io_update()?;
        dev.bus.write_mask(ctrl, CTRL_CH_NSHOT, 0)?;
        dev.io_update()
    }
}

impl ClockOps for Output {
    fn recalc_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<u64, Error> {
        let q = self.q_div(dev)?;
        let parent_rate = self.parent().recalc_rate(dev)?;
        if q == 0 {
            return Ok(0);
        }
        Ok(parent_rate / q)
    }

    fn round_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        if rate == 0 {
            return Err(Error::ZeroRate);
        }

        let parent_rate = self.parent().recalc_rate(dev)?;
        let q = div_round_closest(parent_rate, rate);
        if q == 0 {
            Ok(parent_rate)
        } else {
            Ok(parent_rate / q)
        }
    }

    fn set_rate<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>, rate: u64) -> Result<u64, Error> {
        if rate == 0 {
            return Err(Error::ZeroRate);
        }

        let parent_rate = self.parent().recalc_rate(dev)?;
        let q = div_round_closest(parent_rate, rate).max(1);
        self.set_q_div(dev, q)?;
        Ok(parent_rate / q)
    }

    /// Triggers a burst in N-shot mode, unmutes otherwise
    fn enable<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<(), Error> {
        if self.nshot(dev)? != 0 {
            self.trigger_nshot(dev)
        } else {
            self.set_mute(dev, false)
        }
    }

    /// N-shot outputs mute themselves at the end of the burst
    fn disable<B: RegisterBus>(self: &Self, dev: &mut Ad9545<B>) -> Result<(), Error> {
        if self.nshot(dev)? != 0 {
            Ok(())
        } else {
            self.set_mute(dev, true)
        }
    }
}
