//! Simulated AD9545 register file

#![allow(dead_code)]

use ad9545::{
    config::*,
    register::*,
    Error, RegisterBus, TdcSource,
};
use embedded_hal::blocking::delay::DelayMs;

/// Register map backed by memory, with the read-only status registers preset
/// the way a healthy, locked part reports them.
pub struct Regs {
    pub mem: Vec<u8>,
    /// Every write transaction, `(address, bytes)`
    pub writes: Vec<(u16, Vec<u8>)>,
    /// Soft reset bits never self-clear
    pub reset_stuck: bool,
    /// Every transfer fails
    pub broken: bool,
}

impl Regs {
    pub fn new() -> Self {
        let mut mem = vec![0u8; 0x8000];
        mem[PRODUCT_ID_LOW as usize] = 0x21;
        mem[PRODUCT_ID_HIGH as usize] = 0x01;
        // system clock stable + DPLL0/1 locked
        mem[PLL_STATUS as usize] = 0x33;
        mem[pllx_status(0) as usize] = APLL_LOCKED;
        mem[pllx_status(1) as usize] = APLL_LOCKED;
        mem[MISC as usize] = MISC_AUX_DPLL_LOCK;
        Regs { mem, writes: Vec::new(), reset_stuck: false, broken: false }
    }

    pub fn set_ref_valid(&mut self, r: usize, valid: bool) {
        self.mem[ref_status(r) as usize] = if valid { REF_STATUS_VALID } else { 0 };
    }

    /// Big-endian field currently in the register file
    pub fn field(&self, addr: u16, len: usize) -> u64 {
        let a = addr as usize;
        self.mem[a..a + len].iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
    }

    /// Write transactions to `addr`
    pub fn writes_to(&self, addr: u16) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, d)| d.as_slice())
            .collect()
    }

    pub fn was_written(&self, addr: u16) -> bool {
        self.writes.iter().any(|(a, _)| *a == addr)
    }
}

impl RegisterBus for Regs {
    fn read(&mut self, addr: u16) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        self.read_multi(addr, &mut b)?;
        Ok(b[0])
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), Error> {
        self.write_multi(addr, &[data])
    }

    fn read_multi(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error> {
        if self.broken {
            return Err(Error::Bus);
        }
        let a = addr as usize;
        buf.copy_from_slice(&self.mem[a..a + buf.len()]);
        Ok(())
    }

    fn write_multi(&mut self, addr: u16, data: &[u8]) -> Result<(), Error> {
        if self.broken {
            return Err(Error::Bus);
        }
        self.writes.push((addr, data.to_vec()));

        let a = addr as usize;
        self.mem[a..a + data.len()].copy_from_slice(data);

        if addr == CONFIG_0 && !self.reset_stuck {
            self.mem[a] &= !RESET_REGS;
        }
        Ok(())
    }
}

/// Counts requested sleeps instead of sleeping
#[derive(Default)]
pub struct Delay {
    pub calls: u32,
    pub total_ms: u32,
}

impl DelayMs<u32> for Delay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ms += ms;
    }
}

/// 10 MHz system clock reference (K = 226, 2.26 GHz)
pub fn base_config() -> DeviceConfig {
    let mut c = DeviceConfig::default();
    c.sys_clk = SystemClockConfig { ref_freq_hz: 10_000_000, crystal: false, doubler: false };
    c
}

/// Ref-A at `rate` Hz feeding profile 0 of PLL0
pub fn single_ref_config(rate: u64) -> DeviceConfig {
    let mut c = base_config();
    c.refs[0] = InputReferenceConfig {
        used: true,
        parent_rate_hz: rate,
        r_div_ratio: 1,
        d_tol_ppb: 100_000,
        valid_timer_ms: 10,
        freq_thresh_ps: 1_000,
        phase_thresh_ps: 500,
        ..Default::default()
    };
    c.plls[0].used = true;
    c.plls[0].profiles[0] = DpllProfile {
        enabled: true,
        priority: 0,
        tdc_source: TdcSource::RefA,
        loop_bw_uhz: 200_000_000,
        ..Default::default()
    };
    c
}

pub fn output(rate_hz: u64) -> OutputConfig {
    OutputConfig { used: true, rate_hz, ..Default::default() }
}
