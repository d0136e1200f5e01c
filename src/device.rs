///! Device

use log::{error, info};

use crate::{
    bus::*,
    clock::*,
    config::*,
    constants::*,
    errors::*,
    register::*,
};


/// Runtime state of a DPLL channel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PllState {
    /// Number of enabled profiles
    pub num_parents: usize,
    /// Clock feeding each enabled profile, by profile index
    pub parents: [Option<ClockId>; MAX_DPLL_PROFILES],
    /// Frequency the DPLL NCO free-runs at, Hz
    pub free_run_freq_hz: u64,
    /// Profiles running with feedback tagging
    pub fb_tagging: [bool; MAX_DPLL_PROFILES],
}

impl PllState {
    fn new(config: &PllConfig) -> Self {
        let mut state = PllState::default();
        for (i, p) in config.profiles.iter().enumerate().filter(|(_, p)| p.enabled) {
            state.parents[i] = Some(match p.tdc_source.aux_nco() {
                Some(nco) => ClockId::AuxNco(nco as u8),
                None => ClockId::RefInput(p.tdc_source.index() as u8),
            });
        }
        state.num_parents = config.num_parents();
        state
    }
}


/// AD9545 device
pub struct Ad9545<B> {
    pub(crate) bus: B,
    pub(crate) config: DeviceConfig,
    pub(crate) sys_freq_hz: u64,
    pub(crate) plls: [PllState; NUM_PLLS],
}


impl<B> Ad9545<B>
where B: RegisterBus,
{
    /// Creates the device.
    ///
    /// `bus` - register access (see `SpiBus`, `I2cBus`)
    /// `config` - validated before anything is sent to the part
    ///
    /// Only reads the product ID, call `setup` to bring the device up.
    pub fn new(bus: B, config: DeviceConfig) -> Result<Self, Error> {
        config.validate()?;
        let sys_freq_hz = config.sys_clk.sys_freq_hz()?;

        let plls = [PllState::new(&config.plls[0]), PllState::new(&config.plls[1])];

        let mut dev = Ad9545 { bus, config, sys_freq_hz, plls };

        let id = dev.product_id()?;
        if id != PRODUCT_ID {
            error!("unrecognized product id {:#06x}", id);
            return Err(Error::UnknownDevice(id));
        }
        info!("AD9545 found");

        Ok(dev)
    }

    /// PRODUCT_ID register pair
    pub fn product_id(self: &mut Self) -> Result<u16, Error> {
        let lo = self.bus.read(PRODUCT_ID_LOW)?;
        let hi = self.bus.read(PRODUCT_ID_HIGH)?;
        Ok(((hi as u16) << 8) | lo as u16)
    }

    /// Transfers buffered register writes into the active register set.
    #[inline]
    pub fn io_update(self: &mut Self) -> Result<(), Error> {
        self.bus.write(IO_UPDATE, UPDATE_REGS)
    }

    /// Read-modify-write of the bits in `mask`
    #[inline]
    pub fn write_mask(self: &mut Self, addr: u16, mask: u8, data: u8) -> Result<(), Error> {
        self.bus.write_mask(addr, mask, data)
    }

    pub fn config(self: &Self) -> &DeviceConfig {
        &self.config
    }

    /// Internal system clock, Hz
    pub fn sys_freq_hz(self: &Self) -> u64 {
        self.sys_freq_hz
    }

    pub fn pll_state(self: &Self, pll: usize) -> Option<&PllState> {
        self.plls.get(pll)
    }

    pub fn recalc_rate(self: &mut Self, clk: ClockId) -> Result<u64, Error> {
        clk.recalc_rate(self)
    }

    pub fn round_rate(self: &mut Self, clk: ClockId, rate: u64) -> Result<u64, Error> {
        clk.round_rate(self, rate)
    }

    pub fn set_rate(self: &mut Self, clk: ClockId, rate: u64) -> Result<u64, Error> {
        clk.set_rate(self, rate)
    }

    pub fn enable(self: &mut Self, clk: ClockId) -> Result<(), Error> {
        clk.enable(self)
    }

    pub fn disable(self: &mut Self, clk: ClockId) -> Result<(), Error> {
        clk.disable(self)
    }

    /// Gives the register bus back
    pub fn release(self) -> B {
        self.bus
    }
}
