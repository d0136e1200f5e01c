#![cfg_attr(not(test), no_std)]

//! [AD9545](https://www.analog.com/en/products/ad9545.html) driver.
//!
//! Quad input, 10 output, dual DPLL / APLL network clock synchronizer.
//!
//! ```ignore
//! let mut dev = Ad9545::new(SpiBus::new(spi, cs), config)?;
//! dev.setup(&mut delay)?;
//! let rate = dev.set_rate(ClockId::Output(0), 30_720_000)?;
//! ```

pub mod constants;
pub mod register;
pub mod errors;
pub mod bus;
pub mod frequency;
pub mod rational;
pub mod planner;
pub mod selector;
pub mod config;
pub mod clock;
pub mod device;
pub mod refin;
pub mod pll;
pub mod output;
pub mod auxiliary;
pub mod setup;

pub use crate::{
    bus::{I2cBus, RegisterBus, SpiBus},
    clock::{ClockId, ClockOps},
    config::*,
    device::Ad9545,
    errors::Error,
    selector::{RateSource, TdcSource},
};
