//! Register access port
//!
//! The device core only talks to a [`RegisterBus`]. [`SpiBus`] and [`I2cBus`]
//! adapt `embedded-hal` blocking transports to it.

use embedded_hal::{
    blocking::{i2c, spi},
    digital::v2::OutputPin,
};

use crate::errors::*;

/// Byte-addressed register access.
///
/// Multi-byte transfers cover consecutive addresses starting at `addr`.
pub trait RegisterBus {
    fn read(&mut self, addr: u16) -> Result<u8, Error>;

    fn write(&mut self, addr: u16, data: u8) -> Result<(), Error>;

    fn read_multi(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error>;

    fn write_multi(&mut self, addr: u16, data: &[u8]) -> Result<(), Error>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    #[inline]
    fn read(&mut self, addr: u16) -> Result<u8, Error> { (**self).read(addr) }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) -> Result<(), Error> { (**self).write(addr, data) }

    #[inline]
    fn read_multi(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error> {
        (**self).read_multi(addr, buf)
    }

    #[inline]
    fn write_multi(&mut self, addr: u16, data: &[u8]) -> Result<(), Error> {
        (**self).write_multi(addr, data)
    }
}

/// Instruction word: R/W bit followed by the 15-bit register address.
#[inline]
fn instruction(addr: u16, read: bool) -> [u8; 2] {
    let rw = if read { 0x80 } else { 0x00 };
    [rw | ((addr >> 8) as u8 & 0x7F), (addr & 0xFF) as u8]
}

/// Longest multi-byte field is 8 bytes (reference period)
const MAX_FIELD_LEN: usize = 8;

/// 4-wire SPI, `CPOL = 0`, `CPHA = 0`, MSB first.
pub struct SpiBus<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiBus<SPI, CS>
where SPI: spi::Transfer<u8> + spi::Write<u8>,
      CS: OutputPin,
{
    /// `spi` - SPI device (`MOSI` => `SDIO`, `MISO` => `SDO`, `CLK` => `SCLK`)
    /// `cs` - chip select, active low
    pub fn new(spi: SPI, cs: CS) -> Self {
        SpiBus { spi, cs }
    }

    /// Gives the SPI device and chip select pin back
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn transaction<F>(self: &mut Self, f: F) -> Result<(), Error>
    where F: FnOnce(&mut SPI) -> Result<(), Error>
    {
        self.cs.set_low().map_err(|_| Error::Bus)?;
        let res = f(&mut self.spi);
        self.cs.set_high().map_err(|_| Error::Bus)?;
        res
    }
}

impl<SPI, CS> RegisterBus for SpiBus<SPI, CS>
where SPI: spi::Transfer<u8> + spi::Write<u8>,
      CS: OutputPin,
{
    fn read(&mut self, addr: u16) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        self.read_multi(addr, &mut b)?;
        Ok(b[0])
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), Error> {
        self.write_multi(addr, &[data])
    }

    fn read_multi(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error> {
        let ins = instruction(addr, true);
        self.transaction(|spi| {
            spi::Write::write(spi, &ins).map_err(|_| Error::Bus)?;
            for b in buf.iter_mut() { *b = 0; }
            spi::Transfer::transfer(spi, buf).map_err(|_| Error::Bus)?;
            Ok(())
        })
    }

    fn write_multi(&mut self, addr: u16, data: &[u8]) -> Result<(), Error> {
        let ins = instruction(addr, false);
        self.transaction(|spi| {
            spi::Write::write(spi, &ins).map_err(|_| Error::Bus)?;
            spi::Write::write(spi, data).map_err(|_| Error::Bus)
        })
    }
}

/// I2C, two address bytes followed by data.
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cBus<I2C>
where I2C: i2c::Write + i2c::WriteRead,
{
    /// `address` - 7-bit device address (set by the M pins at power-up)
    pub fn new(i2c: I2C, address: u8) -> Self {
        I2cBus { i2c, address }
    }

    /// Gives the I2C device back
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> RegisterBus for I2cBus<I2C>
where I2C: i2c::Write + i2c::WriteRead,
{
    fn read(&mut self, addr: u16) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        self.read_multi(addr, &mut b)?;
        Ok(b[0])
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), Error> {
        self.write_multi(addr, &[data])
    }

    fn read_multi(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error> {
        let ins = instruction(addr, false);
        i2c::WriteRead::write_read(&mut self.i2c, self.address, &ins, buf)
            .map_err(|_| Error::Bus)
    }

    fn write_multi(&mut self, addr: u16, data: &[u8]) -> Result<(), Error> {
        if data.len() > MAX_FIELD_LEN {
            return Err(Error::Bus);
        }
        let ins = instruction(addr, false);
        let mut frame = [0u8; 2 + MAX_FIELD_LEN];
        frame[..2].copy_from_slice(&ins);
        frame[2..2 + data.len()].copy_from_slice(data);
        i2c::Write::write(&mut self.i2c, self.address, &frame[..2 + data.len()])
            .map_err(|_| Error::Bus)
    }
}

/// Register bus operations built on top of byte access.
pub(crate) trait RegisterBusExt: RegisterBus {
    /// Reads a `len`-byte big-endian field
    fn read_be(&mut self, addr: u16, len: usize) -> Result<u64, Error> {
        debug_assert!(len >= 1 && len <= MAX_FIELD_LEN);
        let mut buf = [0u8; MAX_FIELD_LEN];
        self.read_multi(addr, &mut buf[..len])?;
        Ok(buf[..len].iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    /// Writes the low `len` bytes of `value`, most significant byte first
    fn write_be(&mut self, addr: u16, value: u64, len: usize) -> Result<(), Error> {
        debug_assert!(len >= 1 && len <= MAX_FIELD_LEN);
        let bytes = value.to_be_bytes();
        self.write_multi(addr, &bytes[MAX_FIELD_LEN - len..])
    }

    /// Read-modify-write of the bits in `mask`
    fn write_mask(&mut self, addr: u16, mask: u8, data: u8) -> Result<(), Error> {
        let b = self.read(addr)?;
        self.write(addr, (b & !mask) | (data & mask))
    }
}

impl<T: RegisterBus + ?Sized> RegisterBusExt for T {}
