//! Fixed point frequency encodings

use crate::{constants::*, errors::*};


/// NCO center frequency: 16 bit integer part, 40 bit fractional part (Hz)
pub const NCO_CENTER_INT_WIDTH: u32 = 16;
pub const NCO_CENTER_FRAC_WIDTH: u32 = 40;
pub const NCO_CENTER_FREQ_MAX: u64 = (1 << (NCO_CENTER_INT_WIDTH + NCO_CENTER_FRAC_WIDTH)) - 1;
pub const NCO_CENTER_INT_MAX: u64 = (1 << NCO_CENTER_INT_WIDTH) - 1;

/// NCO offset frequency: 8 bit integer part, 24 bit fractional part (Hz)
pub const NCO_OFFSET_INT_WIDTH: u32 = 8;
pub const NCO_OFFSET_FRAC_WIDTH: u32 = 24;
pub const NCO_OFFSET_INT_MAX: u64 = (1 << NCO_OFFSET_INT_WIDTH) - 1;

/// Largest integer frequency center + offset can hold
pub const NCO_FREQ_INT_MAX: u64 = NCO_CENTER_INT_MAX + NCO_OFFSET_INT_MAX;

/// Center and offset radix points differ by this many bits
const NCO_ALIGN_SHIFT: u32 = NCO_CENTER_FRAC_WIDTH - NCO_OFFSET_FRAC_WIDTH;


/// Register image of an auxiliary NCO frequency
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NcoFrequency {
    /// 56 bit center frequency word
    pub center: u64,
    /// 32 bit offset frequency word
    pub offset: u32,
}

impl NcoFrequency {

    /// Splits an integer frequency between the center and offset words.
    ///
    /// Frequencies up to `NCO_CENTER_INT_MAX` go into the center word alone,
    /// the excess above it goes into the offset word. `NCO_FREQ_INT_MAX + 1`
    /// is reached by setting the fractional MSB of both words.
    pub fn from_hz(freq: u64) -> Result<Self, Error> {
        if freq > NCO_FREQ_INT_MAX + 1 {
            return Err(Error::NcoFrequencyOutOfRange(freq));
        }

        let use_fractional = freq == NCO_FREQ_INT_MAX + 1;
        let freq = if use_fractional { freq - 1 } else { freq };

        let (center_int, offset_int) =
            if freq <= NCO_CENTER_INT_MAX {
                (freq, 0)
            } else {
                (NCO_CENTER_INT_MAX, freq - NCO_CENTER_INT_MAX)
            };

        let mut center = center_int << NCO_CENTER_FRAC_WIDTH;
        let mut offset = (offset_int as u32) << NCO_OFFSET_FRAC_WIDTH;
        if use_fractional {
            center |= 1 << (NCO_CENTER_FRAC_WIDTH - 1);
            offset |= 1 << (NCO_OFFSET_FRAC_WIDTH - 1);
        }

        Self::new(center, offset)
    }

    /// Wraps raw register words, rejecting a center word wider than its field
    pub fn new(center: u64, offset: u32) -> Result<Self, Error> {
        if center > NCO_CENTER_FREQ_MAX {
            Err(Error::NcoFrequencyOutOfRange(center >> NCO_CENTER_FRAC_WIDTH))
        } else {
            Ok(NcoFrequency { center, offset })
        }
    }

    /// Center + offset in the center word's fixed point format
    pub fn total(self: &Self) -> u64 {
        self.center + ((self.offset as u64) << NCO_ALIGN_SHIFT)
    }

    /// Frequency rounded to the nearest Hz
    pub fn to_hz(self: &Self) -> u64 {
        let total = self.total();
        let int = total >> NCO_CENTER_FRAC_WIDTH;
        if total & (1 << (NCO_CENTER_FRAC_WIDTH - 1)) != 0 {
            int + 1
        } else {
            int
        }
    }
}


/// Period of `freq_hz` in attoseconds, the unit reference and TDC periods are programmed in.
pub fn period_attoseconds(freq_hz: u64) -> Result<u64, Error> {
    if freq_hz == 0 {
        Err(Error::ZeroFrequency)
    } else {
        Ok(ATTOS_PER_SEC / freq_hz)
    }
}

/// Inverse of `period_attoseconds`
pub fn frequency_from_period(period_as: u64) -> Result<u64, Error> {
    if period_as == 0 {
        Err(Error::ZeroFrequency)
    } else {
        Ok(ATTOS_PER_SEC / period_as)
    }
}


/// DPLL free-run tuning word width
pub const FTW_WIDTH: u32 = 48;

/// Free-run tuning word of the DPLL NCO.
/// DPLLx Freerun TW = (2 ^ 48) × (f NCO / f System)
///
/// The word is usable only when (2 ^ 48) / FTW = INT.FRAC with
/// 7 ≤ INT ≤ 13 and 0.05 ≤ FRAC ≤ 0.95.
pub fn free_run_tuning_word(freq_hz: u64, sys_freq_hz: u64) -> Result<u64, Error> {
    if sys_freq_hz == 0 {
        return Err(Error::ZeroFrequency);
    }

    let full: u128 = 1 << FTW_WIDTH;
    let ftw = full * freq_hz as u128 / sys_freq_hz as u128;
    if ftw == 0 {
        return Err(Error::InvalidTuningWord);
    }

    let ftw_int = full / ftw;
    if !(7..=13).contains(&ftw_int) {
        return Err(Error::InvalidTuningWord);
    }

    let ftw_frac = (100 * full / ftw) % 100;
    if !(5..=95).contains(&ftw_frac) {
        return Err(Error::InvalidTuningWord);
    }

    Ok(ftw as u64)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nco_small_frequency_lives_in_center_word() {
        let nco = NcoFrequency::from_hz(1000).unwrap();
        assert_eq!(nco.center, 1000 << 40);
        assert_eq!(nco.offset, 0);
        assert_eq!(nco.to_hz(), 1000);
    }

    #[test]
    fn nco_excess_spills_into_offset_word() {
        let nco = NcoFrequency::from_hz(65_600).unwrap();
        assert_eq!(nco.center, NCO_CENTER_INT_MAX << 40);
        assert_eq!(nco.offset, 65 << 24);
        assert_eq!(nco.to_hz(), 65_600);
    }

    #[test]
    fn nco_top_value_uses_fractional_bits() {
        let nco = NcoFrequency::from_hz(NCO_FREQ_INT_MAX + 1).unwrap();
        assert_eq!(nco.center & (1 << 39), 1 << 39);
        assert_eq!(nco.offset & (1 << 23), 1 << 23);
        assert_eq!(nco.to_hz(), NCO_FREQ_INT_MAX + 1);
    }

    #[test]
    fn nco_rejects_out_of_range() {
        assert_eq!(
            NcoFrequency::from_hz(NCO_FREQ_INT_MAX + 2),
            Err(Error::NcoFrequencyOutOfRange(NCO_FREQ_INT_MAX + 2))
        );
        assert!(NcoFrequency::new(1 << 56, 0).is_err());
    }

    #[test]
    fn nco_decode_rounds_on_top_fraction_bit() {
        let nco = NcoFrequency::new((10 << 40) | (1 << 39), 0).unwrap();
        assert_eq!(nco.to_hz(), 11);
        let nco = NcoFrequency::new((10 << 40) | ((1 << 39) - 1), 0).unwrap();
        assert_eq!(nco.to_hz(), 10);
    }

    #[test]
    fn period_round_trip() {
        assert_eq!(period_attoseconds(10_000_000).unwrap(), 100_000_000_000);
        assert_eq!(frequency_from_period(100_000_000_000).unwrap(), 10_000_000);
        assert_eq!(period_attoseconds(0), Err(Error::ZeroFrequency));
        assert_eq!(frequency_from_period(0), Err(Error::ZeroFrequency));
    }

    #[test]
    fn ftw_within_bounds() {
        // 2260 MHz / 245.76 MHz = 9.19
        let ftw = free_run_tuning_word(245_760_000, 2_260_000_000).unwrap();
        assert_eq!(ftw, ((1u128 << 48) * 245_760_000 / 2_260_000_000) as u64);
    }

    #[test]
    fn ftw_integer_part_out_of_range() {
        // ratio 113
        assert_eq!(free_run_tuning_word(20_000_000, 2_260_000_000), Err(Error::InvalidTuningWord));
        // ratio 4.5
        assert_eq!(free_run_tuning_word(500_000_000, 2_250_000_000), Err(Error::InvalidTuningWord));
    }

    #[test]
    fn ftw_fraction_out_of_range() {
        // ratio exactly 10.00
        assert_eq!(free_run_tuning_word(226_000_000, 2_260_000_000), Err(Error::InvalidTuningWord));
        assert_eq!(free_run_tuning_word(0, 2_260_000_000), Err(Error::InvalidTuningWord));
    }
}
