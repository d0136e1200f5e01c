//! AD9545 registers
//!
//! Register addresses (15 bit) and the layout of the byte registers the
//! driver composes field by field.

use core::marker::PhantomData;

pub const CONFIG_0: u16 = 0x0000;
pub const PRODUCT_ID_LOW: u16 = 0x0004;
pub const PRODUCT_ID_HIGH: u16 = 0x0005;
pub const IO_UPDATE: u16 = 0x000F;
pub const M0_PIN: u16 = 0x0102;
pub const SYS_CLK_FB_DIV: u16 = 0x0200;
pub const SYS_CLK_INPUT: u16 = 0x0201;
pub const SYS_CLK_REF_FREQ: u16 = 0x0202;
pub const STABILITY_TIMER: u16 = 0x0207;
pub const COMPENSATE_TDCS: u16 = 0x0280;
pub const COMPENSATE_NCOS: u16 = 0x0281;
pub const COMPENSATE_DPLL: u16 = 0x0282;
pub const AUX_DPLL_CHANGE_LIMIT: u16 = 0x0283;
pub const AUX_DPLL_SOURCE: u16 = 0x0284;
pub const AUX_DPLL_LOOP_BW: u16 = 0x0285;
pub const REF_A_CTRL: u16 = 0x0300;
pub const DRIVER_0A_CONF: u16 = 0x10D7;
pub const DRIVER_1A_CONF: u16 = 0x14D7;
pub const CALIB_CLK: u16 = 0x2000;
pub const POWER_DOWN_REF: u16 = 0x2001;
pub const PLL_STATUS: u16 = 0x3001;
pub const MISC: u16 = 0x3002;

/// CONFIG_0: soft reset, both mirrored bits self-clear
pub const RESET_REGS: u8 = 0x81;
/// IO_UPDATE: transfer buffered registers into the active set
pub const UPDATE_REGS: u8 = 0x01;

/// R divider occupies 30 bits of the 4 byte field
pub const R_DIV_MASK: u64 = 0x3FFF_FFFF;
/// Stability timer occupies 20 bits of the 3 byte field
pub const STABILITY_PERIOD_MASK: u64 = 0x000F_FFFF;

/// REFx_STATUS
pub const REF_STATUS_VALID: u8 = 1 << 4;

/// MISC
pub const MISC_AUX_DPLL_LOCK: u8 = 1 << 1;
pub const MISC_AUX_DPLL_REF_FAULT: u8 = 1 << 2;
pub const MISC_AUX_NCO0_ERR: u8 = 0b0011_0000;
pub const MISC_AUX_NCO1_ERR: u8 = 0b1100_0000;

/// PLL_STATUS: both system clock bits set once the system PLL is stable
pub const SYS_PLL_STABLE_MASK: u8 = 0b11;

/// PLL_STATUS: DPLL/APLL `x` locked
#[inline]
pub fn pll_locked(x: usize, status: u8) -> bool {
    status & (1 << (4 + x)) != 0
}

/// PLLx_STATUS
pub const APLL_LOCKED: u8 = 1 << 3;

/// PWR_CALIB_CHx
pub const CALIB_APLL: u8 = 1 << 1;

/// DIV_OPS_Qx mute bits (A / AA half of the pair)
pub const DIV_OPS_MUTE_A: u8 = 1 << 2;
pub const DIV_OPS_MUTE_AA: u8 = 1 << 3;

/// MODULATOR_xx
pub const MODULATOR_EN: u8 = 1 << 0;

/// NSHOT_REQ_CHx
pub const NSHOT_NR_MASK: u8 = 0x3F;

/// CTRL_CHx
pub const CTRL_CH_NSHOT: u8 = 1 << 0;

/// Compensation routed through the AUX DPLL
pub const COMPENSATE_TDCS_VIA_AUX_DPLL: u8 = 0x04;
pub const COMPENSATE_NCOS_VIA_AUX_DPLL: u8 = 0x44;
pub const COMPENSATE_DPLL_VIA_AUX_DPLL: u8 = 0x44;

/// System clock VCO calibration sequence
pub const VCO_CALIBRATION_OP: [(u16, u8); 4] = [
    (CALIB_CLK, 0),
    (IO_UPDATE, UPDATE_REGS),
    (CALIB_CLK, 1 << 2),
    (IO_UPDATE, UPDATE_REGS),
];

#[inline] pub fn mx_pin(x: u8) -> u16 { M0_PIN + x as u16 }
/// Mx pin routing value selecting AUX TDC `x`
#[inline] pub fn mx_to_tdc(x: u8) -> u8 { 0x30 + x }

#[inline] pub fn ref_ctrl(pair: usize) -> u16 { REF_A_CTRL + (pair as u16) * 4 }
#[inline] pub fn ref_r_div(x: usize) -> u16 { 0x0400 + (x as u16) * 0x20 }
#[inline] pub fn ref_period(x: usize) -> u16 { 0x0404 + (x as u16) * 0x20 }
#[inline] pub fn ref_offset_limit(x: usize) -> u16 { 0x040C + (x as u16) * 0x20 }
#[inline] pub fn ref_monitor_hyst(x: usize) -> u16 { 0x040F + (x as u16) * 0x20 }
#[inline] pub fn ref_valid_timer(x: usize) -> u16 { 0x0410 + (x as u16) * 0x20 }
#[inline] pub fn ref_status(x: usize) -> u16 { 0x3005 + x as u16 }

/// Lock detector registers, one block per timing source (refs, then NCOs)
#[inline] pub fn source_phase_thresh(x: usize) -> u16 { 0x0800 + (x as u16) * 0x20 }
#[inline] pub fn source_phase_lock_fill(x: usize) -> u16 { 0x0803 + (x as u16) * 0x20 }
#[inline] pub fn source_phase_lock_drain(x: usize) -> u16 { 0x0804 + (x as u16) * 0x20 }
#[inline] pub fn source_freq_thresh(x: usize) -> u16 { 0x0805 + (x as u16) * 0x20 }
#[inline] pub fn source_freq_lock_fill(x: usize) -> u16 { 0x0808 + (x as u16) * 0x20 }
#[inline] pub fn source_freq_lock_drain(x: usize) -> u16 { 0x0809 + (x as u16) * 0x20 }
#[inline] pub fn nco_phase_thresh(x: usize) -> u16 { source_phase_thresh(x + 4) }
#[inline] pub fn nco_freq_thresh(x: usize) -> u16 { source_freq_thresh(x + 4) }

#[inline] pub fn dpll_ftw(pll: usize) -> u16 { 0x1000 + (pll as u16) * 0x400 }
#[inline] pub fn dpll_slew_rate(pll: usize) -> u16 { 0x1011 + (pll as u16) * 0x400 }
#[inline] pub fn apll_m_div(pll: usize) -> u16 { 0x1081 + (pll as u16) * 0x400 }
#[inline] pub fn nshot_req_ch(ch: usize) -> u16 { 0x10D3 + (ch as u16) * 0x400 }
#[inline] pub fn sync_ctrl(pll: usize) -> u16 { 0x10DB + (pll as u16) * 0x400 }

#[inline]
fn dpll_profile(base: u16, pll: usize, profile: usize) -> u16 {
    base + (pll as u16) * 0x400 + (profile as u16) * 0x20
}

#[inline] pub fn dpll_en(pll: usize, p: usize) -> u16 { dpll_profile(0x1200, pll, p) }
#[inline] pub fn dpll_source(pll: usize, p: usize) -> u16 { dpll_profile(0x1201, pll, p) }
#[inline] pub fn dpll_fb_path(pll: usize, p: usize) -> u16 { dpll_profile(0x1202, pll, p) }
#[inline] pub fn dpll_fb_mode(pll: usize, p: usize) -> u16 { dpll_profile(0x1203, pll, p) }
#[inline] pub fn dpll_loop_bw(pll: usize, p: usize) -> u16 { dpll_profile(0x1204, pll, p) }
#[inline] pub fn dpll_hitless_n(pll: usize, p: usize) -> u16 { dpll_profile(0x1208, pll, p) }
#[inline] pub fn dpll_n_div(pll: usize, p: usize) -> u16 { dpll_profile(0x120C, pll, p) }
#[inline] pub fn dpll_frac(pll: usize, p: usize) -> u16 { dpll_profile(0x1210, pll, p) }
#[inline] pub fn dpll_mod(pll: usize, p: usize) -> u16 { dpll_profile(0x1213, pll, p) }
#[inline] pub fn dpll_fast_l1(pll: usize, p: usize) -> u16 { dpll_profile(0x1216, pll, p) }
#[inline] pub fn dpll_fast_l2(pll: usize, p: usize) -> u16 { dpll_profile(0x1217, pll, p) }

/// Output Q divider, outputs 6.. live in the DPLL1 page
#[inline]
pub fn q_div(out: usize) -> u16 {
    if out >= 6 {
        0x1500 + ((out - 6) as u16) * 0x9
    } else {
        0x1100 + (out as u16) * 0x9
    }
}

/// Output driver pair operations (mute bits)
#[inline]
pub fn div_ops(out: usize) -> u16 {
    let pair = out / 2;
    if pair > 2 {
        0x2202 + (pair - 3) as u16
    } else {
        0x2102 + pair as u16
    }
}

/// Driver configuration register of driver pair `pair`
#[inline]
pub fn driver_conf(pair: usize) -> u16 {
    if pair < 3 {
        DRIVER_0A_CONF + pair as u16
    } else {
        DRIVER_1A_CONF + (pair - 3) as u16
    }
}

#[inline] pub fn pwr_calib_ch(pll: usize) -> u16 { 0x2100 + (pll as u16) * 0x100 }
#[inline] pub fn ctrl_ch(ch: usize) -> u16 { 0x2101 + (ch as u16) * 0x100 }
#[inline] pub fn dpll_fast_mode(pll: usize) -> u16 { 0x2106 + (pll as u16) * 0x100 }
#[inline] pub fn pllx_status(pll: usize) -> u16 { 0x3100 + (pll as u16) * 0x100 }

#[inline] pub fn nco_center_freq(x: usize) -> u16 { 0x2800 + (x as u16) * 0x40 }
#[inline] pub fn nco_offset_freq(x: usize) -> u16 { 0x2807 + (x as u16) * 0x40 }
#[inline] pub fn tdc_div(x: usize) -> u16 { 0x2A00 + (x as u16) * 0x9 }
#[inline] pub fn tdc_period(x: usize) -> u16 { 0x2A01 + (x as u16) * 0x9 }

/// Per-output modulator / N-shot registers
#[derive(Debug, Copy, Clone)]
pub struct OutputRegs {
    pub modulator: u16,
    pub modulation_counter: u16,
    pub nshot_en: u16,
    pub nshot_en_mask: u8,
}

const fn out_regs(modulator: u16, modulation_counter: u16, nshot_en: u16, bit: u8) -> OutputRegs {
    OutputRegs { modulator, modulation_counter, nshot_en, nshot_en_mask: 1 << bit }
}

pub const OUTPUT_REGS: [OutputRegs; 10] = [
    out_regs(0x10CF, 0x10C2, 0x10D4, 0),
    out_regs(0x10CF, 0x10C2, 0x10D4, 2),
    out_regs(0x10D0, 0x10C6, 0x10D4, 4),
    out_regs(0x10D0, 0x10C6, 0x10D4, 6),
    out_regs(0x10D1, 0x10CA, 0x10D5, 0),
    out_regs(0x10D1, 0x10CA, 0x10D5, 2),
    out_regs(0x14CF, 0x14C2, 0x14D4, 0),
    out_regs(0x14CF, 0x14C2, 0x14D4, 2),
    out_regs(0x14D0, 0x14C6, 0x14D4, 4),
    out_regs(0x14D0, 0x14C6, 0x14D4, 6),
];


/// Register layout marker types
macro_rules! gen_register_marker {
    ($(#[$meta:meta])* $r:ident) => {
        $(#[$meta])*
        #[derive(Debug,Copy,Clone)]
        pub struct $r {}
    }
}

gen_register_marker!(
    /// SYS_CLK_INPUT
    SysClkInput
);
gen_register_marker!(
    /// REF_x_CTRL, one per reference pair
    RefCtrl
);
gen_register_marker!(
    /// DPLLx_EN, per profile
    ProfileEn
);
gen_register_marker!(
    /// DPLLx_FB_MODE, per profile
    FbMode
);
gen_register_marker!(
    /// DPLLx_FAST_L2, per profile
    FastL2
);
gen_register_marker!(
    /// DRIVER_xx_CONF, per driver pair
    DriverConf
);
gen_register_marker!(
    /// SYNC_CTRLx
    SyncCtrl
);


/// Single byte register with layout `R`
#[derive(Debug,Copy,Clone)]
pub struct Reg<R> {
    /// Register byte
    pub b: u8,
    phantom: PhantomData<R>,
}

impl<R> Default for Reg<R> {
    #[inline]
    fn default() -> Self { Reg { b: 0, phantom: PhantomData } }
}

/// Bit operations on register bytes
impl<R> Reg<R> {
    #[inline]
    pub fn new(b: u8) -> Self { Reg { b, phantom: PhantomData } }

    #[inline]
    pub fn get<F>(self: &Self) -> F
    where F: Sized + BitField<R> + From<u8>
    {
        F::from(
            (self.b >> F::offset()) & F::mask()
        )
    }

    #[inline]
    pub fn set<F>(mut self: Self, f: F) -> Self
    where F: Sized + BitField<R> + Into<u8>
    {
        let fbits = (f.into() & F::mask()) << F::offset();
        let rbits = self.b & (! ( F::mask() << F::offset() ));
        self.b = rbits | fbits;
        self
    }

    /// Bits covered by field `F`, in place
    #[inline]
    pub fn field_mask<F>() -> u8
    where F: BitField<R>
    {
        F::mask() << F::offset()
    }
}


/// Bit operations on 8bit registers
pub trait BitField<R> {
    /// Number of bits in the bit field
    fn num_bits() -> u8;

    /// Offset from 0
    fn offset() -> u8;

    #[inline]
    fn mask() -> u8 {
        !(0xFFFFu16 << Self::num_bits()) as u8
    }
}

/// Generate BitField implementation
macro_rules! gen_bitfield_impl {
	($r:ty, $n:ident, $nb:tt, $off:tt) => {
        impl BitField<$r> for $n {
            #[inline] fn num_bits() -> u8 { $nb }
            #[inline] fn offset() -> u8 { $off }
        }
    }
}

/// Small bitfield-encoded numbers boilerplate
macro_rules! gen_bitfield_struct {
	($(#[$meta:meta])*, $r:ty, $n:ident, $nb:tt, $off:tt) => {
        $(#[$meta])*
        #[derive(Debug,Copy,Clone,PartialEq,Eq)]
        pub struct $n(pub u8);

        gen_bitfield_impl!($r, $n, $nb, $off);

        impl From<u8> for $n { #[inline] fn from(x: u8) -> Self { $n(x) } }
        impl From<$n> for u8 { #[inline] fn from(f: $n) -> u8 { f.0 } }
	};
}

/// Enum fields, the first listed variant decodes any unlisted value
macro_rules! gen_bitfield_enum {
	($r:ty, $n:ident, $nb:tt, $off:tt, [$first:ident $(, $v:ident)*]) => {
        gen_bitfield_impl!($r, $n, $nb, $off);

        impl From<u8> for $n {
            #[inline]
            fn from(x: u8) -> Self {
                match x {
                    $( x if x == $n::$v as u8 => $n::$v, )*
                    _ => $n::$first,
                }
            }
        }
        impl From<$n> for u8 { #[inline] fn from(f: $n) -> u8 { f as u8 } }
    }
}


/// Frequency doubler on the system clock reference input.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum SysClkDoubler {
    Disabled,
    Enabled,
}
gen_bitfield_enum!(SysClkInput, SysClkDoubler, 1, 0, [Disabled, Enabled]);

/// Crystal maintaining amplifier, needed when XOA/XOB is driven by a crystal.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum CrystalAmplifier {
    Disabled,
    Enabled,
}
gen_bitfield_enum!(SysClkInput, CrystalAmplifier, 1, 3, [Disabled, Enabled]);


/// Reference pair operates as two single-ended inputs or one differential input.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum RefPairMode {
    SingleEnded,
    Differential,
}
gen_bitfield_enum!(RefCtrl, RefPairMode, 1, 0, [SingleEnded, Differential]);

gen_bitfield_struct!(
    /// Differential receiver coupling
    , RefCtrl, DiffCoupling, 2, 2
);

gen_bitfield_struct!(
    /// Single-ended coupling of the first pin of the pair (Ref-A / Ref-B)
    , RefCtrl, RefCoupling, 2, 4
);

gen_bitfield_struct!(
    /// Single-ended coupling of the second pin of the pair (Ref-AA / Ref-BB)
    , RefCtrl, RefNCoupling, 2, 6
);


/// Profile takes part in reference selection
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum ProfileEnable {
    Disabled,
    Enabled,
}
gen_bitfield_enum!(ProfileEn, ProfileEnable, 1, 0, [Disabled, Enabled]);

gen_bitfield_struct!(
    /// Selection priority, 0 is the highest
    , ProfileEn, SelectionPriority, 5, 1
);


/// Hitless (zero-delay) feedback through an output divider.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum Hitless {
    Disabled,
    Enabled,
}
gen_bitfield_enum!(FbMode, Hitless, 1, 0, [Disabled, Enabled]);

/// Tagging applied to the feedback path. Feedback below 2 kHz must be tagged.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum TagMode {
    NoTagging = 0,
    FeedbackPath = 2,
}
gen_bitfield_enum!(FbMode, TagMode, 3, 2, [NoTagging, FeedbackPath]);

/// Base filter on the tagged feedback.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum BaseFilter {
    Disabled,
    Enabled,
}
gen_bitfield_enum!(FbMode, BaseFilter, 1, 7, [Disabled, Enabled]);


gen_bitfield_struct!(
    /// Index into the fast acquisition timeout map
    , FastL2, FastAcqSettle, 4, 0
);

gen_bitfield_struct!(
    /// Index into the fast acquisition timeout map
    , FastL2, FastAcqTimeout, 4, 4
);


/// Driver current direction
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum CurrentDirection {
    Sink,
    Source,
}
gen_bitfield_enum!(DriverConf, CurrentDirection, 1, 0, [Sink, Source]);

gen_bitfield_struct!(
    /// Index into the driver current table
    , DriverConf, DriveCurrent, 2, 1
);

/// Output driver topology
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum OutputMode {
    /// One divider, differential output
    SingleDivDif,
    /// One divider, both pins single-ended
    SingleDiv,
    /// Independent divider per pin
    DualDiv,
}
gen_bitfield_enum!(DriverConf, OutputMode, 2, 3, [SingleDivDif, SingleDiv, DualDiv]);


gen_bitfield_struct!(
    /// Output synchronization mode
    , SyncCtrl, SyncMode, 2, 0
);

/// Hold output sync until the DPLL has a reference
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum SyncDpllRef {
    Disabled,
    Enabled,
}
gen_bitfield_enum!(SyncCtrl, SyncDpllRef, 1, 2, [Disabled, Enabled]);
