//! BP (Blitting Processor) register shadows: TEV, pixel engine, texture
//! sampler and indirect state.

pub mod indirect;
pub mod pixel;
pub mod tev;
pub mod tex;

use bitos::{bitos, integer::u3, integer::u4};
use strum::FromRepr;
use zerocopy::IntoBytes;

/// Every addressable BP register this crate models. Addresses not listed
/// here (texture image/TLUT setup, scissor, copy filter coefficients, and
/// other registers with no bearing on the high-level material record) are
/// accepted by [`Bp::write_masked`] but otherwise ignored.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum Reg {
    GenMode = 0x00,
    IndMatxA0 = 0x06,
    IndMatxB0 = 0x07,
    IndMatxC0 = 0x08,
    IndMatxA1 = 0x09,
    IndMatxB1 = 0x0A,
    IndMatxC1 = 0x0B,
    IndMatxA2 = 0x0C,
    IndMatxB2 = 0x0D,
    IndMatxC2 = 0x0E,
    IndCmd0 = 0x10,
    IndCmd1 = 0x11,
    IndCmd2 = 0x12,
    IndCmd3 = 0x13,
    IndCmd4 = 0x14,
    IndCmd5 = 0x15,
    IndCmd6 = 0x16,
    IndCmd7 = 0x17,
    IndCmd8 = 0x18,
    IndCmd9 = 0x19,
    IndCmd10 = 0x1A,
    IndCmd11 = 0x1B,
    IndCmd12 = 0x1C,
    IndCmd13 = 0x1D,
    IndCmd14 = 0x1E,
    IndCmd15 = 0x1F,
    RasIRef = 0x27,
    TevRefs01 = 0x28,
    TevRefs23 = 0x29,
    TevRefs45 = 0x2A,
    TevRefs67 = 0x2B,
    TevRefs89 = 0x2C,
    TevRefsAB = 0x2D,
    TevRefsCD = 0x2E,
    TevRefsEF = 0x2F,
    RasSs0 = 0x25,
    RasSs1 = 0x26,
    PixelZMode = 0x40,
    PixelBlendMode = 0x41,
    PixelConstantAlpha = 0x42,
    TexMode0_0 = 0x80,
    TexMode1_0 = 0x84,
    TexMode0_1 = 0x81,
    TexMode1_1 = 0x85,
    TexMode0_2 = 0x82,
    TexMode1_2 = 0x86,
    TexMode0_3 = 0x83,
    TexMode1_3 = 0x87,
    TexMode0_4 = 0xA0,
    TexMode1_4 = 0xA4,
    TexMode0_5 = 0xA1,
    TexMode1_5 = 0xA5,
    TexMode0_6 = 0xA2,
    TexMode1_6 = 0xA6,
    TexMode0_7 = 0xA3,
    TexMode1_7 = 0xA7,
    TevColor0 = 0xC0,
    TevAlpha0 = 0xC1,
    TevColor1 = 0xC2,
    TevAlpha1 = 0xC3,
    TevColor2 = 0xC4,
    TevAlpha2 = 0xC5,
    TevColor3 = 0xC6,
    TevAlpha3 = 0xC7,
    TevColor4 = 0xC8,
    TevAlpha4 = 0xC9,
    TevColor5 = 0xCA,
    TevAlpha5 = 0xCB,
    TevColor6 = 0xCC,
    TevAlpha6 = 0xCD,
    TevColor7 = 0xCE,
    TevAlpha7 = 0xCF,
    TevColor8 = 0xD0,
    TevAlpha8 = 0xD1,
    TevColor9 = 0xD2,
    TevAlpha9 = 0xD3,
    TevColor10 = 0xD4,
    TevAlpha10 = 0xD5,
    TevColor11 = 0xD6,
    TevAlpha11 = 0xD7,
    TevColor12 = 0xD8,
    TevAlpha12 = 0xD9,
    TevColor13 = 0xDA,
    TevAlpha13 = 0xDB,
    TevColor14 = 0xDC,
    TevAlpha14 = 0xDD,
    TevColor15 = 0xDE,
    TevAlpha15 = 0xDF,
    TevConstant3AR = 0xE0,
    TevConstant3GB = 0xE1,
    TevConstant0AR = 0xE2,
    TevConstant0GB = 0xE3,
    TevConstant1AR = 0xE4,
    TevConstant1GB = 0xE5,
    TevConstant2AR = 0xE6,
    TevConstant2GB = 0xE7,
    TevAlphaFunc = 0xF3,
    TevKSel0 = 0xF6,
    TevKSel1 = 0xF7,
    TevKSel2 = 0xF8,
    TevKSel3 = 0xF9,
    TevKSel4 = 0xFA,
    TevKSel5 = 0xFB,
    TevKSel6 = 0xFC,
    TevKSel7 = 0xFD,
    WriteMask = 0xFE,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullingMode {
    #[default]
    None = 0b00,
    Negative = 0b01,
    Positive = 0b10,
    All = 0b11,
}

/// `GENMODE`: stage/texgen/channel counts plus cull mode, shared by both the
/// vertex and fragment pipelines.
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct GenMode {
    #[bits(0..4)]
    pub tex_coords_count: u4,
    #[bits(4..8)]
    pub color_channels_count: u4,
    #[bits(9)]
    pub multisampling: bool,
    #[bits(10..14)]
    pub tev_stages_minus_one: u4,
    #[bits(14..16)]
    pub culling_mode: CullingMode,
    #[bits(16..19)]
    pub bumpmap_count: u3,
    #[bits(19)]
    pub z_freeze: bool,
}

/// Shadow of every BP register this crate tracks. Fields not covered by a
/// known [`Reg`] variant are silently ignored on write (matched by hardware:
/// unimplemented BP addresses are no-ops, not faults).
#[derive(Debug, Clone, Default)]
pub struct Bp {
    pub mode: GenMode,

    pub ind_mtx: [indirect::IndMtxRegister; 3],
    pub ind_ref: indirect::IndirectRef,
    pub ind_scale: [indirect::IndirectScalePair; 2],
    pub ind_cmd: [indirect::IndirectCommand; 16],

    pub tev_refs: [tev::StageRefsPair; 8],
    pub tev_consts: [tev::StageConstsPair; 8],
    pub tev_ops: [tev::StageOps; 16],
    /// The `Registers` bank (color-typed writes to `TEV_COLOR_RA/BG+2i`).
    pub tev_registers: [tev::TevRegisterPair; 4],
    /// The `Konstants` bank (konst-typed writes to the same addresses).
    /// Hardware keeps these two banks independent and picks one per write
    /// by the value's own discriminator bit, not by address alone (§4.3).
    pub tev_konsts: [tev::TevRegisterPair; 4],
    pub alpha_function: tev::AlphaFunction,

    pub depth_mode: pixel::DepthMode,
    pub blend_mode: pixel::BlendMode,
    pub constant_alpha: pixel::ConstantAlpha,

    pub tex_mode0: [tex::TexMode0; 8],
    pub tex_mode1: [tex::TexMode1; 8],

    /// Bit `i` set means `IndCmd{i}` has been written at least once. The
    /// lifter uses this to distinguish "written as all-zero" from "never
    /// written" when a TEV stage's indirect sub-stage references a slot
    /// (§4.3's `IND_CMD` gap recovery).
    pub ind_cmd_written: u16,

    /// Sticky `BP_MASK`: applies to the next write only, then resets.
    write_mask: u32,
}

impl Bp {
    pub fn new() -> Self {
        Self {
            write_mask: 0x00FF_FFFF,
            ..Default::default()
        }
    }

    /// Applies one BP register write, honoring the sticky mask rule: the
    /// mask set by a prior `BP_MASK` write applies to this write only, and
    /// is consumed (reset to all-ones) regardless of whether this write
    /// matched a known register.
    pub fn write_masked(&mut self, reg: Reg, value: u32) {
        let mask = std::mem::replace(&mut self.write_mask, 0x00FF_FFFF);
        let masked = value & mask;

        macro_rules! write_masked {
            ($target:expr) => {{
                let old = $target.to_bits() & !mask;
                let new = old | masked;
                new.write_ne_bytes($target.as_mut_bytes());
            }};
        }

        // `TEV_COLOR_RA/BG` share their address between a `Registers` bank
        // and a `Konstants` bank; which one a write lands in is decided by
        // bit 23 of the masked value itself, not by the address (§4.3).
        macro_rules! route_tev_half {
            ($half:ident, $idx:expr) => {{
                if (masked >> 23) & 1 != 0 {
                    write_masked!(self.tev_konsts[$idx].$half)
                } else {
                    write_masked!(self.tev_registers[$idx].$half)
                }
            }};
        }

        match reg {
            Reg::GenMode => write_masked!(self.mode),
            Reg::IndMatxA0 => write_masked!(self.ind_mtx[0].a),
            Reg::IndMatxB0 => write_masked!(self.ind_mtx[0].b),
            Reg::IndMatxC0 => write_masked!(self.ind_mtx[0].c),
            Reg::IndMatxA1 => write_masked!(self.ind_mtx[1].a),
            Reg::IndMatxB1 => write_masked!(self.ind_mtx[1].b),
            Reg::IndMatxC1 => write_masked!(self.ind_mtx[1].c),
            Reg::IndMatxA2 => write_masked!(self.ind_mtx[2].a),
            Reg::IndMatxB2 => write_masked!(self.ind_mtx[2].b),
            Reg::IndMatxC2 => write_masked!(self.ind_mtx[2].c),
            Reg::RasIRef => write_masked!(self.ind_ref),
            Reg::RasSs0 => write_masked!(self.ind_scale[0]),
            Reg::RasSs1 => write_masked!(self.ind_scale[1]),
            Reg::TevRefs01 => write_masked!(self.tev_refs[0]),
            Reg::TevRefs23 => write_masked!(self.tev_refs[1]),
            Reg::TevRefs45 => write_masked!(self.tev_refs[2]),
            Reg::TevRefs67 => write_masked!(self.tev_refs[3]),
            Reg::TevRefs89 => write_masked!(self.tev_refs[4]),
            Reg::TevRefsAB => write_masked!(self.tev_refs[5]),
            Reg::TevRefsCD => write_masked!(self.tev_refs[6]),
            Reg::TevRefsEF => write_masked!(self.tev_refs[7]),
            Reg::PixelZMode => write_masked!(self.depth_mode),
            Reg::PixelBlendMode => write_masked!(self.blend_mode),
            Reg::PixelConstantAlpha => write_masked!(self.constant_alpha),
            Reg::TexMode0_0 => write_masked!(self.tex_mode0[0]),
            Reg::TexMode0_1 => write_masked!(self.tex_mode0[1]),
            Reg::TexMode0_2 => write_masked!(self.tex_mode0[2]),
            Reg::TexMode0_3 => write_masked!(self.tex_mode0[3]),
            Reg::TexMode0_4 => write_masked!(self.tex_mode0[4]),
            Reg::TexMode0_5 => write_masked!(self.tex_mode0[5]),
            Reg::TexMode0_6 => write_masked!(self.tex_mode0[6]),
            Reg::TexMode0_7 => write_masked!(self.tex_mode0[7]),
            Reg::TexMode1_0 => write_masked!(self.tex_mode1[0]),
            Reg::TexMode1_1 => write_masked!(self.tex_mode1[1]),
            Reg::TexMode1_2 => write_masked!(self.tex_mode1[2]),
            Reg::TexMode1_3 => write_masked!(self.tex_mode1[3]),
            Reg::TexMode1_4 => write_masked!(self.tex_mode1[4]),
            Reg::TexMode1_5 => write_masked!(self.tex_mode1[5]),
            Reg::TexMode1_6 => write_masked!(self.tex_mode1[6]),
            Reg::TexMode1_7 => write_masked!(self.tex_mode1[7]),
            Reg::TevColor0 => write_masked!(self.tev_ops[0].color),
            Reg::TevAlpha0 => write_masked!(self.tev_ops[0].alpha),
            Reg::TevColor1 => write_masked!(self.tev_ops[1].color),
            Reg::TevAlpha1 => write_masked!(self.tev_ops[1].alpha),
            Reg::TevColor2 => write_masked!(self.tev_ops[2].color),
            Reg::TevAlpha2 => write_masked!(self.tev_ops[2].alpha),
            Reg::TevColor3 => write_masked!(self.tev_ops[3].color),
            Reg::TevAlpha3 => write_masked!(self.tev_ops[3].alpha),
            Reg::TevColor4 => write_masked!(self.tev_ops[4].color),
            Reg::TevAlpha4 => write_masked!(self.tev_ops[4].alpha),
            Reg::TevColor5 => write_masked!(self.tev_ops[5].color),
            Reg::TevAlpha5 => write_masked!(self.tev_ops[5].alpha),
            Reg::TevColor6 => write_masked!(self.tev_ops[6].color),
            Reg::TevAlpha6 => write_masked!(self.tev_ops[6].alpha),
            Reg::TevColor7 => write_masked!(self.tev_ops[7].color),
            Reg::TevAlpha7 => write_masked!(self.tev_ops[7].alpha),
            Reg::TevColor8 => write_masked!(self.tev_ops[8].color),
            Reg::TevAlpha8 => write_masked!(self.tev_ops[8].alpha),
            Reg::TevColor9 => write_masked!(self.tev_ops[9].color),
            Reg::TevAlpha9 => write_masked!(self.tev_ops[9].alpha),
            Reg::TevColor10 => write_masked!(self.tev_ops[10].color),
            Reg::TevAlpha10 => write_masked!(self.tev_ops[10].alpha),
            Reg::TevColor11 => write_masked!(self.tev_ops[11].color),
            Reg::TevAlpha11 => write_masked!(self.tev_ops[11].alpha),
            Reg::TevColor12 => write_masked!(self.tev_ops[12].color),
            Reg::TevAlpha12 => write_masked!(self.tev_ops[12].alpha),
            Reg::TevColor13 => write_masked!(self.tev_ops[13].color),
            Reg::TevAlpha13 => write_masked!(self.tev_ops[13].alpha),
            Reg::TevColor14 => write_masked!(self.tev_ops[14].color),
            Reg::TevAlpha14 => write_masked!(self.tev_ops[14].alpha),
            Reg::TevColor15 => write_masked!(self.tev_ops[15].color),
            Reg::TevAlpha15 => write_masked!(self.tev_ops[15].alpha),
            Reg::TevConstant3AR => route_tev_half!(ra, 3),
            Reg::TevConstant3GB => route_tev_half!(bg, 3),
            Reg::TevConstant0AR => route_tev_half!(ra, 0),
            Reg::TevConstant0GB => route_tev_half!(bg, 0),
            Reg::TevConstant1AR => route_tev_half!(ra, 1),
            Reg::TevConstant1GB => route_tev_half!(bg, 1),
            Reg::TevConstant2AR => route_tev_half!(ra, 2),
            Reg::TevConstant2GB => route_tev_half!(bg, 2),
            Reg::IndCmd0 => {
                self.ind_cmd_written |= 1 << 0;
                write_masked!(self.ind_cmd[0]);
            }
            Reg::IndCmd1 => {
                self.ind_cmd_written |= 1 << 1;
                write_masked!(self.ind_cmd[1]);
            }
            Reg::IndCmd2 => {
                self.ind_cmd_written |= 1 << 2;
                write_masked!(self.ind_cmd[2]);
            }
            Reg::IndCmd3 => {
                self.ind_cmd_written |= 1 << 3;
                write_masked!(self.ind_cmd[3]);
            }
            Reg::IndCmd4 => {
                self.ind_cmd_written |= 1 << 4;
                write_masked!(self.ind_cmd[4]);
            }
            Reg::IndCmd5 => {
                self.ind_cmd_written |= 1 << 5;
                write_masked!(self.ind_cmd[5]);
            }
            Reg::IndCmd6 => {
                self.ind_cmd_written |= 1 << 6;
                write_masked!(self.ind_cmd[6]);
            }
            Reg::IndCmd7 => {
                self.ind_cmd_written |= 1 << 7;
                write_masked!(self.ind_cmd[7]);
            }
            Reg::IndCmd8 => {
                self.ind_cmd_written |= 1 << 8;
                write_masked!(self.ind_cmd[8]);
            }
            Reg::IndCmd9 => {
                self.ind_cmd_written |= 1 << 9;
                write_masked!(self.ind_cmd[9]);
            }
            Reg::IndCmd10 => {
                self.ind_cmd_written |= 1 << 10;
                write_masked!(self.ind_cmd[10]);
            }
            Reg::IndCmd11 => {
                self.ind_cmd_written |= 1 << 11;
                write_masked!(self.ind_cmd[11]);
            }
            Reg::IndCmd12 => {
                self.ind_cmd_written |= 1 << 12;
                write_masked!(self.ind_cmd[12]);
            }
            Reg::IndCmd13 => {
                self.ind_cmd_written |= 1 << 13;
                write_masked!(self.ind_cmd[13]);
            }
            Reg::IndCmd14 => {
                self.ind_cmd_written |= 1 << 14;
                write_masked!(self.ind_cmd[14]);
            }
            Reg::IndCmd15 => {
                self.ind_cmd_written |= 1 << 15;
                write_masked!(self.ind_cmd[15]);
            }
            Reg::TevKSel0 => write_masked!(self.tev_consts[0]),
            Reg::TevKSel1 => write_masked!(self.tev_consts[1]),
            Reg::TevKSel2 => write_masked!(self.tev_consts[2]),
            Reg::TevKSel3 => write_masked!(self.tev_consts[3]),
            Reg::TevKSel4 => write_masked!(self.tev_consts[4]),
            Reg::TevKSel5 => write_masked!(self.tev_consts[5]),
            Reg::TevKSel6 => write_masked!(self.tev_consts[6]),
            Reg::TevKSel7 => write_masked!(self.tev_consts[7]),
            Reg::WriteMask => {
                self.write_mask = value;
            }
            Reg::TevAlphaFunc => write_masked!(self.alpha_function),
            #[allow(unreachable_patterns)]
            _ => {
                tracing::warn!("unimplemented write to BP register {reg:?}: 0x{value:06X}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_consumed_after_one_write() {
        let mut bp = Bp::new();
        bp.write_masked(Reg::WriteMask, 0x0000_00FF);
        bp.write_masked(Reg::GenMode, 0xFFFF_FFFF);
        assert_eq!(bp.mode.to_bits() & 0xFFFF_FF00, 0);
        assert_eq!(bp.mode.to_bits() & 0xFF, 0xFF);

        bp.write_masked(Reg::GenMode, 0x0000_0000);
        assert_eq!(bp.mode.to_bits(), 0);
    }

    #[test]
    fn unmasked_write_is_a_plain_overwrite() {
        let mut bp = Bp::new();
        bp.write_masked(Reg::GenMode, 0x1234_5678);
        assert_eq!(bp.mode.to_bits(), 0x1234_5678 & 0x00FF_FFFF);
    }

    #[test]
    fn tev_color_and_konst_writes_to_the_same_slot_land_in_separate_banks() {
        let mut bp = Bp::new();
        let color = tev::TevRegisterPair::encode_color(-100, 200, -300, 400);
        let konst = tev::TevRegisterPair::encode_konst(10, 20, 30, 40);

        bp.write_masked(Reg::TevConstant0AR, u32::from(color.ra.to_bits()));
        bp.write_masked(Reg::TevConstant0GB, u32::from(color.bg.to_bits()));
        bp.write_masked(Reg::TevConstant0AR, u32::from(konst.ra.to_bits()));
        bp.write_masked(Reg::TevConstant0GB, u32::from(konst.bg.to_bits()));

        assert_eq!(
            bp.tev_registers[0].decode(),
            tev::TevRegisterValue::Color {
                r: -100,
                g: 200,
                b: -300,
                a: 400
            }
        );
        assert_eq!(
            bp.tev_konsts[0].decode(),
            tev::TevRegisterValue::Konst { r: 10, g: 20, b: 30, a: 40 }
        );
    }
}
