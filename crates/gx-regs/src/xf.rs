//! XF (Transform Unit) register shadows: texgens, channel controls and the
//! material/ambient color pair feeding each lighting channel.
//!
//! Unlike BP, XF addresses are a flat 16-bit space and a single `XF` command
//! can write a run of consecutive registers in one go (see `gx-stream`'s
//! `Command::Xf`). The shadow only needs to know where each run starts.

use bitos::{
    bitos,
    integer::{u3, u4, u5},
};
use color::Rgba8;

/// Every addressable XF register this crate models, as the address of the
/// *first* register in a run (see [`Xf::write_run`]).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    MatColor0 = 0x00,
    MatColor1 = 0x01,
    AmbColor0 = 0x02,
    AmbColor1 = 0x03,
    ColorChan0 = 0x04,
    ColorChan1 = 0x05,
    AlphaChan0 = 0x06,
    AlphaChan1 = 0x07,
    TexCoordGen0 = 0x10,
    DualTex0 = 0x18,
}

impl Reg {
    fn from_address(address: u16) -> Option<Self> {
        match address {
            0x00 => Some(Self::MatColor0),
            0x01 => Some(Self::MatColor1),
            0x02 => Some(Self::AmbColor0),
            0x03 => Some(Self::AmbColor1),
            0x04 => Some(Self::ColorChan0),
            0x05 => Some(Self::ColorChan1),
            0x06 => Some(Self::AlphaChan0),
            0x07 => Some(Self::AlphaChan1),
            0x10..=0x17 => Some(Self::TexCoordGen0),
            0x18..=0x1F => Some(Self::DualTex0),
            _ => None,
        }
    }
}

#[bitos(1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSrc {
    #[default]
    Register = 0,
    Vertex = 1,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiffuseFn {
    #[default]
    None = 0,
    Sign = 1,
    Clamp = 2,
}

/// `XF_SETCHANn_COLOR`/`XF_SETCHANn_ALPHA`: one channel's lighting control.
///
/// Bit layout per the real `LitChannel` hardware union (`matsource`(0),
/// `lightFunc`(1), `lightMask0_3`(2..6), `ambsource`(6), `diffuseAtten`
/// (7..9), `attnEnable`(9), `attnSelect`(10), `lightMask4_7`(11..15)).
/// Unlike the other fields, the attenuation function is not a direct
/// bitfield: hardware derives it from `attn_enable`/`attn_select` (see
/// `gx_codec::lift::map_attenuation_fn` and its lowering inverse), so this
/// shadow exposes the two raw bits rather than a pre-decoded enum.
#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelControl {
    #[bits(0)]
    pub mat_source: ColorSrc,
    #[bits(1)]
    pub enabled: bool,
    #[bits(2..6)]
    pub light_mask_lo: u4,
    #[bits(6)]
    pub amb_source: ColorSrc,
    #[bits(7..9)]
    pub diffuse_fn: DiffuseFn,
    #[bits(9)]
    pub attn_enable: bool,
    #[bits(10)]
    pub attn_select: bool,
    #[bits(11..15)]
    pub light_mask_hi: u4,
}

impl ChannelControl {
    /// The full 8-bit light mask, the `lightMask0_3`/`lightMask4_7` split
    /// recombined (hardware's `GetFullLightMask`, minus the `lightFunc`
    /// gating the lift/lower mapping already handles via `enabled`).
    pub fn light_mask(&self) -> u8 {
        self.light_mask_lo().value() | (self.light_mask_hi().value() << 4)
    }

    pub fn with_light_mask(self, mask: u8) -> Self {
        self.with_light_mask_lo(u4::new(mask & 0xF)).with_light_mask_hi(u4::new((mask >> 4) & 0xF))
    }
}

#[bitos(1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    #[default]
    St = 0,
    Stq = 1,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexGenType {
    #[default]
    Regular = 0,
    EmbossMap = 1,
    Color0 = 2,
    Color1 = 3,
}

/// Where a texgen draws its source vector from, before any matrix is
/// applied.
#[bitos(4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceRow {
    #[default]
    Geometry = 0,
    Normal = 1,
    Binormal = 2,
    Tangent = 3,
    Tex0 = 4,
    Tex1 = 5,
    Tex2 = 6,
    Tex3 = 7,
    Tex4 = 8,
    Tex5 = 9,
    Tex6 = 10,
    Tex7 = 11,
    Color0 = 12,
    Color1 = 13,
}

/// `XF_TEX{i}_ID`.
#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexCoordGen {
    #[bits(0)]
    pub projection: Projection,
    #[bits(1..3)]
    pub kind: TexGenType,
    #[bits(3..7)]
    pub source_row: SourceRow,
    #[bits(7..10)]
    pub emboss_source_shift: u3,
    #[bits(10..13)]
    pub emboss_light_shift: u3,
}

/// `XF_DUALTEX{i}_ID`: the static texture/post matrix selection and the
/// normalize flag for texgen `i`. `tex_matrix == 0` means identity,
/// `1..=10` means `TexMatrix0..9`; `post_matrix == 0` means identity,
/// `1..=20` means `Matrix0..19`.
#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DualTexInfo {
    #[bits(0..4)]
    pub tex_matrix: u4,
    #[bits(4..9)]
    pub post_matrix: u5,
    #[bits(9)]
    pub normalize: bool,
}

/// Shadow of every XF register this crate tracks.
#[derive(Debug, Clone, Default)]
pub struct Xf {
    pub mat_colors: [Rgba8; 2],
    pub amb_colors: [Rgba8; 2],
    pub color_channels: [ChannelControl; 2],
    pub alpha_channels: [ChannelControl; 2],
    pub tex_coord_gens: [TexCoordGen; 8],
    pub dual_tex: [DualTexInfo; 8],
}

impl Xf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a run of `values` starting at XF address `address`, exactly
    /// as one `XF` display-list command does (§4.2: `u16 register, (n+1)
    /// u32 values`). Addresses outside the modeled set are ignored with a
    /// warning, matching BP's unimplemented-register behavior.
    pub fn write_run(&mut self, address: u16, values: &[u32]) {
        for (i, &value) in values.iter().enumerate() {
            self.write_one(address.wrapping_add(i as u16), value);
        }
    }

    fn write_one(&mut self, address: u16, value: u32) {
        match Reg::from_address(address) {
            Some(Reg::MatColor0) => self.mat_colors[0] = rgba8_from_word(value),
            Some(Reg::MatColor1) => self.mat_colors[1] = rgba8_from_word(value),
            Some(Reg::AmbColor0) => self.amb_colors[0] = rgba8_from_word(value),
            Some(Reg::AmbColor1) => self.amb_colors[1] = rgba8_from_word(value),
            Some(Reg::ColorChan0) => self.color_channels[0] = ChannelControl::from_bits(value as u16),
            Some(Reg::ColorChan1) => self.color_channels[1] = ChannelControl::from_bits(value as u16),
            Some(Reg::AlphaChan0) => self.alpha_channels[0] = ChannelControl::from_bits(value as u16),
            Some(Reg::AlphaChan1) => self.alpha_channels[1] = ChannelControl::from_bits(value as u16),
            Some(Reg::TexCoordGen0) => {
                let i = (address - 0x10) as usize;
                self.tex_coord_gens[i] = TexCoordGen::from_bits(value as u16);
            }
            Some(Reg::DualTex0) => {
                let i = (address - 0x18) as usize;
                self.dual_tex[i] = DualTexInfo::from_bits(value as u16);
            }
            None => {
                tracing::warn!("unimplemented write to XF register 0x{address:04X}: 0x{value:08X}");
            }
        }
    }
}

fn rgba8_from_word(value: u32) -> Rgba8 {
    Rgba8 {
        r: (value >> 24) as u8,
        g: (value >> 16) as u8,
        b: (value >> 8) as u8,
        a: value as u8,
    }
}

fn rgba8_to_word(value: Rgba8) -> u32 {
    u32::from(value.r) << 24 | u32::from(value.g) << 16 | u32::from(value.b) << 8 | u32::from(value.a)
}

impl Xf {
    /// Encodes `mat_colors[i]` back into its register word, for the lowerer.
    pub fn mat_color_word(&self, i: usize) -> u32 {
        rgba8_to_word(self.mat_colors[i])
    }

    /// Encodes `amb_colors[i]` back into its register word, for the lowerer.
    pub fn amb_color_word(&self, i: usize) -> u32 {
        rgba8_to_word(self.amb_colors[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_run_fills_consecutive_texcoord_gens() {
        let mut xf = Xf::new();
        let a = TexCoordGen::default().with_kind(TexGenType::EmbossMap);
        let b = TexCoordGen::default().with_kind(TexGenType::Color1);
        xf.write_run(0x10, &[u32::from(a.to_bits()), u32::from(b.to_bits())]);
        assert_eq!(xf.tex_coord_gens[0].kind(), TexGenType::EmbossMap);
        assert_eq!(xf.tex_coord_gens[1].kind(), TexGenType::Color1);
    }

    /// Matches the real `LitChannel` hardware union: `matsource`(0),
    /// `lightFunc`(1), `lightMask0_3`(2..6), `ambsource`(6), `diffuseAtten`
    /// (7..9), `attnEnable`(9), `attnSelect`(10), `lightMask4_7`(11..15).
    #[test]
    fn channel_control_matches_lit_channel_bit_layout() {
        let bits: u16 = (1 << 0) // matsource = Vertex
            | (1 << 1) // lightFunc enabled
            | (0b1010 << 2) // lightMask0_3
            | (1 << 6) // ambsource = Vertex
            | (0b10 << 7) // diffuseAtten = Clamp
            | (1 << 9) // attnEnable
            | (0 << 10) // attnSelect
            | (0b0101 << 11); // lightMask4_7
        let control = ChannelControl::from_bits(bits);
        assert_eq!(control.mat_source(), ColorSrc::Vertex);
        assert!(control.enabled());
        assert_eq!(control.amb_source(), ColorSrc::Vertex);
        assert_eq!(control.diffuse_fn(), DiffuseFn::Clamp);
        assert!(control.attn_enable());
        assert!(!control.attn_select());
        assert_eq!(control.light_mask(), 0b0101_1010);
    }

    #[test]
    fn light_mask_round_trips_through_split_lo_hi_fields() {
        let control = ChannelControl::default().with_light_mask(0b1100_0011);
        assert_eq!(control.light_mask(), 0b1100_0011);
    }

    #[test]
    fn mat_color_round_trips_through_word() {
        let mut xf = Xf::new();
        xf.write_run(0x00, &[0x11223344]);
        assert_eq!(
            xf.mat_colors[0],
            Rgba8 {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x44
            }
        );
        assert_eq!(xf.mat_color_word(0), 0x11223344);
    }
}
