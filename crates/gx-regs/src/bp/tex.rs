//! Texture sampler registers: `TEXMODE0`, `TEXMODE1`.
use bitos::bitos;

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Clamp = 0,
    Repeat = 1,
    Mirror = 2,
}

#[bitos(1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagFilter {
    #[default]
    Near = 0,
    Linear = 1,
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    #[default]
    Near = 0,
    Linear = 1,
    NearMipNear = 2,
    LinMipNear = 3,
    NearMipLin = 4,
    LinMipLin = 5,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxAniso {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
}

/// `TEXMODE0`: wrap modes, filters and the LOD bias clamp/aniso flags.
#[bitos(22)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexMode0 {
    #[bits(0..2)]
    pub wrap_s: WrapMode,
    #[bits(2..4)]
    pub wrap_t: WrapMode,
    #[bits(4)]
    pub mag_filter: MagFilter,
    #[bits(5..8)]
    pub min_filter: MinFilter,
    #[bits(8)]
    pub edge_lod: bool,
    #[bits(9..17)]
    pub lod_bias: i8,
    #[bits(19..21)]
    pub max_aniso: MaxAniso,
    #[bits(21)]
    pub bias_clamp: bool,
}

impl TexMode0 {
    /// `lod_bias` is a signed fixed-point value in units of 1/32.
    pub fn lod_bias_value(&self) -> f32 {
        f32::from(self.lod_bias()) / 32.0
    }
}

/// `TEXMODE1`: the min/max LOD clamp range, in units of 1/16 of a mip level.
#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexMode1 {
    #[bits(0..8)]
    pub min_lod: u8,
    #[bits(8..16)]
    pub max_lod: u8,
}
