//! Texture samplers: wrap/filter state paired 1:1 with a texgen.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagFilter {
    #[default]
    Near,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    #[default]
    Near,
    Linear,
    NearMipNear,
    LinMipNear,
    NearMipLin,
    LinMipLin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaxAniso {
    #[default]
    X1,
    X2,
    X4,
}

/// A named texture/palette reference plus the sampling state GX applies
/// to it. Texture and palette data transcoding is out of scope; these are
/// opaque names resolved by whatever container layer sits above this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Sampler {
    pub texture: String,
    pub palette: String,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub max_aniso: MaxAniso,
    /// Fixed-point register value converted to its real-world units
    /// (`lod_bias_reg / 32.0`); see `gx_regs::bp::tex::TexMode0::lod_bias_value`.
    pub lod_bias_bits: i8,
    pub bias_clamp: bool,
    pub edge_lod: bool,
}

impl Sampler {
    pub fn lod_bias(&self) -> f32 {
        f32::from(self.lod_bias_bits) / 32.0
    }
}
