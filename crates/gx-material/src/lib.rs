//! High-level GX material record (component H): the semantic,
//! hardware-agnostic view of a material that the lifter produces, the
//! lowerer consumes, and the simplifier/shader generator read.
//!
//! Unlike `gx-regs`, nothing here is a raw bitfield: every field uses the
//! plain enum or physical unit a tool author would reach for. Bridging
//! between this crate's types and `gx-regs`'s hardware shadows is
//! `gx-codec`'s job.

pub mod channel;
pub mod indirect;
pub mod light;
pub mod pixel;
pub mod sampler;
pub mod texgen;
pub mod texmatrix;
pub mod tev;

pub use channel::{AttenuationFn, ChanData, ChannelControl, ColorSource, DiffuseFn, LightingChannelControl};
pub use indirect::{IndirectMatrix, IndirectScale, IndirectStage};
pub use light::Light;
pub use pixel::{AlphaCompare, AlphaLogic, BlendFactor, BlendMode, BlendType, CompareFunction, DstAlpha, LogicOp, ZMode};
pub use sampler::{MagFilter, MaxAniso, MinFilter, Sampler, WrapMode};
pub use texgen::{PostMatrixSelect, TexGen, TexGenFunc, TexGenSource, TexMatrixSelect};
pub use texmatrix::{TexMatrix, TexMatrixMethod, TexMatrixOption, TexMatrixProjection, TransformModel};
pub use tev::{
    AlphaInput, AlphaStage, ColorInput, ColorStage, Konst, RasChannel, SwapChannel, SwapTableEntry, TevBias,
    TevColorReg, TevFormula, TevOutput, TevScale, TevStage,
};

use tinyvec::TinyVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    All,
    Front,
    Back,
    None,
}

/// Invariant violations that make a `Material` impossible to lower back to
/// registers (§3.3, §7's `InvariantViolation`).
#[derive(Debug, Clone, PartialEq, Eq, easyerr::Error)]
pub enum InvariantError {
    #[error("material has {tex_gens} texgens but {samplers} samplers")]
    TexGenSamplerMismatch { tex_gens: usize, samplers: usize },
    #[error("stage {stage} pairs texCoord {tex_coord:?} with texMap {tex_map:?}")]
    TexCoordMapMismatch {
        stage: usize,
        tex_coord: Option<u8>,
        tex_map: Option<u8>,
    },
    #[error("more than 3 indirect matrices ({count})")]
    TooManyIndirectMatrices { count: usize },
    #[error("stage {stage}'s indirect matrix selection has no matching entry")]
    DanglingIndirectMatrix { stage: usize },
    #[error("tevColor {index} component out of [-1024, 1023]: {value}")]
    TevColorOutOfRange { index: usize, value: i16 },
    #[error("material has {count} TEV stages, outside the hardware's 1..=16 range")]
    StageCountOutOfRange { count: usize },
}

/// The full material record produced by the lifter and consumed by the
/// lowerer, simplifier and shader generator (§3.1, §3.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub cull_mode: CullMode,
    /// Up to 2 entries: the material/ambient color pair feeding each
    /// lighting channel.
    pub chan_data: [ChanData; 2],
    /// Up to 2 entries: the color/alpha control pair for each channel.
    pub chan: [LightingChannelControl; 2],
    pub tex_gens: TinyVec<[TexGen; 8]>,
    pub tex_matrices: TinyVec<[TexMatrix; 10]>,
    pub samplers: TinyVec<[Sampler; 8]>,
    pub tev_colors: [TevColorReg; 4],
    pub tev_konst_colors: [color::Rgba8; 4],
    pub stages: TinyVec<[TevStage; 16]>,
    pub ind_matrices: TinyVec<[IndirectMatrix; 3]>,
    pub indirect_stages: TinyVec<[IndirectStage; 4]>,
    pub swap_table: [SwapTableEntry; 4],
    pub alpha_compare: AlphaCompare,
    pub z_mode: ZMode,
    pub early_z_comparison: bool,
    pub blend_mode: BlendMode,
    pub dst_alpha: DstAlpha,
    /// Translucent materials sort and draw after all opaque ones.
    pub xlu: bool,
    pub lights: TinyVec<[Light; 8]>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::default(),
            chan_data: [ChanData::default(); 2],
            chan: [LightingChannelControl::default(); 2],
            tex_gens: TinyVec::new(),
            tex_matrices: TinyVec::new(),
            samplers: TinyVec::new(),
            tev_colors: [TevColorReg::default(); 4],
            tev_konst_colors: [color::Rgba8::default(); 4],
            stages: TinyVec::new(),
            ind_matrices: TinyVec::new(),
            indirect_stages: TinyVec::new(),
            swap_table: [SwapTableEntry::default(); 4],
            alpha_compare: AlphaCompare::default(),
            z_mode: ZMode::default(),
            early_z_comparison: false,
            blend_mode: BlendMode::default(),
            dst_alpha: DstAlpha::default(),
            xlu: false,
            lights: TinyVec::new(),
        }
    }
}

impl Material {
    /// Checks the cross-field invariants from §3.3 that the lowerer relies
    /// on to reconstruct a valid register set. Called by `gx-codec`'s
    /// lowerer before it starts emitting registers.
    pub fn validate(&self) -> Result<(), InvariantError> {
        if self.tex_gens.len() != self.samplers.len() {
            return Err(InvariantError::TexGenSamplerMismatch {
                tex_gens: self.tex_gens.len(),
                samplers: self.samplers.len(),
            });
        }
        if self.ind_matrices.len() > 3 {
            return Err(InvariantError::TooManyIndirectMatrices {
                count: self.ind_matrices.len(),
            });
        }
        for (index, color) in self.tev_colors.iter().enumerate() {
            for value in [color.r, color.g, color.b, color.a] {
                if !(-1024..=1023).contains(&value) {
                    return Err(InvariantError::TevColorOutOfRange { index, value });
                }
            }
        }
        for (stage, s) in self.stages.iter().enumerate() {
            if s.tex_coord.is_some() != s.tex_map.is_some() {
                return Err(InvariantError::TexCoordMapMismatch {
                    stage,
                    tex_coord: s.tex_coord,
                    tex_map: s.tex_map,
                });
            }
            let matrix_index = match s.indirect.matrix {
                tev::IndirectMatrixSelect::Off => None,
                tev::IndirectMatrixSelect::Matrix0 => Some(0),
                tev::IndirectMatrixSelect::Matrix1 => Some(1),
                tev::IndirectMatrixSelect::Matrix2 => Some(2),
            };
            if let Some(index) = matrix_index {
                if index >= self.ind_matrices.len() {
                    return Err(InvariantError::DanglingIndirectMatrix { stage });
                }
            }
        }
        if !(1..=16).contains(&self.stages.len()) {
            return Err(InvariantError::StageCountOutOfRange {
                count: self.stages.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_has_no_stages_and_fails_validation() {
        let err = Material::default().validate().unwrap_err();
        assert_eq!(err, InvariantError::StageCountOutOfRange { count: 0 });
    }

    #[test]
    fn material_with_one_stage_validates() {
        let mut material = Material::default();
        material.stages.push(TevStage::default());
        assert!(material.validate().is_ok());
    }

    #[test]
    fn mismatched_texgen_sampler_counts_fail_validation() {
        let mut material = Material::default();
        material.tex_gens.push(TexGen::default());
        let err = material.validate().unwrap_err();
        assert_eq!(
            err,
            InvariantError::TexGenSamplerMismatch {
                tex_gens: 1,
                samplers: 0
            }
        );
    }

    #[test]
    fn out_of_range_tev_color_fails_validation() {
        let mut material = Material::default();
        material.tev_colors[0].r = 2000;
        let err = material.validate().unwrap_err();
        assert_eq!(
            err,
            InvariantError::TevColorOutOfRange {
                index: 0,
                value: 2000
            }
        );
    }

    #[test]
    fn dangling_indirect_matrix_reference_fails_validation() {
        let mut material = Material::default();
        material.stages.push(TevStage {
            indirect: tev::IndirectStageRef {
                matrix: tev::IndirectMatrixSelect::Matrix0,
                ..Default::default()
            },
            ..Default::default()
        });
        let err = material.validate().unwrap_err();
        assert_eq!(err, InvariantError::DanglingIndirectMatrix { stage: 0 });
    }
}
